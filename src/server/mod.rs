//! HTTP surface.
//!
//! A thin axum layer over the [`QueryOrchestrator`]: it extracts the
//! question and caller identity, hands them to the orchestrator, and shapes
//! the result as JSON or as a server-sent event stream.

mod handlers;
mod identity;
mod response;

pub use identity::CallerIdentity;
pub use response::{ApiResponse, ErrorBody};

use crate::error::ServiceError;
use crate::qa::QueryOrchestrator;
use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: QueryOrchestrator,
    user_header: Option<Arc<HeaderName>>,
}

impl AppState {
    /// Creates state with every caller treated as anonymous.
    #[must_use]
    pub fn new(orchestrator: QueryOrchestrator) -> Self {
        Self {
            orchestrator,
            user_header: None,
        }
    }

    /// Trusts `header` to carry the caller's user id.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `header` is not a valid header name.
    pub fn with_user_header(mut self, header: &str) -> Result<Self, ServiceError> {
        let name = HeaderName::from_bytes(header.trim().as_bytes()).map_err(|e| {
            ServiceError::configuration("identity.user_header", format!("'{}': {}", header, e))
        })?;
        self.user_header = Some(Arc::new(name));
        Ok(self)
    }

    /// The orchestrator requests are handed to.
    #[must_use]
    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }

    pub(crate) fn user_header(&self) -> Option<&HeaderName> {
        self.user_header.as_deref()
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    // Browsers may send credentials; mirror the origin instead of `*`.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::index))
        .route("/api/health", get(handlers::health))
        .route("/api/ask", get(handlers::ask))
        .route("/api/ask/stream", get(handlers::ask_stream))
        .route("/api/records", get(handlers::list_records))
        .route("/api/records/{id}", get(handlers::get_record))
        .route("/api/user/records", get(handlers::user_records))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `state` on `addr` until Ctrl-C or SIGTERM.
///
/// In-flight requests are allowed to finish; open event streams end when
/// their orchestrator task does.
///
/// # Errors
///
/// Returns a configuration error if the address cannot be bound.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServiceError> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        ServiceError::configuration("server", format!("failed to bind {}: {}", addr, e))
    })?;

    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::configuration("server", e.to_string()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
