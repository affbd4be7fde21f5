//! Caller identity.
//!
//! Authentication itself happens upstream of this service. An authenticating
//! proxy may forward the caller's numeric user id in a configured header; if
//! the header is unconfigured, absent, or not a positive integer, the caller
//! is anonymous.

use crate::server::AppState;
use crate::storage::UserId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use std::convert::Infallible;
use tracing::debug;

/// The caller of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallerIdentity(Option<UserId>);

impl CallerIdentity {
    /// An anonymous caller.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(None)
    }

    /// An authenticated caller.
    #[must_use]
    pub const fn user(id: UserId) -> Self {
        Self(Some(id))
    }

    /// The caller's user id, if authenticated.
    #[must_use]
    pub fn user_id(self) -> Option<UserId> {
        self.0
    }

    /// Reads the identity from `headers`.
    #[must_use]
    pub fn resolve(headers: &HeaderMap, header: Option<&HeaderName>) -> Self {
        let Some(header) = header else {
            return Self::anonymous();
        };

        let Some(value) = headers.get(header) else {
            return Self::anonymous();
        };

        match value.to_str().ok().map(str::parse::<UserId>) {
            Some(Ok(id)) => Self::user(id),
            Some(Err(e)) => {
                debug!(header = %header, error = %e, "ignoring caller identity");
                Self::anonymous()
            }
            None => Self::anonymous(),
        }
    }
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::resolve(&parts.headers, state.user_header()))
    }
}
