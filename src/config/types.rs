//! Configuration types for the service.
//!
//! The TOML file maps onto [`AppConfig`]; every section and field is optional
//! and falls back to its default. Command-line and environment overrides are
//! collected into [`ConfigOverrides`] and applied on top.

use crate::error::ServiceError;
use crate::llm::ProviderConfig;
use crate::logging::{LogLevel, LoggingConfig};
use crate::storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Environment variable consulted for the API key when nothing else is set.
pub const DEFAULT_API_KEY_ENV: &str = "LLM_API_KEY";

/// Root configuration structure.
///
/// ```toml
/// [server]
/// bind = "127.0.0.1"
/// port = 8080
///
/// [storage]
/// db_path = "./qa_database.db"
///
/// [llm]
/// provider = "openai"
/// api_key_env = "OPENAI_API_KEY"
/// model = "gpt-4o-mini"
/// timeout_secs = 45
///
/// [logging]
/// level = "debug"
/// journald = false
///
/// [identity]
/// user_header = "x-user-id"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listening socket.
    pub server: ServerConfig,
    /// Record store location.
    pub storage: StorageConfig,
    /// Upstream provider selection.
    pub llm: LlmConfig,
    /// Log level and sinks.
    pub logging: LoggingConfig,
    /// Caller identity resolution.
    pub identity: IdentityConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, without the port.
    pub bind: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Resolves the socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `bind` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServiceError> {
        let ip: IpAddr = self.bind.trim().parse().map_err(|e| {
            ServiceError::configuration("server.bind", format!("'{}': {}", self.bind, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Vendor name; empty selects the demo provider.
    pub provider: String,
    /// Direct API key value (prefer `api_key_env`).
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Endpoint override.
    pub api_url: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Resolves the API key from the process environment.
    ///
    /// Resolution order:
    /// 1. `api_key` - a direct value from the file or command line
    /// 2. `api_key_env` - read from the named environment variable
    /// 3. `LLM_API_KEY`
    /// 4. Empty string (the demo provider needs no key)
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolves the API key using `lookup` in place of the environment.
    #[must_use]
    pub fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(key) = present(self.api_key.clone()) {
            return key;
        }

        if let Some(key) = self.api_key_env.as_deref().and_then(|name| present(lookup(name))) {
            return key;
        }

        present(lookup(DEFAULT_API_KEY_ENV)).unwrap_or_default()
    }

    /// Converts this section into the provider client's configuration.
    #[must_use]
    pub fn to_provider_config(&self) -> ProviderConfig {
        self.to_provider_config_with(|name| std::env::var(name).ok())
    }

    /// Like [`to_provider_config`](Self::to_provider_config) with an explicit
    /// environment lookup.
    #[must_use]
    pub fn to_provider_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ProviderConfig {
        let mut config =
            ProviderConfig::new(self.provider.trim()).with_api_key(self.resolve_api_key_with(lookup));

        if let Some(ref url) = self.api_url {
            config = config.with_api_url(url);
        }
        if let Some(ref model) = self.model {
            config = config.with_model(model);
        }
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        config
    }
}

/// `[identity]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Trusted request header carrying the caller's numeric user id, as set
    /// by an authenticating proxy. Unset means every caller is anonymous.
    pub user_header: Option<String>,
}

/// Values supplied on the command line or through the environment.
///
/// Every field that is `Some` replaces the corresponding file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub db_path: Option<String>,
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<LogLevel>,
    pub user_header: Option<String>,
}

impl AppConfig {
    /// Creates a configuration with every default applied.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies command-line and environment overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(provider) = overrides.provider {
            self.llm.provider = provider;
        }
        if let Some(api_key) = overrides.api_key {
            self.llm.api_key = Some(api_key);
        }
        if let Some(api_url) = overrides.api_url {
            self.llm.api_url = Some(api_url);
        }
        if let Some(model) = overrides.model {
            self.llm.model = Some(model);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(header) = overrides.user_header {
            self.identity.user_header = Some(header);
        }
        self
    }

    /// Checks values that cannot be validated by deserialization alone.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid field.
    pub fn validate(&self) -> Result<(), ServiceError> {
        self.server.socket_addr()?;

        if self.storage.db_path.trim().is_empty() {
            return Err(ServiceError::configuration(
                "storage.db_path",
                "must not be empty; use ':memory:' for a throwaway database",
            ));
        }

        if let Some(ref header) = self.identity.user_header {
            if axum::http::HeaderName::from_bytes(header.trim().as_bytes()).is_err() {
                return Err(ServiceError::configuration(
                    "identity.user_header",
                    format!("'{}' is not a valid HTTP header name", header),
                ));
            }
        }

        Ok(())
    }
}
