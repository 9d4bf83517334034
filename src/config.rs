//! Server configuration.
//!
//! The binary is configured entirely through environment variables:
//!
//! * `SALARY_BIND_ADDR` – address to listen on (default `127.0.0.1:3000`);
//! * `SALARY_REGIME_DIR` – optional directory of JSON tax regimes that
//!   extend or override the built-in ones;
//! * `RUST_LOG` – tracing filter (default `info`).

use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings for the HTTP server binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Socket address the listener binds to.
    pub bind_addr: String,
    /// Directory of JSON regimes applied over the built-in ones.
    pub regime_dir: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.  Empty values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            bind_addr: get("SALARY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            regime_dir: get("SALARY_REGIME_DIR").map(PathBuf::from),
            log_filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
