//! Entry point for the Salary Engine binary.
//!
//! Running this binary starts an HTTP server exposing the calculators.
//! Configuration comes from the environment; see
//! [`salary_engine::config`] for the recognised variables.

use salary_engine::config::ServerConfig;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env();
    let env_filter = EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(salary_engine::config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(err) = salary_engine::api::serve(&config).await {
        error!("error running server: {err:#}");
        std::process::exit(1);
    }
}
