pub mod config;
pub mod db;
pub mod llm_clients;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Intended for embedding
/// applications and demos; safe to call once per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
