use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Bounds on the pipeline's blocking operations. An unresponsive completion
/// service or storage backend must never stall a request indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub generation_timeout_secs: u64,
    pub answer_timeout_secs: u64,
    pub query_timeout_secs: u64,
    /// Rows included in the summarization prompt.
    pub answer_sample_rows: usize,
    /// Rows sampled per column for the schema description.
    pub schema_sample_rows: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 30,
            answer_timeout_secs: 30,
            query_timeout_secs: 30,
            answer_sample_rows: 5,
            schema_sample_rows: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub limits: Limits,
}

impl Settings {
    /// Layered load: built-in defaults, then `datachat.toml`, then
    /// `DATACHAT_`-prefixed environment variables (`__` as section
    /// separator, e.g. `DATACHAT_LLM__MODEL`).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("datachat.toml"))
            .merge(Env::prefixed("DATACHAT_").split("__"))
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))
    }
}
