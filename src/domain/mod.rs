pub mod dataset;
pub mod envelope;
pub mod error;
pub mod llm_config;
