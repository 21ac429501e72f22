use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppError {
    /// The dataset's backing table no longer exists.
    SchemaNotFound(String),
    /// The completion service failed while synthesizing a query.
    GenerationError(String),
    /// The sanitizer vetoed a generated query. Never retried automatically.
    RejectedByPolicy(String),
    /// The backend rejected a sanitizer-approved query.
    ExecutionError(String),
    /// Summarization failed after a successful execution.
    AnswerGenerationError(String),
    DatabaseError(String),
    ParseError(String),
    ConfigError(String),
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::SchemaNotFound(msg) => write!(f, "Dataset not found: {}", msg),
            AppError::GenerationError(msg) => write!(f, "Query generation failed: {}", msg),
            AppError::RejectedByPolicy(msg) => {
                write!(f, "Generated query was rejected by the safety policy: {}", msg)
            }
            AppError::ExecutionError(msg) => write!(f, "Query execution failed: {}", msg),
            AppError::AnswerGenerationError(msg) => {
                write!(f, "Answer generation failed: {}", msg)
            }
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
