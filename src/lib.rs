//! datachat — natural-language question answering over tabular datasets.
//!
//! A question and a dataset handle go in; a response envelope comes out.
//! In between: schema introspection, prompt construction, LLM query
//! synthesis, a safety-validation gate, read-only execution, and
//! result-grounded answer synthesis. The completion service and the
//! storage backend sit behind seams (`LLMClient`, `DatasetRepository`) so
//! the whole pipeline runs deterministically under test.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::use_cases::pipeline::{PipelineStage, QueryPipeline};
pub use domain::dataset::{ColumnInfo, DatasetHandle, QueryResult, SchemaDescription};
pub use domain::envelope::ResponseEnvelope;
pub use domain::error::{AppError, Result};
pub use domain::llm_config::{LLMConfig, LLMProvider};
pub use infrastructure::config::{Limits, Settings};
pub use infrastructure::db::DatasetRepository;
pub use infrastructure::init_tracing;
pub use infrastructure::llm_clients::{LLMClient, RouterClient};
