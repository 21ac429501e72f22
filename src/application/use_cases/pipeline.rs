//! Pipeline orchestrator for one natural-language question.
//!
//! Strictly sequential, no branching back:
//! schema lookup → prompt build → synthesize → sanitize → execute →
//! summarize. A sanitizer veto and a stage failure are distinct terminal
//! states; a summarization failure after a successful execution keeps the
//! query and its data (degraded success).
//!
//! Each invocation is stateless apart from the shared read-only
//! collaborators, so concurrent questions never interfere.

use crate::application::use_cases::answer_synthesizer::{fallback_answer, AnswerSynthesizer};
use crate::application::use_cases::prompt_builder::sql_generation_prompts;
use crate::application::use_cases::query_executor::QueryExecutor;
use crate::application::use_cases::query_sanitizer;
use crate::application::use_cases::schema_introspector::SchemaIntrospector;
use crate::domain::dataset::{DatasetHandle, QueryResult};
use crate::domain::envelope::ResponseEnvelope;
use crate::domain::error::AppError;
use crate::infrastructure::config::Settings;
use crate::infrastructure::db::DatasetRepository;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    SchemaLookup,
    PromptBuild,
    Synthesize,
    Sanitize,
    Execute,
    Summarize,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::SchemaLookup => "schema_lookup",
            PipelineStage::PromptBuild => "prompt_build",
            PipelineStage::Synthesize => "synthesize",
            PipelineStage::Sanitize => "sanitize",
            PipelineStage::Execute => "execute",
            PipelineStage::Summarize => "summarize",
        }
    }
}

/// Tagged terminal state of one invocation. Callers of `run` must handle
/// the degraded case explicitly; `ask` folds these into the envelope.
enum PipelineOutcome {
    Complete {
        answer: String,
        query: String,
        result: QueryResult,
    },
    /// Execution succeeded, summarization failed. Data is kept.
    Degraded {
        query: String,
        result: QueryResult,
        error: AppError,
    },
    /// Sanitizer veto; reachable only from the sanitize stage.
    Rejected { query: String, error: AppError },
    Failed {
        stage: PipelineStage,
        query: String,
        error: AppError,
    },
}

pub struct QueryPipeline {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    datasets: Arc<DatasetRepository>,
    settings: Settings,
}

impl QueryPipeline {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        datasets: Arc<DatasetRepository>,
        settings: Settings,
    ) -> Self {
        Self {
            llm_client,
            datasets,
            settings,
        }
    }

    /// Answer one natural-language question about a dataset. Always returns
    /// a well-formed envelope; no backend or service error escapes.
    pub async fn ask(&self, question: &str, handle: &DatasetHandle) -> ResponseEnvelope {
        match self.run(question, handle).await {
            PipelineOutcome::Complete {
                answer,
                query,
                result,
            } => {
                info!(dataset = %handle.name, rows = result.row_count, "Question answered");
                ResponseEnvelope::success(answer, query, result.rows)
            }
            PipelineOutcome::Degraded {
                query,
                result,
                error,
            } => {
                warn!(dataset = %handle.name, %error, "Summarization failed, degrading to count-based answer");
                ResponseEnvelope::degraded(
                    fallback_answer(result.row_count),
                    query,
                    result.rows,
                    &error,
                )
            }
            PipelineOutcome::Rejected { query, error } => {
                warn!(dataset = %handle.name, rejected_query = %query, "Generated query rejected by safety policy");
                ResponseEnvelope::failure(
                    "The generated query was blocked by the safety policy. Try rephrasing the question.".to_string(),
                    query,
                    &error,
                )
            }
            PipelineOutcome::Failed {
                stage,
                query,
                error,
            } => {
                warn!(dataset = %handle.name, stage = stage.as_str(), %error, "Pipeline stage failed");
                let answer = match stage {
                    PipelineStage::SchemaLookup => {
                        "The dataset could not be found. It may have been deleted.".to_string()
                    }
                    PipelineStage::Execute => {
                        "The generated query could not be executed against the dataset.".to_string()
                    }
                    _ => "Failed to generate a query for this question.".to_string(),
                };
                ResponseEnvelope::failure(answer, query, &error)
            }
        }
    }

    async fn run(&self, question: &str, handle: &DatasetHandle) -> PipelineOutcome {
        let limits = &self.settings.limits;

        // Schema lookup, always against the live table.
        let introspector =
            SchemaIntrospector::new(self.datasets.clone(), limits.schema_sample_rows);
        let schema = match introspector.describe(handle).await {
            Ok(schema) => schema,
            Err(error) => {
                return PipelineOutcome::Failed {
                    stage: PipelineStage::SchemaLookup,
                    query: String::new(),
                    error,
                }
            }
        };

        // Prompt build is pure and cannot fail.
        let (system, user) = sql_generation_prompts(&schema, question);

        // Query synthesis, bounded.
        let raw = match timeout(
            Duration::from_secs(limits.generation_timeout_secs),
            self.llm_client.generate(&self.settings.llm, &system, &user),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(error)) => {
                return PipelineOutcome::Failed {
                    stage: PipelineStage::Synthesize,
                    query: String::new(),
                    error,
                }
            }
            Err(_) => {
                return PipelineOutcome::Failed {
                    stage: PipelineStage::Synthesize,
                    query: String::new(),
                    error: AppError::GenerationError(format!(
                        "Synthesis timed out after {} seconds",
                        limits.generation_timeout_secs
                    )),
                }
            }
        };

        // Sanitize: normalize, then validate. Rejection aborts execution.
        let sql = query_sanitizer::normalize(&raw);
        if !query_sanitizer::validate(&sql) {
            let reason = match query_sanitizer::first_denied_keyword(&sql) {
                Some(keyword) => format!("query contains forbidden keyword {}", keyword),
                None => "query is not a SELECT statement".to_string(),
            };
            return PipelineOutcome::Rejected {
                query: sql,
                error: AppError::RejectedByPolicy(reason),
            };
        }

        // Execute the approved query.
        let executor = QueryExecutor::new(self.datasets.clone(), limits.query_timeout_secs);
        let result = match executor.run(&sql).await {
            Ok(result) => result,
            Err(error) => {
                return PipelineOutcome::Failed {
                    stage: PipelineStage::Execute,
                    query: sql,
                    error,
                }
            }
        };

        // Summarize; failure here must not discard the result.
        let synthesizer = AnswerSynthesizer::new(
            self.llm_client.clone(),
            self.settings.llm.clone(),
            limits.answer_timeout_secs,
            limits.answer_sample_rows,
        );
        match synthesizer.summarize(question, &sql, &result).await {
            Ok(answer) => PipelineOutcome::Complete {
                answer,
                query: sql,
                result,
            },
            Err(error) => PipelineOutcome::Degraded {
                query: sql,
                result,
                error,
            },
        }
    }
}
