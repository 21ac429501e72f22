//! Result-grounded answer synthesis.
//!
//! The second completion call of the pipeline. An empty result set gets a
//! fixed literal answer without any LLM involvement, and a completion
//! failure after a successful execution degrades to a count-based fallback
//! at the orchestrator.

use crate::application::use_cases::prompt_builder::answer_prompts;
use crate::domain::dataset::QueryResult;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Fixed answer for zero-row results.
pub const EMPTY_RESULT_ANSWER: &str = "No data found.";

/// Templated answer used when summarization fails but the query succeeded.
pub fn fallback_answer(row_count: usize) -> String {
    format!(
        "The query ran successfully and returned {} row(s).",
        row_count
    )
}

pub struct AnswerSynthesizer {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    answer_timeout_secs: u64,
    sample_rows: usize,
}

impl AnswerSynthesizer {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        config: LLMConfig,
        answer_timeout_secs: u64,
        sample_rows: usize,
    ) -> Self {
        Self {
            llm_client,
            config,
            answer_timeout_secs,
            sample_rows,
        }
    }

    pub async fn summarize(
        &self,
        question: &str,
        sql: &str,
        result: &QueryResult,
    ) -> Result<String> {
        if result.row_count == 0 {
            return Ok(EMPTY_RESULT_ANSWER.to_string());
        }

        let sample = &result.rows[..result.rows.len().min(self.sample_rows)];
        let (system, user) = answer_prompts(question, sql, sample, result.row_count);

        debug!(
            rows = result.row_count,
            sampled = sample.len(),
            "Summarizing query result"
        );

        let response = timeout(
            Duration::from_secs(self.answer_timeout_secs),
            self.llm_client.generate(&self.config, &system, &user),
        )
        .await
        .map_err(|_| {
            AppError::AnswerGenerationError(format!(
                "Summarization timed out after {} seconds",
                self.answer_timeout_secs
            ))
        })?
        .map_err(|e| AppError::AnswerGenerationError(e.to_string()))?;

        Ok(response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn generate(&self, _: &LLMConfig, _: &str, _: &str) -> Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::GenerationError("script exhausted".to_string())))
        }
    }

    fn one_row_result() -> QueryResult {
        QueryResult {
            columns: vec!["churned".to_string()],
            rows: vec![HashMap::from([(
                "churned".to_string(),
                serde_json::Value::Number(42.into()),
            )])],
            row_count: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_result_gets_fixed_literal_without_llm_call() {
        // A scripted error would surface if the LLM were consulted.
        let client = Arc::new(ScriptedClient::new(vec![Err(AppError::GenerationError(
            "must not be called".to_string(),
        ))]));
        let synthesizer = AnswerSynthesizer::new(client, LLMConfig::default(), 30, 5);

        let empty = QueryResult {
            columns: vec!["churned".to_string()],
            rows: vec![],
            row_count: 0,
        };
        let answer = synthesizer.summarize("q", "SELECT ...", &empty).await.unwrap();
        assert_eq!(answer, EMPTY_RESULT_ANSWER);
    }

    #[tokio::test]
    async fn test_summarize_trims_llm_output() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(
            "  42 customers churned.  \n".to_string()
        )]));
        let synthesizer = AnswerSynthesizer::new(client, LLMConfig::default(), 30, 5);

        let answer = synthesizer
            .summarize("how many churned?", "SELECT ...", &one_row_result())
            .await
            .unwrap();
        assert_eq!(answer, "42 customers churned.");
    }

    #[tokio::test]
    async fn test_completion_failure_maps_to_answer_generation_error() {
        let client = Arc::new(ScriptedClient::new(vec![Err(AppError::GenerationError(
            "service unavailable".to_string(),
        ))]));
        let synthesizer = AnswerSynthesizer::new(client, LLMConfig::default(), 30, 5);

        let err = synthesizer
            .summarize("q", "SELECT ...", &one_row_result())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AnswerGenerationError(_)));
    }

    #[test]
    fn test_fallback_answer_mentions_row_count() {
        assert_eq!(
            fallback_answer(3),
            "The query ran successfully and returned 3 row(s)."
        );
    }
}
