//! Execution of sanitizer-approved queries.
//!
//! Re-checks the sanitizer verdict before touching the backend; the gate
//! in the orchestrator is the contract, this one catches misuse of the
//! executor as a standalone component.

use crate::application::use_cases::query_sanitizer;
use crate::domain::dataset::QueryResult;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::DatasetRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

pub struct QueryExecutor {
    datasets: Arc<DatasetRepository>,
    query_timeout_secs: u64,
}

impl QueryExecutor {
    pub fn new(datasets: Arc<DatasetRepository>, query_timeout_secs: u64) -> Self {
        Self {
            datasets,
            query_timeout_secs,
        }
    }

    /// Run a validated SELECT and materialize the full result set.
    pub async fn run(&self, sql: &str) -> Result<QueryResult> {
        if !query_sanitizer::validate(sql) {
            warn!(sql, "Executor received a query without sanitizer approval");
            return Err(AppError::RejectedByPolicy(
                "query did not pass the safety policy".to_string(),
            ));
        }

        timeout(
            Duration::from_secs(self.query_timeout_secs),
            self.datasets.fetch_all(sql),
        )
        .await
        .map_err(|_| {
            AppError::ExecutionError(format!(
                "Query timed out after {} seconds",
                self.query_timeout_secs
            ))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uuid::Uuid;

    fn write_temp_csv(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("datachat_test_{}.csv", Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_executes_select() {
        let path = write_temp_csv("customer_id,churn\n1,1\n2,0\n3,1\n");
        let repo = Arc::new(DatasetRepository::in_memory().await.unwrap());
        let handle = repo.register_csv("churn", &path).await.unwrap();

        let executor = QueryExecutor::new(repo.clone(), 30);
        let sql = format!(
            "SELECT COUNT(*) AS churned FROM {} WHERE churn = 1",
            handle.table_name
        );
        let result = executor.run(&sql).await.unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(
            result.rows[0].get("churned"),
            Some(&serde_json::Value::Number(2.into()))
        );

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_run_rejects_unapproved_query() {
        let repo = Arc::new(DatasetRepository::in_memory().await.unwrap());
        let executor = QueryExecutor::new(repo, 30);

        let err = executor.run("DROP TABLE anything").await.unwrap_err();
        assert!(matches!(err, AppError::RejectedByPolicy(_)));
    }

    #[tokio::test]
    async fn test_run_wraps_backend_error() {
        let repo = Arc::new(DatasetRepository::in_memory().await.unwrap());
        let executor = QueryExecutor::new(repo, 30);

        // Passes the policy gate but references a missing table.
        let err = executor.run("SELECT * FROM no_such_table").await.unwrap_err();
        assert!(matches!(err, AppError::ExecutionError(_)));
    }
}
