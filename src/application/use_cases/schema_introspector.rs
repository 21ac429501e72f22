//! Schema introspection for a dataset handle.
//!
//! Always reads the live table structure; the dataset may have been
//! reloaded or deleted since the handle was created, so nothing here is
//! cached.

use crate::domain::dataset::{ColumnInfo, DatasetHandle, SchemaDescription};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::DatasetRepository;
use std::sync::Arc;
use tracing::debug;

pub struct SchemaIntrospector {
    datasets: Arc<DatasetRepository>,
    sample_rows: usize,
}

impl SchemaIntrospector {
    pub fn new(datasets: Arc<DatasetRepository>, sample_rows: usize) -> Self {
        Self {
            datasets,
            sample_rows,
        }
    }

    /// Describe the dataset's current physical structure, with a few sample
    /// values per column. Fails with `SchemaNotFound` when the backing
    /// table no longer exists.
    pub async fn describe(&self, handle: &DatasetHandle) -> Result<SchemaDescription> {
        if !self.datasets.table_exists(&handle.table_name).await? {
            return Err(AppError::SchemaNotFound(handle.name.clone()));
        }

        let raw_columns = self.datasets.table_columns(&handle.table_name).await?;
        if raw_columns.is_empty() {
            return Err(AppError::SchemaNotFound(handle.name.clone()));
        }

        // Sample rows are best-effort grounding; a failure here must not
        // block the question.
        let samples = if self.sample_rows > 0 {
            self.datasets
                .sample_rows(&handle.table_name, self.sample_rows)
                .await
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let columns = raw_columns
            .into_iter()
            .map(|(name, data_type)| {
                let values: Vec<String> = samples
                    .iter()
                    .filter_map(|row| row.get(&name))
                    .filter(|v| !v.is_null())
                    .map(value_to_string)
                    .collect();
                ColumnInfo {
                    name,
                    data_type,
                    sample_values: if values.is_empty() { None } else { Some(values) },
                }
            })
            .collect::<Vec<_>>();

        debug!(
            dataset = %handle.name,
            table = %handle.table_name,
            columns = columns.len(),
            "Introspected schema"
        );

        Ok(SchemaDescription {
            table_name: handle.table_name.clone(),
            columns,
        })
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
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
    async fn test_describe_reflects_live_table() {
        let path = write_temp_csv("customer_id,churn,monthly_charges\n1,1,29.85\n2,0,56.95\n");
        let repo = Arc::new(DatasetRepository::in_memory().await.unwrap());
        let handle = repo.register_csv("churn", &path).await.unwrap();

        let introspector = SchemaIntrospector::new(repo.clone(), 3);
        let schema = introspector.describe(&handle).await.unwrap();

        assert_eq!(schema.table_name, handle.table_name);
        let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["customer_id", "churn", "monthly_charges"]);
        assert_eq!(
            schema.columns[0].sample_values,
            Some(vec!["1".to_string(), "2".to_string()])
        );

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_describe_missing_dataset_is_schema_not_found() {
        let path = write_temp_csv("a\n1\n");
        let repo = Arc::new(DatasetRepository::in_memory().await.unwrap());
        let handle = repo.register_csv("gone", &path).await.unwrap();

        // Dataset deleted between listing and querying.
        repo.delete_dataset(&handle).await.unwrap();

        let introspector = SchemaIntrospector::new(repo.clone(), 3);
        let err = introspector.describe(&handle).await.unwrap_err();
        assert!(matches!(err, AppError::SchemaNotFound(ref name) if name == "gone"));

        std::fs::remove_file(&path).ok();
    }
}
