//! Dataset storage over SQLite.
//!
//! Owns the physical tables that back registered datasets:
//! - CSV registration (header cleaning, type inference, bulk insert)
//! - schema introspection primitive (name/type tuples from the live table)
//! - read-execute primitive for validated SELECT statements
//!
//! The query pipeline only ever reads through this repository; writes
//! (register, delete) belong to the owning collaborator. SQLite gives no
//! isolation between the two, so a query may observe a dataset
//! mid-replacement.

use crate::domain::dataset::{DatasetHandle, QueryResult};
use crate::domain::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row, Sqlite};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

pub struct DatasetRepository {
    pool: Pool<Sqlite>,
}

impl DatasetRepository {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory store. A larger pool would hand every
    /// connection its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Load a CSV file into a fresh table and return the dataset handle.
    pub async fn register_csv(&self, name: &str, csv_path: &Path) -> Result<DatasetHandle> {
        let mut reader = csv::Reader::from_path(csv_path)
            .map_err(|e| AppError::ParseError(format!("Failed to open CSV file: {}", e)))?;

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();
        let columns = clean_headers(&headers);
        if columns.is_empty() {
            return Err(AppError::ParseError(
                "CSV file has no header row".to_string(),
            ));
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| AppError::ParseError(format!("Failed to read CSV record: {}", e)))?;
            records.push(record);
        }

        let types = infer_column_types(&columns, &records);
        let table_name = format!("ds_{}", Uuid::new_v4().simple());

        let column_defs: Vec<String> = columns
            .iter()
            .zip(&types)
            .map(|(col, ty)| format!("{} {}", quote_ident(col), ty.sql_name()))
            .collect();
        let create_sql = format!(
            "CREATE TABLE {} ({})",
            quote_ident(&table_name),
            column_defs.join(", ")
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;

        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&table_name),
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders
        );

        for record in &records {
            let mut query = sqlx::query(&insert_sql);
            for (idx, ty) in types.iter().enumerate() {
                let raw = record.get(idx).unwrap_or("").trim();
                query = if raw.is_empty() {
                    query.bind(Option::<String>::None)
                } else {
                    match ty {
                        ColumnType::Integer => match raw.parse::<i64>() {
                            Ok(v) => query.bind(v),
                            Err(_) => query.bind(raw.to_string()),
                        },
                        ColumnType::Real => match raw.parse::<f64>() {
                            Ok(v) => query.bind(v),
                            Err(_) => query.bind(raw.to_string()),
                        },
                        ColumnType::Text => query.bind(raw.to_string()),
                    }
                };
            }
            query
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to insert row: {}", e)))?;
        }

        info!(
            dataset = name,
            table = %table_name,
            columns = columns.len(),
            rows = records.len(),
            "Registered CSV dataset"
        );

        Ok(DatasetHandle {
            name: name.to_string(),
            table_name,
            column_count: columns.len(),
            row_count: records.len(),
        })
    }

    /// Drop the table backing a dataset. Owning-collaborator operation; the
    /// pipeline itself never calls this.
    pub async fn delete_dataset(&self, handle: &DatasetHandle) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_ident(&handle.table_name));
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to drop table: {}", e)))?;
        info!(dataset = %handle.name, table = %handle.table_name, "Deleted dataset");
        Ok(())
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to check table: {}", e)))?;
        Ok(row.is_some())
    }

    /// Schema-introspection primitive: (column name, declared type) tuples
    /// from the live table, in declaration order.
    pub async fn table_columns(&self, table_name: &str) -> Result<Vec<(String, String)>> {
        // PRAGMA arguments cannot be bound, so the identifier is quoted in.
        let sql = format!("PRAGMA table_info({})", quote_ident(table_name));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read table info: {}", e)))?;

        let mut columns = Vec::new();
        for row in rows {
            let name: String = row
                .try_get("name")
                .map_err(|e| AppError::DatabaseError(format!("Failed to parse column name: {}", e)))?;
            let data_type: String = row
                .try_get("type")
                .map_err(|e| AppError::DatabaseError(format!("Failed to parse column type: {}", e)))?;
            columns.push((name, data_type));
        }
        Ok(columns)
    }

    /// A few rows from the table, stringified per column, for prompt
    /// grounding.
    pub async fn sample_rows(
        &self,
        table_name: &str,
        limit: usize,
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_ident(table_name),
            limit
        );
        let result = self.fetch_all(&sql).await?;
        Ok(result.rows)
    }

    /// Read-execute primitive. Callers must have passed the query through
    /// the sanitizer; this layer reports backend errors verbatim.
    pub async fn fetch_all(&self, sql: &str) -> Result<QueryResult> {
        debug!(sql, "Executing SELECT");
        let result = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::ExecutionError(e.to_string()))?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows_json: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        for row in &result {
            if columns.is_empty() {
                columns = row.columns().iter().map(|c| c.name().to_string()).collect();
            }

            let mut row_map = HashMap::new();
            for (i, column) in row.columns().iter().enumerate() {
                row_map.insert(column.name().to_string(), extract_column_value(row, i));
            }
            rows_json.push(row_map);
        }

        Ok(QueryResult {
            columns,
            row_count: rows_json.len(),
            rows: rows_json,
        })
    }
}

/// Extract a column value from a row as `serde_json::Value`, trying types
/// in order of SQLite affinity likelihood.
fn extract_column_value(row: &SqliteRow, index: usize) -> serde_json::Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v
            .map(|n| serde_json::Value::Number(n.into()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v
            .map(serde_json::Value::Bool)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return v
            .map(|dt| serde_json::Value::String(dt.to_string()))
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return v
            .map(|d| serde_json::Value::String(d.to_string()))
            .unwrap_or(serde_json::Value::Null);
    }

    serde_json::Value::Null
}

/// Double-quote an identifier for SQLite, escaping embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Lowercase headers, replace non-alphanumerics with underscores, and
/// deduplicate collisions with a numeric suffix.
fn clean_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut cleaned = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        let mut name: String = header
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if name.is_empty() || name.chars().all(|c| c == '_') {
            name = format!("column_{}", idx + 1);
        }
        if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            name = format!("c_{}", name);
        }

        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            name = format!("{}_{}", name, count);
        }
        cleaned.push(name);
    }

    cleaned
}

/// Infer INTEGER/REAL/TEXT per column from the non-empty values.
fn infer_column_types(columns: &[String], records: &[csv::StringRecord]) -> Vec<ColumnType> {
    (0..columns.len())
        .map(|idx| {
            let mut saw_value = false;
            let mut all_integer = true;
            let mut all_real = true;

            for record in records {
                let raw = record.get(idx).unwrap_or("").trim();
                if raw.is_empty() {
                    continue;
                }
                saw_value = true;
                if raw.parse::<i64>().is_err() {
                    all_integer = false;
                }
                if raw.parse::<f64>().is_err() {
                    all_real = false;
                }
                if !all_integer && !all_real {
                    break;
                }
            }

            if !saw_value {
                ColumnType::Text
            } else if all_integer {
                ColumnType::Integer
            } else if all_real {
                ColumnType::Real
            } else {
                ColumnType::Text
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("datachat_test_{}.csv", Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_clean_headers() {
        let headers = csv::StringRecord::from(vec!["Customer ID", "Monthly Charges", "churn"]);
        let cleaned = clean_headers(&headers);
        assert_eq!(cleaned, vec!["customer_id", "monthly_charges", "churn"]);
    }

    #[test]
    fn test_clean_headers_dedup_and_empty() {
        let headers = csv::StringRecord::from(vec!["name", "name", "", "1st"]);
        let cleaned = clean_headers(&headers);
        assert_eq!(cleaned, vec!["name", "name_2", "column_3", "c_1st"]);
    }

    #[test]
    fn test_infer_column_types() {
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let records = vec![
            csv::StringRecord::from(vec!["1", "1.5", "x"]),
            csv::StringRecord::from(vec!["2", "", "y"]),
        ];
        let types = infer_column_types(&columns, &records);
        assert_eq!(
            types,
            vec![ColumnType::Integer, ColumnType::Real, ColumnType::Text]
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }

    #[tokio::test]
    async fn test_register_csv_and_introspect() {
        let path = write_temp_csv("customer_id,churn,monthly_charges\n1,1,29.85\n2,0,56.95\n3,1,42.30\n");
        let repo = DatasetRepository::in_memory().await.unwrap();

        let handle = repo.register_csv("churn", &path).await.unwrap();
        assert_eq!(handle.column_count, 3);
        assert_eq!(handle.row_count, 3);
        assert!(repo.table_exists(&handle.table_name).await.unwrap());

        let columns = repo.table_columns(&handle.table_name).await.unwrap();
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["customer_id", "churn", "monthly_charges"]);
        assert_eq!(columns[0].1, "INTEGER");
        assert_eq!(columns[2].1, "REAL");

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_fetch_all_materializes_rows() {
        let path = write_temp_csv("customer_id,churn\n1,1\n2,0\n");
        let repo = DatasetRepository::in_memory().await.unwrap();
        let handle = repo.register_csv("churn", &path).await.unwrap();

        let sql = format!(
            "SELECT COUNT(*) AS churned FROM {} WHERE churn = 1",
            handle.table_name
        );
        let result = repo.fetch_all(&sql).await.unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.columns, vec!["churned"]);
        assert_eq!(
            result.rows[0].get("churned"),
            Some(&serde_json::Value::Number(1.into()))
        );

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_fetch_all_empty_result_is_not_an_error() {
        let path = write_temp_csv("customer_id,churn\n1,0\n");
        let repo = DatasetRepository::in_memory().await.unwrap();
        let handle = repo.register_csv("churn", &path).await.unwrap();

        let sql = format!("SELECT * FROM {} WHERE churn = 1", handle.table_name);
        let result = repo.fetch_all(&sql).await.unwrap();
        assert_eq!(result.row_count, 0);
        assert!(result.rows.is_empty());

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_fetch_all_surfaces_backend_error() {
        let repo = DatasetRepository::in_memory().await.unwrap();
        let err = repo.fetch_all("SELECT * FROM missing_table").await.unwrap_err();
        assert!(matches!(err, AppError::ExecutionError(_)));
    }

    #[tokio::test]
    async fn test_delete_dataset_drops_table() {
        let path = write_temp_csv("a,b\n1,2\n");
        let repo = DatasetRepository::in_memory().await.unwrap();
        let handle = repo.register_csv("tiny", &path).await.unwrap();

        repo.delete_dataset(&handle).await.unwrap();
        assert!(!repo.table_exists(&handle.table_name).await.unwrap());

        std::fs::remove_file(&path).ok();
    }
}
