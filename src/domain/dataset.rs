use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logical reference to one registered tabular dataset.
///
/// Immutable once created. The physical table is owned by the dataset
/// repository and dropped when the dataset is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetHandle {
    /// User-facing name of the dataset.
    pub name: String,
    /// Physical table backing the dataset.
    pub table_name: String,
    pub column_count: usize,
    pub row_count: usize,
}

/// One column of a dataset schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// A few example values, stringified, to ground the LLM.
    pub sample_values: Option<Vec<String>>,
}

/// Column listing for a dataset, recomputed from the live table on every
/// question so it always reflects the current storage state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub table_name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Materialized result of a SELECT query.
///
/// Row order is whatever the execution engine returned. Zero rows is a
/// valid state, distinct from execution failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, serde_json::Value>>,
    pub row_count: usize,
}
