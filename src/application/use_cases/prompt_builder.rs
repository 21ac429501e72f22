//! Prompt construction for the two completion calls.
//!
//! Pure functions producing (system, user) pairs. The target table name is
//! always taken from the schema description, never from user input, so the
//! model cannot be steered toward an attacker-chosen object.

use crate::domain::dataset::SchemaDescription;
use std::collections::HashMap;
use std::fmt::Write;

/// Render the schema block shared by both prompts.
pub fn format_schema(schema: &SchemaDescription) -> String {
    let mut out = format!("Table: {}\nColumns:\n", schema.table_name);
    for col in &schema.columns {
        let _ = write!(out, "  - {} ({})", col.name, col.data_type);
        if let Some(samples) = &col.sample_values {
            if !samples.is_empty() {
                let _ = write!(out, " e.g. {}", samples.join(", "));
            }
        }
        out.push('\n');
    }
    out
}

/// Prompts for query synthesis.
pub fn sql_generation_prompts(schema: &SchemaDescription, question: &str) -> (String, String) {
    let system = format!(
        r#"You are a SQLite expert. Given a table schema, write a SQL query that answers the user's question.

RULES:
- Use ONLY the table "{table}".
- Use ONLY the columns listed in the schema.
- Return exactly ONE query.
- The query MUST be a read-only SELECT statement. Never use INSERT, UPDATE, DELETE, DROP, ALTER or any other statement that modifies data or schema.
- Return ONLY the SQL query: no explanation, no markdown, no code fences, on a single line."#,
        table = schema.table_name
    );

    let user = format!(
        "SCHEMA:\n{}\nQUESTION: {}\n\nSQL:",
        format_schema(schema),
        question.trim()
    );

    (system, user)
}

/// Prompts for answer summarization over a bounded result sample.
pub fn answer_prompts(
    question: &str,
    sql: &str,
    sample_rows: &[HashMap<String, serde_json::Value>],
    row_count: usize,
) -> (String, String) {
    let system = r#"You are a helpful data analyst. The user asked a question, a SQL query was run, and you are given the results.

RULES:
- Answer the question strictly from the given data. Do not use outside knowledge.
- Keep the answer to a few sentences at most.
- Never enumerate the full result table; mention only what answers the question.
- If the result set is empty, reply exactly: No data found.
- Do not include SQL or technical details."#
        .to_string();

    let sample_json =
        serde_json::to_string_pretty(sample_rows).unwrap_or_else(|_| "[]".to_string());

    let user = format!(
        "QUESTION: {}\nSQL QUERY: {}\nTOTAL ROWS: {}\nRESULT SAMPLE (first {} rows):\n{}\n\nANSWER:",
        question.trim(),
        sql,
        row_count,
        sample_rows.len(),
        sample_json
    );

    (system, user)
}
