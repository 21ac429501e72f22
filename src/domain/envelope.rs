use crate::domain::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The unit returned to the caller for every question.
///
/// Exactly one of {successful result, error} is authoritative, with one
/// documented exception: the degraded-success state, where the query ran
/// (`data` is present) but answer synthesis failed (`error` is also set and
/// `answer` is a templated fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Natural-language answer, or a templated fallback.
    pub answer: String,
    /// The literal query that was run, or the normalized rejected text on a
    /// policy rejection, or an empty string when no query was produced.
    pub query_used: String,
    /// Result rows, `None` when execution never happened or failed.
    pub data: Option<Vec<HashMap<String, serde_json::Value>>>,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(
        answer: String,
        query_used: String,
        data: Vec<HashMap<String, serde_json::Value>>,
    ) -> Self {
        Self {
            answer,
            query_used,
            data: Some(data),
            error: None,
        }
    }

    /// Query ran, summarization failed. Data is kept.
    pub fn degraded(
        answer: String,
        query_used: String,
        data: Vec<HashMap<String, serde_json::Value>>,
        error: &AppError,
    ) -> Self {
        Self {
            answer,
            query_used,
            data: Some(data),
            error: Some(error.to_string()),
        }
    }

    pub fn failure(answer: String, query_used: String, error: &AppError) -> Self {
        Self {
            answer,
            query_used,
            data: None,
            error: Some(error.to_string()),
        }
    }

    /// True for the degraded-success state (data present, error set).
    pub fn is_degraded(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }
}
