// File: ./src/client/mod.rs
//! Remote event extraction.
//!
//! A [`RemoteExtractor`] turns one message into zero or more loosely shaped
//! records (field names vary by provider); the normalizer brings them onto
//! the record schema. Implementations report failures as errors and leave
//! the decision to skip the message to the caller.
pub mod gemini;

pub use crate::client::gemini::GeminiClient;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// One record as returned by a remote service, before normalization.
pub type RawRecord = Map<String, Value>;

#[async_trait::async_trait]
pub trait RemoteExtractor: Send + Sync + std::fmt::Debug {
    /// Extracts events from `text`; `today` anchors relative and year-less dates.
    async fn extract(&self, text: &str, today: NaiveDate) -> Result<Vec<RawRecord>>;
}

/// Parses generated text into records.
///
/// Markdown code fences around the JSON are removed, and a lone object is
/// accepted as a one-element list.
pub fn parse_records(content: &str) -> Result<Vec<RawRecord>> {
    let json = strip_code_fence(content);
    let value: Value = serde_json::from_str(json)
        .with_context(|| format!("Response is not valid JSON: {}", preview(json)))?;
    match value {
        Value::Object(obj) => Ok(vec![obj]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(obj) => Some(obj),
                other => {
                    log::warn!("Ignoring non-object entry in response: {}", other);
                    None
                }
            })
            .collect()),
        other => Err(anyhow!("Expected a JSON object or array, got: {}", other)),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let content = content.trim();
    if let Some((_, after)) = content.split_once("```json") {
        return after.split("```").next().unwrap_or(after).trim();
    }
    let parts: Vec<&str> = content.split("```").collect();
    match parts.len() {
        1 => content,
        // An opening fence that was never closed.
        2 if parts[0].trim().is_empty() => parts[1].trim(),
        2 => parts[0].trim(),
        _ => parts[1].trim(),
    }
}

fn preview(s: &str) -> String {
    s.chars().take(120).collect()
}
