// File: ./src/client/gemini.rs
// Event extraction through the Gemini `generateContent` endpoint.
use crate::client::{RawRecord, RemoteExtractor, parse_records};
use crate::config::RemoteConfig;
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Outcome of one request: generated text, or a non-success status worth a retry.
enum Attempt {
    Text(String),
    Rejected(StatusCode, String),
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    fallback_model: Option<String>,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: &RemoteConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            bail!("Remote extraction needs an API key");
        }
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let fallback_model = Some(config.fallback_model.trim())
            .filter(|m| !m.is_empty() && *m != config.model)
            .map(str::to_string);
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            fallback_model,
            generation: GenerationConfig {
                temperature: config.temperature,
                top_k: config.top_k,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Instructions sent along with the message. Asks for ISO dates and
    /// 24-hour times anchored on `today`.
    pub fn prompt(text: &str, today: NaiveDate) -> String {
        format!(
            r#"Extract quiz event details from the following chat message:

{text}

INSTRUCTIONS:
- The current date is {today}.
- Only consider quiz or competition announcements; ignore system messages and personal conversation.
- Preserve Unicode in every field and return valid UTF-8 JSON.
- date must be ISO 8601 (YYYY-MM-DD). If the year is missing, use the current year.
- time must be 24-hour HH:MM. Convert AM/PM times.
- If the venue is an auditorium, a room number or similar, include the college name.
For each event return an object with exactly these fields:
- title: the full name of the quiz
- date: YYYY-MM-DD
- time: HH:MM
- venue: where the quiz takes place
- registration_link: the full registration URL
Return a JSON object, or an array of objects when there are several events. No explanatory text."#,
            text = text,
            today = today.format("%Y-%m-%d"),
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn call(&self, model: &str, body: &GenerateRequest) -> Result<Attempt> {
        let resp = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to model '{}' failed", model))?;

        let status = resp.status();
        if !status.is_success() {
            let raw = match resp.text().await {
                Ok(raw) => raw,
                Err(e) => {
                    log::debug!("Could not read {} body from model '{}': {}", status, model, e);
                    String::new()
                }
            };
            return Ok(Attempt::Rejected(status, error_message(&raw)));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .with_context(|| format!("Unreadable response from model '{}'", model))?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("Model '{}' returned no candidates", model))?;
        Ok(Attempt::Text(text))
    }
}

/// The `error.message` of a rejection body, when there is one.
fn error_message(raw: &str) -> String {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[async_trait::async_trait]
impl RemoteExtractor for GeminiClient {
    async fn extract(&self, text: &str, today: NaiveDate) -> Result<Vec<RawRecord>> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Self::prompt(text, today),
                }],
            }],
            generation_config: self.generation,
        };

        let content = match self.call(&self.model, &body).await? {
            Attempt::Text(content) => content,
            Attempt::Rejected(status, message) => {
                let Some(fallback) = &self.fallback_model else {
                    bail!("Model '{}' returned {}: {}", self.model, status, message);
                };
                log::warn!(
                    "Model '{}' returned {}: {}. Retrying with '{}'",
                    self.model,
                    status,
                    message,
                    fallback
                );
                match self.call(fallback, &body).await? {
                    Attempt::Text(content) => content,
                    Attempt::Rejected(status, message) => {
                        bail!("Model '{}' returned {}: {}", fallback, status, message)
                    }
                }
            }
        };

        let records = parse_records(&content)?;
        log::debug!("Remote extractor returned {} record(s)", records.len());
        Ok(records)
    }
}
