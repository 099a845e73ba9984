//! Gemini-backed scoring client.

use crate::prioritize::scoring::{
    parse_scored_tasks, render_prompt, ScoredTask, ScoringClient, ScoringError, ScoringItem,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model name, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// Base endpoint URL without trailing slash.
    pub endpoint: String,
    pub temperature: f32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct GeminiScoringClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiScoringClient {
    /// # Errors
    /// Returns [`ScoringError::Http`] when the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ScoringError::Http(err.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, self.config.model, self.config.api_key
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_request(items: &[ScoringItem], temperature: f32) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: render_prompt(items),
            }],
        }],
        generation_config: GenerationConfig {
            temperature,
            response_mime_type: "application/json",
        },
    }
}

fn extract_text(body: &str) -> Result<String, ScoringError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|err| ScoringError::Malformed(format!("invalid Gemini envelope: {err}")))?;

    if let Some(error) = parsed.error {
        return Err(ScoringError::Response(format!(
            "Gemini API error: {}",
            error.message
        )));
    }

    parsed
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| ScoringError::Response("no content in response".to_string()))
}

#[async_trait]
impl ScoringClient for GeminiScoringClient {
    async fn score(&self, items: &[ScoringItem]) -> Result<Vec<ScoredTask>, ScoringError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(self.url())
            .headers(headers)
            .json(&build_request(items, self.config.temperature))
            .send()
            .await
            .map_err(|err| ScoringError::Http(err.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ScoringError::Http(err.without_url().to_string()))?;

        if !status.is_success() {
            warn!(
                "event=scoring_http module=prioritize status=error http_status={}",
                status.as_u16()
            );
            return Err(ScoringError::Response(format!("HTTP {status}: {body}")));
        }

        debug!(
            "event=scoring_http module=prioritize status=ok body_bytes={}",
            body.len()
        );
        let text = extract_text(&body)?;
        parse_scored_tasks(&text)
    }
}
