use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use patchwatch_common::{ClassificationOracle, CommitRecord, OracleError, Verdict};

use super::parse::parse_verdict;
use super::prompt::{SYSTEM_PROMPT, build_classification_prompt};
use crate::config::ClassifierSettings;

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;
const REQUEST_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Classification oracle backed by an OpenAI-compatible chat completions
/// endpoint. Built once per run.
pub struct LlmClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl LlmClassifier {
    pub fn new(settings: &ClassifierSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build classifier HTTP client")?;
        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            max_retries: settings.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one completion request, retrying 429 and 5xx with exponential
    /// backoff. Returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let mut retries = 0u32;
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            debug!(attempt = retries + 1, model = %self.model, "Sending classification request");

            let response = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| OracleError::Transport {
                    message: e.to_string(),
                })?;

            let status = response.status();

            if status.as_u16() == 429 {
                retries += 1;
                if retries > self.max_retries {
                    return Err(OracleError::RateLimited { attempts: retries });
                }
                let wait_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(backoff_secs)
                    .min(MAX_BACKOFF_SECS);
                warn!(
                    "Rate limited (429). Waiting {} seconds before retry {}/{}",
                    wait_secs, retries, self.max_retries
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                continue;
            }

            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown".to_string());

                if status.is_server_error() && retries < self.max_retries {
                    retries += 1;
                    warn!(
                        "Server error ({}). Waiting {} seconds before retry {}/{}",
                        status, backoff_secs, retries, self.max_retries
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                return Err(OracleError::Api {
                    status: status.as_u16(),
                    body: body.trim().to_string(),
                });
            }

            let parsed: ChatResponse = response.json().await.map_err(|e| OracleError::Transport {
                message: format!("Failed to read completion: {}", e),
            })?;

            return parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .filter(|c| !c.trim().is_empty())
                .ok_or(OracleError::EmptyResponse);
        }
    }
}

#[async_trait]
impl ClassificationOracle for LlmClassifier {
    async fn classify(&self, commit: &CommitRecord) -> Result<Verdict, OracleError> {
        let prompt = build_classification_prompt(commit);
        let content = self.complete(&prompt).await?;
        Ok(parse_verdict(&content))
    }
}
