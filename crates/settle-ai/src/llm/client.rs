use super::{CompletionModel, ModelError};
use crate::config::ModelConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;
const BACKOFF_MULTIPLIER: u64 = 2;

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl ChatCompletionClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Model ids served by the endpoint.
    pub async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let mut request = self.http.get(format!("{}/models", self.base_url));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate_str(&text, 200).to_string(),
            });
        }

        parse_model_list(&text)
    }
}

#[async_trait]
impl CompletionModel for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let mut retry_count = 0;

        loop {
            let mut builder = self.http.post(&url).json(&request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                return parse_chat_response(&text);
            }

            if status.as_u16() == 429 {
                if retry_count >= MAX_RETRIES {
                    return Err(ModelError::RateLimited {
                        retries: retry_count,
                    });
                }
                retry_count += 1;
                let delay = backoff_delay(retry_count, &text);
                warn!(
                    attempt = retry_count,
                    max = MAX_RETRIES,
                    delay_secs = delay.as_secs(),
                    "model endpoint rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(ModelError::Status {
                status: status.as_u16(),
                body: truncate_str(&text, 200).to_string(),
            });
        }
    }
}

fn parse_chat_response(text: &str) -> Result<String, ModelError> {
    let parsed: ChatResponse = serde_json::from_str(text).map_err(|err| {
        ModelError::MalformedResponse(format!("{err}: {}", truncate_str(text, 200)))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            ModelError::MalformedResponse("response carried no message content".to_string())
        })
}

fn parse_model_list(text: &str) -> Result<Vec<String>, ModelError> {
    let parsed: ModelList = serde_json::from_str(text)
        .map_err(|err| ModelError::MalformedResponse(err.to_string()))?;
    Ok(parsed.data.into_iter().map(|entry| entry.id).collect())
}

fn backoff_delay(attempt: u32, body: &str) -> Duration {
    let secs = parse_retry_after(body)
        .unwrap_or((INITIAL_BACKOFF_MS * BACKOFF_MULTIPLIER.pow(attempt - 1)) / 1000);
    Duration::from_secs(secs)
}

/// Looks for a "retry after N" hint in an error body.
fn parse_retry_after(text: &str) -> Option<u64> {
    let lower = text.to_lowercase();
    let pos = lower.find("retry")?;
    lower[pos..]
        .split_whitespace()
        .skip(1)
        .take(5)
        .filter_map(|word| {
            word.trim_matches(|c: char| !c.is_ascii_digit())
                .parse::<u64>()
                .ok()
        })
        .find(|secs| *secs > 0 && *secs < 300)
}

fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
