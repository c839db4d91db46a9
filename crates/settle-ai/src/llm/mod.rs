//! Text-completion collaborator used by the generative classifier.

mod client;

pub use client::ChatCompletionClient;

use async_trait::async_trait;

/// A model that turns a rendered prompt into free-form text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rate limited by model endpoint after {retries} retries")]
    RateLimited { retries: u32 },
    #[error("unexpected model response: {0}")]
    MalformedResponse(String),
}
