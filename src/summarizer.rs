//! Adapter around an external text-summarization model.
//!
//! The model is reached over HTTP using the inference wire shape
//! `{"inputs": ..., "parameters": {...}}` → `[{"summary_text": ...}]`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bookshelf_kernel::settings::SummarizerSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no text to summarize")]
    EmptyInput,

    #[error("summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("summarizer responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("summarizer returned no summary")]
    EmptyResponse,
}

/// Turns long text into a shorter text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

/// Length bounds passed to the model; sampling is always off so output is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryBounds {
    pub min_length: u32,
    pub max_length: u32,
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    inputs: &'a str,
    parameters: SummarizeParameters,
}

#[derive(Debug, Serialize)]
struct SummarizeParameters {
    min_length: u32,
    max_length: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummarizeOutput {
    summary_text: String,
}

pub struct HttpSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    bounds: SummaryBounds,
}

impl HttpSummarizer {
    pub fn new(settings: &SummarizerSettings) -> anyhow::Result<Self> {
        anyhow::ensure!(
            settings.min_length <= settings.max_length,
            "summarizer min_length {} exceeds max_length {}",
            settings.min_length,
            settings.max_length
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to build summarizer HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_token: settings.api_token.clone(),
            bounds: SummaryBounds {
                min_length: settings.min_length,
                max_length: settings.max_length,
            },
        })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        if text.trim().is_empty() {
            return Err(SummarizeError::EmptyInput);
        }

        let body = SummarizeRequest {
            inputs: text,
            parameters: SummarizeParameters {
                min_length: self.bounds.min_length,
                max_length: self.bounds.max_length,
                do_sample: false,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            input_chars = text.chars().count(),
            "requesting summary"
        );

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "summarizer rejected request");
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let outputs: Vec<SummarizeOutput> = response.json().await?;
        outputs
            .into_iter()
            .next()
            .map(|output| output.summary_text)
            .filter(|summary| !summary.trim().is_empty())
            .ok_or(SummarizeError::EmptyResponse)
    }
}
