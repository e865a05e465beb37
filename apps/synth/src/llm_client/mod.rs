/// LLM Client: the single point of entry for all model calls in synth.
///
/// ARCHITECTURAL RULE: No other module may talk to the inference server directly.
/// Everything goes through the `TextGenerator` trait so the pipeline can run
/// against a stub in tests.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmSettings;

pub mod prompts;

/// Nucleus-sampling threshold sent with every request.
const TOP_P: f32 = 0.9;
/// Upper bound on generated tokens per call.
const NUM_PREDICT: u32 = 400;

/// Both variants are the "connectivity" failure kind: the run loop treats
/// them identically.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference server error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl LlmError {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            LlmError::Api { status, .. } => Some(*status),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Anything that turns a prompt into generated text.
///
/// One request per call. No retries here; retry policy belongs to the run loop.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;

    /// Human-readable model identifier, shown in the run banner.
    fn model(&self) -> &str;
}

/// Client for a local Ollama-compatible `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        // No timeout unless configured: a hung server stalls the run.
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            url: settings.url.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: SamplingOptions {
                temperature,
                top_p: TOP_P,
                num_predict: NUM_PREDICT,
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Inference server returned {}: {}", status, body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let generated: GenerateResponse = response.json().await?;

        debug!(
            "Model call succeeded in {}ms: prompt_tokens={:?}, output_tokens={:?}",
            started.elapsed().as_millis(),
            generated.prompt_eval_count,
            generated.eval_count
        );

        Ok(generated.response.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
