//! Model transport and the retry-wrapped client used by every model call.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tally_core::PipelineError;
use tracing::debug;

use crate::retry::{RetryOutcome, RetryPolicy};
use crate::schema::{GenerateRequest, GenerateResponse};

/// Sends one request to the model. Implementations make a single attempt;
/// retrying is the caller's concern.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// HTTP transport for the Generative Language `generateContent` endpoint
pub struct GeminiTransport {
    http: reqwest::Client,
    settings: ModelSettings,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(settings: ModelSettings, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            settings,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        debug!(model = %self.settings.model, "calling model");
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .context("model request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("model error: {status} {txt}");
        }

        resp.json().await.context("parse model response")
    }
}

/// A transport paired with the retry policy applied to every call
#[derive(Clone)]
pub struct ModelClient {
    transport: Arc<dyn ModelTransport>,
    policy: RetryPolicy,
}

impl ModelClient {
    pub fn new(transport: Arc<dyn ModelTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request`, retrying every failure per the policy.
    pub async fn call(&self, request: &GenerateRequest) -> Result<GenerateResponse, PipelineError> {
        let outcome = self
            .policy
            .run(|_| self.transport.generate(request))
            .await;

        match outcome {
            RetryOutcome::Success(resp) => Ok(resp),
            RetryOutcome::Exhausted { last_error, attempts } => Err(PipelineError::RemoteCallExhausted {
                attempts,
                message: format!("{last_error:#}"),
            }),
            RetryOutcome::NotAttempted => Err(PipelineError::NotAttempted),
        }
    }

    /// Free-text call: the first text part of the response, trimmed (empty if absent).
    pub async fn call_text(&self, request: &GenerateRequest) -> Result<String, PipelineError> {
        let resp = self.call(request).await?;
        Ok(resp.first_text().unwrap_or_default().trim().to_string())
    }
}
