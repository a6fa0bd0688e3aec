use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use serde::Serialize;
use std::{path::Path, time::Duration};

use crate::messages::{ErrorResponse, GenerateResponse, InferenceRequest};

/// Every request is abandoned after this long.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read the image: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("malformed response payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP client for the relay's `/infer` route.
#[derive(Debug, Clone)]
pub struct InfernumClient {
    http: reqwest::Client,
    url: String,
}

impl InfernumClient {
    /// Creates a client for the full URL of the `/infer` route.
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// The URL every request is posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one image and returns the runtime's result.
    ///
    /// The service answers with a JSON string holding the result, so the body
    /// is decoded twice.
    pub async fn infer(
        &self,
        image: &[u8],
        prompt: Option<&str>,
    ) -> Result<GenerateResponse, ClientError> {
        let payload = InferenceRequest {
            image: Some(STANDARD.encode(image)),
            prompt: prompt.map(str::to_string),
        };

        log::info!("Sending request to {}", self.url);
        let response = self.http.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            // the service reports failures as {"error": "..."}
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(ClientError::Status { status, message });
        }

        let encoded = response.json::<String>().await?;
        Ok(serde_json::from_str(&encoded)?)
    }

    /// Reads an image file and sends it with [`InfernumClient::infer`].
    pub async fn infer_file(
        &self,
        path: impl AsRef<Path>,
        prompt: Option<&str>,
    ) -> Result<GenerateResponse, ClientError> {
        let image = tokio::fs::read(path).await?;
        self.infer(&image, prompt).await
    }
}

/// Converts a runtime duration in nanoseconds to seconds.
pub fn nanos_to_secs(nanos: u64) -> f64 {
    nanos as f64 / 1e9
}

/// Presentation view of a generation result.
///
/// Durations are in seconds, missing ones count as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceReport {
    pub model: Option<String>,
    pub response: String,
    /// Tokens in the evaluated prompt.
    pub n_prompt_tokens: Option<u64>,
    /// Tokens generated for the response.
    pub n_completion_tokens: Option<u64>,
    /// Length of the returned context, zero when absent.
    pub n_context_tokens: usize,
    pub load_duration: f64,
    pub eval_duration: f64,
    pub prompt_eval_duration: f64,
    pub total_duration: f64,
}

impl From<&GenerateResponse> for InferenceReport {
    fn from(response: &GenerateResponse) -> Self {
        let secs = |nanos: Option<u64>| nanos_to_secs(nanos.unwrap_or(0));
        Self {
            model: response.model.clone(),
            response: response.response.clone(),
            n_prompt_tokens: response.prompt_eval_count,
            n_completion_tokens: response.eval_count,
            n_context_tokens: response.context.as_ref().map_or(0, Vec::len),
            load_duration: secs(response.load_duration),
            eval_duration: secs(response.eval_duration),
            prompt_eval_duration: secs(response.prompt_eval_duration),
            total_duration: secs(response.total_duration),
        }
    }
}

impl InferenceReport {
    /// Pretty-printed JSON for log output.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
