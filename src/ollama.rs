use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    messages::{GenerateRequest, GenerateResponse},
    runtime::{ModelConfiguration, ModelRuntime},
};

/// Where a local Ollama server listens by default.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error("failed to reach the runtime: {0}")]
    Http(#[from] reqwest::Error),

    #[error("runtime returned {status}: {message}")]
    Status { status: StatusCode, message: String },
}

/// Model runtime backed by an Ollama server's HTTP API.
#[derive(Debug, Clone)]
pub struct OllamaRuntime {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    model: &'a str,
    from: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct RuntimeError {
    error: String,
}

impl OllamaRuntime {
    /// Creates a runtime for the server at `base_url`, a trailing `/` is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The server URL without a trailing `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, OllamaError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // the runtime reports failures as {"error": "..."}
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RuntimeError>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        Err(OllamaError::Status { status, message })
    }
}

impl Default for OllamaRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

impl ModelRuntime for OllamaRuntime {
    type Error = OllamaError;

    async fn create_model(&self, config: &ModelConfiguration) -> Result<(), Self::Error> {
        log::debug!(
            "Creating model {} from {}",
            config.name,
            config.base_model
        );
        self.post(
            "/api/create",
            &CreateRequest {
                model: &config.name,
                from: &config.base_model,
                system: &config.system_prompt,
                stream: false,
            },
        )
        .await?;
        Ok(())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, Self::Error> {
        let request = GenerateRequest {
            stream: false,
            ..request
        };
        let response = self.post("/api/generate", &request).await?;
        Ok(response.json::<GenerateResponse>().await?)
    }
}
