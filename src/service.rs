use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::{
    future::Future,
    sync::{Arc, RwLock},
};

use crate::{
    messages::{ErrorResponse, GenerateRequest, HealthResponse, InferenceRequest},
    navigation::{NAVIGATION_SYSTEM_PROMPT, command_schema},
    runtime::{DecodingOptions, ModelConfiguration, ModelRuntime},
};

/// Prompt substituted when a request does not carry one.
pub const DEFAULT_PROMPT: &str = "What is in this picture?";
/// Name the custom model variant is registered under.
pub const DEFAULT_MODEL_NAME: &str = "llava-custom";
/// Model the custom variant derives from.
pub const DEFAULT_BASE_MODEL: &str = "llava";

/// Represents the readiness of the service.
///
/// The service starts `Initializing` and only moves to `Ready` once the model
/// was preloaded. There is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    Initializing,
    Ready,
}

impl Readiness {
    /// Returns the state as reported by `/health`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Readiness::Initializing => "initializing",
            Readiness::Ready => "ready",
        }
    }
}

/// Fixed settings of the relay, injected at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// The model variant registered at startup and addressed by every request.
    pub model: ModelConfiguration,
    /// Prompt used when a request does not carry one.
    pub default_prompt: String,
    /// Constrain every generation to the car movement schema.
    pub constrained: bool,
    /// Sampling options sent along with constrained generations.
    pub options: DecodingOptions,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: ModelConfiguration {
                name: DEFAULT_MODEL_NAME.to_string(),
                base_model: DEFAULT_BASE_MODEL.to_string(),
                system_prompt: NAVIGATION_SYSTEM_PROMPT.to_string(),
            },
            default_prompt: DEFAULT_PROMPT.to_string(),
            constrained: true,
            options: DecodingOptions::default(),
        }
    }
}

#[derive(Debug)]
struct StartupStatus {
    readiness: Readiness,
    error: Option<String>,
}

/// Relay between HTTP clients and a model runtime.
///
/// The configuration is fixed at construction. The only mutable part is the
/// readiness recorded by [`InfernumService::start_up`].
pub struct InfernumService<R: ModelRuntime> {
    runtime: R,
    config: ServiceConfig,
    schema: Option<serde_json::Value>,
    status: RwLock<StartupStatus>,
}

impl<R: ModelRuntime> InfernumService<R> {
    /// Creates the service in the `Initializing` state.
    pub fn new(runtime: R, config: ServiceConfig) -> Self {
        let schema = config.constrained.then(command_schema);
        Self {
            runtime,
            config,
            schema,
            status: RwLock::new(StartupStatus {
                readiness: Readiness::Initializing,
                error: None,
            }),
        }
    }

    /// The runtime requests are forwarded to.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// The schema attached to every generation, if output is constrained.
    pub fn schema(&self) -> Option<&serde_json::Value> {
        self.schema.as_ref()
    }

    /// Whether the model was preloaded yet.
    pub fn readiness(&self) -> Readiness {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .readiness
    }

    /// The error of the last failed startup step, if any.
    pub fn startup_error(&self) -> Option<String> {
        self.status
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .error
            .clone()
    }

    fn record_startup(&self, readiness: Readiness, error: Option<String>) {
        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        status.readiness = readiness;
        status.error = error;
    }

    /// Creates the model variant and issues an empty warm-up generation.
    ///
    /// Both steps are best-effort and run independently: a failed create still
    /// preloads, since the variant may exist from an earlier run. The service
    /// becomes `Ready` once the warm-up succeeds; any failure is recorded in
    /// [`InfernumService::startup_error`].
    pub async fn start_up(&self) {
        if self.readiness() == Readiness::Ready {
            return;
        }
        let model = &self.config.model;
        let mut errors = Vec::new();

        match self.runtime.create_model(model).await {
            Ok(()) => log::info!("Custom model {} created successfully", model.name),
            Err(e) => {
                log::error!("Error creating custom model: {e}");
                errors.push(format!("Error creating custom model: {e}"));
            }
        }

        let warm_up = GenerateRequest {
            model: model.name.clone(),
            prompt: String::new(),
            images: Vec::new(),
            stream: false,
            format: None,
            options: None,
        };
        let readiness = match self.runtime.generate(warm_up).await {
            Ok(_) => {
                log::info!("Model {} preloaded successfully", model.name);
                Readiness::Ready
            }
            Err(e) => {
                log::error!("Error preloading model: {e}");
                errors.push(format!("Error preloading model: {e}"));
                Readiness::Initializing
            }
        };

        let error = (!errors.is_empty()).then(|| errors.join("; "));
        self.record_startup(readiness, error);
    }

    /// Builds the runtime request for an image and an optional prompt.
    pub fn generate_request(&self, image: String, prompt: Option<String>) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.name.clone(),
            prompt: prompt.unwrap_or_else(|| self.config.default_prompt.clone()),
            images: vec![image],
            stream: false,
            format: self.schema.clone(),
            options: self.config.constrained.then_some(self.config.options),
        }
    }
}

/// Checks that `image` is base64 that decodes to a non-empty payload.
///
/// Returns the decoded length. The caller trims surrounding whitespace so the
/// checked value is the one forwarded to the runtime.
pub fn check_image(image: &str) -> Result<usize, String> {
    let bytes = STANDARD
        .decode(image)
        .map_err(|e| format!("'image' is not valid base64: {e}"))?;
    if bytes.is_empty() {
        return Err("'image' decodes to an empty payload".to_string());
    }
    Ok(bytes.len())
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorResponse::new(error))).into_response()
}

async fn post_infer<R: ModelRuntime>(
    State(service): State<Arc<InfernumService<R>>>,
    payload: Result<Json<InferenceRequest>, JsonRejection>,
) -> axum::response::Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            log::warn!("Rejecting malformed payload: {rejection}");
            return error_response(
                StatusCode::BAD_REQUEST,
                "JSON payload with 'image' field is required",
            );
        }
    };

    let InferenceRequest {
        image: Some(image),
        prompt,
    } = payload
    else {
        log::warn!("Request missing 'image' field in payload");
        return error_response(
            StatusCode::BAD_REQUEST,
            "JSON payload with 'image' field is required",
        );
    };

    let image = image.trim();
    let image_len = match check_image(image) {
        Ok(len) => len,
        Err(error_msg) => {
            log::warn!("Rejecting request: {error_msg}");
            return error_response(StatusCode::BAD_REQUEST, error_msg);
        }
    };

    let request = service.generate_request(image.to_string(), prompt);
    log::info!(
        "Processing inference request ({} bytes) with prompt: {}...",
        image_len,
        request.prompt.chars().take(50).collect::<String>()
    );

    let response = match service.runtime.generate(request).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Error generating response from the model runtime: {e}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating response from the model runtime: {e}"),
            );
        }
    };

    // the body is the result serialized into a JSON string, clients decode twice
    match serde_json::to_string(&response) {
        Ok(encoded) => {
            log::info!("Successfully generated response");
            (StatusCode::OK, Json(encoded)).into_response()
        }
        Err(e) => {
            log::error!("Error encoding the runtime response: {e}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error encoding the runtime response: {e}"),
            )
        }
    }
}

async fn get_health<R: ModelRuntime>(
    State(service): State<Arc<InfernumService<R>>>,
) -> impl IntoResponse {
    let readiness = service.readiness();
    let status = match readiness {
        Readiness::Ready => StatusCode::OK,
        Readiness::Initializing => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(HealthResponse {
            status: readiness.as_str().to_string(),
            model: service.config.model.name.clone(),
            error: service.startup_error(),
        }),
    )
}

/// Builds the relay's routes: `/`, `/health` and `/infer`.
pub fn router<R: ModelRuntime>(service: Arc<InfernumService<R>>) -> Router {
    Router::new()
        .route("/", get(|| async { "Welcome to Infernum Relay!" }))
        .route("/health", get(get_health::<R>))
        .route("/infer", post(post_infer::<R>))
        .with_state(service)
}

/// Serves the relay on `listener` until `shutdown` resolves.
///
/// Startup runs in the background, so `/infer` accepts connections while the
/// model is still being created and preloaded.
pub async fn serve<R, F>(
    listener: tokio::net::TcpListener,
    service: Arc<InfernumService<R>>,
    shutdown: F,
) -> std::io::Result<()>
where
    R: ModelRuntime,
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn({
        let service = service.clone();
        async move { service.start_up().await }
    });

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}
