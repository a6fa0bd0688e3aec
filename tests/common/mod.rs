#![allow(dead_code)]

use infernum_relay::{
    GenerateRequest, GenerateResponse, InfernumService, ModelConfiguration, ModelRuntime,
    ServiceConfig, router,
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

/// Smallest valid JPEG (1x1 pixel).
pub const TINY_JPEG: &[u8] = &[
    0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xff, 0xdb, 0x00, 0x43, 0x00, 0x08, 0x06, 0x06, 0x07, 0x06,
    0x05, 0x08, 0x07, 0x07, 0x07, 0x09, 0x09, 0x08, 0x0a, 0x0c, 0x14, 0x0d, 0x0c, 0x0b, 0x0b,
    0x0c, 0x19, 0x12, 0x13, 0x0f, 0x14, 0x1d, 0x1a, 0x1f, 0x1e, 0x1d, 0x1a, 0x1c, 0x1c, 0x20,
    0x24, 0x2e, 0x27, 0x20, 0x22, 0x2c, 0x23, 0x1c, 0x1c, 0x28, 0x37, 0x29, 0x2c, 0x30, 0x31,
    0x34, 0x34, 0x34, 0x1f, 0x27, 0x39, 0x3d, 0x38, 0x32, 0x3c, 0x2e, 0x33, 0x34, 0x32, 0xff,
    0xc0, 0x00, 0x0b, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00, 0xff, 0xc4, 0x00,
    0x14, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x09, 0xff, 0xda, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3f, 0x00, 0x2a,
    0x9f, 0xff, 0xd9,
];

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// In-memory runtime that records every call and answers with `reply`.
#[derive(Default)]
pub struct MockRuntime {
    pub created: Mutex<Vec<ModelConfiguration>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
    pub fail_create: bool,
    /// Error returned by `generate` while set.
    pub fail_generate: Mutex<Option<String>>,
    pub reply: String,
}

impl MockRuntime {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ModelRuntime for MockRuntime {
    type Error = MockError;

    async fn create_model(&self, config: &ModelConfiguration) -> Result<(), Self::Error> {
        self.created.lock().unwrap().push(config.clone());
        if self.fail_create {
            return Err(MockError(format!("model '{}' not found", config.base_model)));
        }
        Ok(())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, Self::Error> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        if let Some(message) = self.fail_generate.lock().unwrap().clone() {
            return Err(MockError(message));
        }
        Ok(GenerateResponse {
            model: Some(model),
            response: self.reply.clone(),
            done: true,
            context: Some(vec![1, 2, 3]),
            prompt_eval_count: Some(10),
            eval_count: Some(3),
            load_duration: Some(2_500_000_000),
            total_duration: Some(4_000_000_000),
            ..Default::default()
        })
    }
}

/// Serves the relay on an ephemeral port and returns its address.
pub async fn spawn_service(
    runtime: MockRuntime,
    config: ServiceConfig,
) -> (SocketAddr, Arc<InfernumService<MockRuntime>>) {
    let service = Arc::new(InfernumService::new(runtime, config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = router(service.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, service)
}
