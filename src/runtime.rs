use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::messages::{GenerateRequest, GenerateResponse};

/// Trait for the model-serving runtime the relay forwards requests to.
///
/// The runtime owns model creation, weight loading and decoding. The relay
/// only registers a model variant once at startup and then issues
/// single, non-streaming generation calls.
pub trait ModelRuntime: Send + Sync + 'static {
    /// The error type that can be returned by the runtime.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Registers a named model variant built from a base model and a system prompt.
    fn create_model(
        &self,
        config: &ModelConfiguration,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Runs one generation and returns the runtime's result.
    fn generate(
        &self,
        request: GenerateRequest,
    ) -> impl Future<Output = Result<GenerateResponse, Self::Error>> + Send;
}

/// A custom model variant registered once when the service starts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelConfiguration {
    /// Name the variant is registered under and addressed by.
    pub name: String,
    /// The model the variant derives from.
    pub base_model: String,
    /// System prompt baked into the variant.
    pub system_prompt: String,
}

/// Sampling options passed along with schema-constrained requests.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DecodingOptions {
    /// Sampling temperature, zero picks the most likely token.
    pub temperature: f32,
    /// Seed of the sampler, fixed for reproducible output.
    pub seed: i64,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            seed: 42,
        }
    }
}
