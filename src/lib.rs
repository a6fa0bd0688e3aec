//! HTTP relay between image clients and a multimodal model runtime.
//!
//! The [`service`] exposes a single `POST /infer` route that forwards a base64
//! image and a prompt to a [`ModelRuntime`], optionally constraining the output
//! to a [`CarMovementCommand`]. The [`client`] and [`capture`] modules send
//! images to that route, once or in a loop.

pub mod capture;
pub mod client;
pub mod config;
pub mod messages;
pub mod navigation;
pub mod ollama;
pub mod runtime;
pub mod service;

pub use capture::{CaptureError, FileSource, FrameSource, LoopSettings, LoopStats, capture_loop};
pub use client::{ClientError, InferenceReport, InfernumClient, nanos_to_secs};
pub use config::{ClientConfig, ImageResolution};
pub use messages::{ErrorResponse, GenerateRequest, GenerateResponse, InferenceRequest};
pub use navigation::{CarMovementCommand, CommandError, Movement, command_schema};
pub use ollama::{OllamaError, OllamaRuntime};
pub use runtime::{DecodingOptions, ModelConfiguration, ModelRuntime};
pub use service::{InfernumService, Readiness, ServiceConfig, router, serve};

#[cfg(feature = "camera")]
pub use capture::CameraSource;
