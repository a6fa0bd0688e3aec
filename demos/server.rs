use argh::FromArgs;
use infernum_relay::{
    InfernumService, ModelConfiguration, OllamaRuntime, ServiceConfig,
    config::{DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT},
    navigation::NAVIGATION_SYSTEM_PROMPT,
    ollama::DEFAULT_OLLAMA_URL,
    serve,
    service::{DEFAULT_BASE_MODEL, DEFAULT_MODEL_NAME, DEFAULT_PROMPT},
};
use std::sync::Arc;

#[derive(FromArgs)]
/// Infernum relay forwards images and prompts to a multimodal model runtime.
struct RelayArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_LISTEN_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_LISTEN_PORT")]
    port: u16,

    /// the url of the ollama runtime
    #[argh(option, default = "DEFAULT_OLLAMA_URL.to_string()")]
    ollama_url: String,

    /// the name to register the custom model under
    #[argh(option, default = "DEFAULT_MODEL_NAME.to_string()")]
    model: String,

    /// the base model of the custom model
    #[argh(option, default = "DEFAULT_BASE_MODEL.to_string()")]
    base_model: String,

    /// the prompt used when a request carries none
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    prompt: String,

    /// return free-form text instead of movement commands
    #[argh(switch)]
    unconstrained: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: RelayArgs = argh::from_env();

    let config = ServiceConfig {
        model: ModelConfiguration {
            name: args.model,
            base_model: args.base_model,
            system_prompt: NAVIGATION_SYSTEM_PROMPT.to_string(),
        },
        default_prompt: args.prompt,
        constrained: !args.unconstrained,
        ..Default::default()
    };

    let service = Arc::new(InfernumService::new(
        OllamaRuntime::new(args.ollama_url),
        config,
    ));

    if let Some(schema) = service.schema() {
        log::info!(
            "CarMovementCommand JSON Schema:\n{}",
            serde_json::to_string_pretty(schema)?
        );
    }
    log::info!("🧠 Model runtime at: {}", service.runtime().base_url());

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    log::info!("🚀 Starting the server");
    log::info!("🔥 Listening on: {}", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, service, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Shutting down"),
            Err(e) => log::error!("Failed to listen for Ctrl+C, shutting down: {e}"),
        }
    })
    .await?;

    Ok(())
}
