use argh::FromArgs;
use infernum_relay::{
    CameraSource, ClientConfig, ImageResolution, InfernumClient, LoopSettings, capture_loop,
    config::{
        DEFAULT_CAPTURE_INTERVAL, DEFAULT_IMAGE_RESOLUTION, DEFAULT_SERVICE_URL, capture_interval,
    },
    service::DEFAULT_PROMPT,
};

#[derive(FromArgs)]
/// Captures camera frames on a fixed interval and asks the relay where to drive.
struct NavigatorArgs {
    /// the url of the /infer route
    #[argh(option, short = 'u', default = "DEFAULT_SERVICE_URL.to_string()")]
    url: String,

    /// the camera id to capture from
    #[argh(option, short = 'c', default = "0")]
    camera_id: u32,

    /// the camera frame rate
    #[argh(option, default = "30")]
    fps: u32,

    /// the capture resolution as WIDTHxHEIGHT
    #[argh(option, short = 'r', default = "DEFAULT_IMAGE_RESOLUTION")]
    resolution: ImageResolution,

    /// seconds between two captures
    #[argh(option, short = 'i', default = "DEFAULT_CAPTURE_INTERVAL.as_secs_f64()")]
    interval: f64,

    /// the prompt to use
    #[argh(option, short = 'p', default = "DEFAULT_PROMPT.to_string()")]
    prompt: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: NavigatorArgs = argh::from_env();

    let config = ClientConfig {
        service_url: args.url,
        default_prompt: args.prompt,
        capture_interval: capture_interval(args.interval)?,
        image_resolution: args.resolution,
    };

    let client = InfernumClient::new(config.service_url.clone())?;
    let camera = CameraSource::open(args.camera_id, args.fps, config.image_resolution)?;

    log::info!("📷 Sending frames to: {}", client.url());
    log::info!("🔧 Press Ctrl+C to stop capturing");

    // the camera is moved into the loop and released when it returns
    let stats = capture_loop(
        &client,
        camera,
        LoopSettings {
            interval: config.capture_interval,
            prompt: Some(config.default_prompt),
            navigate: true,
        },
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl+C, stopping: {e}");
            }
        },
    )
    .await;

    log::info!("{} of {} cycles succeeded", stats.succeeded, stats.cycles());
    Ok(())
}
