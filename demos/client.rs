use argh::FromArgs;
use infernum_relay::{
    CarMovementCommand, ClientConfig, InferenceReport, InfernumClient,
    config::DEFAULT_SERVICE_URL, service::DEFAULT_PROMPT,
};
use std::path::PathBuf;

#[derive(FromArgs)]
/// Sends one image to the infernum relay and logs the result.
struct ClientArgs {
    /// the url of the /infer route
    #[argh(option, short = 'u', default = "DEFAULT_SERVICE_URL.to_string()")]
    url: String,

    /// the path to the image
    #[argh(option, short = 'i', default = "PathBuf::from(\"image.jpg\")")]
    image_path: PathBuf,

    /// the prompt to use
    #[argh(option, short = 'p', default = "DEFAULT_PROMPT.to_string()")]
    prompt: String,

    /// parse the response as a car movement command
    #[argh(switch)]
    navigate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ClientArgs = argh::from_env();

    let config = ClientConfig {
        service_url: args.url,
        default_prompt: args.prompt,
        ..Default::default()
    };

    let client = InfernumClient::new(config.service_url)?;

    let response = match client
        .infer_file(&args.image_path, Some(&config.default_prompt))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            log::error!("Error during API call: {e}");
            return Err(e.into());
        }
    };

    let report = InferenceReport::from(&response);
    log::info!("Response received:\n{}", report.to_pretty_json());

    if args.navigate {
        let command = CarMovementCommand::parse(&response.response)?;
        log::info!("Command: {:?}", command);
    }

    Ok(())
}
