use warcvault_api::setup;
use warcvault_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    warcvault_api::telemetry::init_telemetry();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "Configuration loaded");

    let (_state, router) = setup::initialize_app(config.clone()).await?;
    setup::server::start_server(&config, router).await?;

    Ok(())
}
