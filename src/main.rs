use anyhow::{Error, Result, anyhow};
use tickbook_client::{api::run_api_server, config::Config, utils::init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;
    init_tracing()?;

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    info!(
        storage_backend = %config.storage_backend,
        server_port = config.server_port,
        "Configuration validated"
    );

    run_api_server(config).await
}
