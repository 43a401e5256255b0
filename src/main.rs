use std::process::ExitCode;

use clap::Parser;
use metal_factory::config::Config;
use metal_factory::{http, snapshot, telemetry, InMemoryModelStore, Shop, TokenSigner};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let config = Config::parse();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "metal-factory exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;
    let signer = TokenSigner::new(config.token_secret.as_bytes(), config.token_ttl()?)?;

    let store = match &config.data_file {
        Some(path) => match snapshot::load(path)? {
            Some(store) => store,
            None => {
                info!(path = %path.display(), "no snapshot found, starting empty");
                InMemoryModelStore::new()
            }
        },
        None => {
            warn!("no data file configured, state will not survive a restart");
            InMemoryModelStore::new()
        }
    };

    let shop = Shop::new(store.clone(), signer);
    if let Some((email, password)) = config.seed_admin() {
        if shop.seed_admin(email, password)?.is_none() {
            info!("seed admin already present");
        }
    }

    let app = http::app(shop, &config.cors_origin)?;
    let listener = TcpListener::bind(config.bind).await?;
    http::serve(listener, app, shutdown_signal()).await?;

    if let Some(path) = &config.data_file {
        snapshot::save(&store, path)?;
    }
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
