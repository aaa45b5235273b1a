mod collector;
mod config;
mod error;
mod idealista;
mod models;
mod orchestrator;
mod secrets;
mod storage;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use idealista::IdealistaConnector;
use models::{Invocation, RunStatus};
use orchestrator::Orchestrator;
use secrets::FileSecretStore;
use storage::{LocalObjectStore, ObjectWriter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🏠 Idealista Listings Collector");

    let payload = std::env::args().nth(1).unwrap_or_else(|| "{}".to_string());
    let invocation = Invocation::from_payload(&payload);

    let config = Config::from_env().context("Invalid collector configuration")?;

    let store = Arc::new(LocalObjectStore::new(&config.storage_root));
    let writer = ObjectWriter::new(store, config.bucket.clone(), &config.prefix);
    let orchestrator = Orchestrator::new(
        Arc::new(FileSecretStore::new(&config.secrets_file)),
        Arc::new(IdealistaConnector::new(config.api_base_url.clone())),
        writer,
        config.secret_names.clone(),
    );

    let summary = orchestrator.run(&invocation, Utc::now()).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.status == RunStatus::Failed {
        error!("No operation completed, exiting with failure");
        std::process::exit(1);
    }

    Ok(())
}
