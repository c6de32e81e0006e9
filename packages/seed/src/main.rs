use std::process::ExitCode;

use chrono::Utc;
use tracing::{error, info};

use lexideck_client::backend::{FirestoreClient, IdTokenSlot, MAX_BATCH_WRITES};
use lexideck_client::logging::init_tracing;
use lexideck_client::Config;
use lexideck_seed::{load_vocabulary, upload};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level, "lexideck-seed.log");

    info!(project = %config.project_id, "starting vocabulary upload");

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "error uploading data");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = FirestoreClient::new(config, IdTokenSlot::default())?;
    let words = load_vocabulary()?;
    let report = upload(&store, words, MAX_BATCH_WRITES, Utc::now()).await?;
    info!(
        total = report.total,
        unique = report.uploaded.len(),
        batches = report.batches,
        "upload finished"
    );
    Ok(())
}
