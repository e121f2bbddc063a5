use staking_indexer::{logging, supervisor};
use staking_indexer_config::IndexerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = IndexerConfig::from_env()?;
    let _log_guard = logging::init(&config.log)?;

    tracing::info!("Network: {}", config.network);
    tracing::info!("Database: {}", config.database_file().display());
    tracing::info!("Sync window: {} blocks", config.sync_blocks);
    tracing::info!("Era retention: {} eras", config.max_eras);
    if let Some(endpoint) = &config.custom_rpc_endpoint {
        tracing::info!("Relay Chain endpoint override: {}", endpoint);
    }

    supervisor::run(config).await?;

    Ok(())
}
