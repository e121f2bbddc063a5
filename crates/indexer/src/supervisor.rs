// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wires the components together and handles orderly shutdown.
//!
//! Startup order: store (fatal on failure), endpoint managers for both
//! chains (blocks until each chain is reachable), then the two ingestion
//! pipelines, the reimport worker, the liveness checks and the era pruner
//! as peer tasks. Ctrl-C broadcasts shutdown; tasks stop between blocks and
//! the store is closed last.

use crate::client::ChainApi;
use crate::endpoint::{EndpointError, EndpointManager};
use crate::ingest::{BlockImporter, IngestionPipeline};
use crate::interpreter::EventInterpreter;
use crate::reimport::ReimportWorker;
use crate::store::{Store, StoreError};
use crate::types::ChainTag;
use staking_indexer_config::IndexerConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Era retention is enforced this often.
const PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to open the store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("failed to create database directory '{path}': {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to listen for the shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

pub async fn run(config: IndexerConfig) -> Result<(), SupervisorError> {
    std::fs::create_dir_all(&config.database_path).map_err(|source| {
        SupervisorError::CreateDir {
            path: config.database_path.display().to_string(),
            source,
        }
    })?;

    let db_file = config.database_file();
    tracing::info!(path = %db_file.display(), "opening store");
    // A corrupt database or failed migration is unrecoverable: propagate
    // and exit non-zero rather than degrade silently.
    let store = Store::open(&db_file).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ss58_prefix = config.network.ss58_prefix();

    let relay_manager = Arc::new(EndpointManager::new(
        ChainTag::Relay,
        config.relay_endpoints(),
        config.rpc.clone(),
        ss58_prefix,
        shutdown_rx.clone(),
    ));
    let asset_hub_manager = Arc::new(EndpointManager::new(
        ChainTag::AssetHub,
        config.asset_hub_endpoints(),
        config.rpc.clone(),
        ss58_prefix,
        shutdown_rx.clone(),
    ));

    relay_manager.connect().await?;
    asset_hub_manager.connect().await?;

    let interpreter = EventInterpreter::new(store.clone(), ss58_prefix);

    let relay_importer = BlockImporter::new(
        ChainTag::Relay,
        relay_manager.clone() as Arc<dyn ChainApi>,
        store.clone(),
        None,
    );
    let asset_hub_importer = BlockImporter::new(
        ChainTag::AssetHub,
        asset_hub_manager.clone() as Arc<dyn ChainApi>,
        store.clone(),
        Some(interpreter),
    );

    let relay_pipeline = IngestionPipeline::new(
        relay_importer.clone(),
        config.sync_blocks,
        shutdown_rx.clone(),
    );
    let asset_hub_pipeline = IngestionPipeline::new(
        asset_hub_importer.clone(),
        config.sync_blocks,
        shutdown_rx.clone(),
    );

    let reimport_worker = ReimportWorker::new(
        store.clone(),
        relay_importer,
        asset_hub_importer,
        shutdown_rx.clone(),
    );

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(async move { relay_pipeline.run().await }));
    tasks.push(tokio::spawn(async move { asset_hub_pipeline.run().await }));
    tasks.push(tokio::spawn(async move { reimport_worker.run().await }));
    tasks.push(tokio::spawn(relay_manager.clone().run_liveness()));
    tasks.push(tokio::spawn(asset_hub_manager.clone().run_liveness()));
    tasks.push(tokio::spawn(prune_loop(
        store.clone(),
        config.max_eras,
        shutdown_rx.clone(),
    )));

    tokio::signal::ctrl_c().await.map_err(SupervisorError::Signal)?;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        let _ = task.await;
    }
    store.close().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn prune_loop(store: Store, max_eras: u64, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = interval.tick() => {
                if let Err(e) = store.prune_eras(max_eras).await {
                    tracing::warn!(error = %e, "era pruning failed");
                }
            }
        }
    }
}
