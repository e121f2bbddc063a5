// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Drains the pending reimport queue: each request deletes the block (its
//! events cascade away) and feeds the height back through the regular
//! per-block contract. Requests are claimed with a guarded status
//! transition, so each is processed at most once even with several workers
//! polling.

use crate::ingest::{BlockImporter, PipelineError};
use crate::store::{ReimportRow, Store, StoreError};
use crate::types::ChainTag;
use std::time::Duration;
use tokio::sync::watch;

/// Queue poll cadence.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Requests processed concurrently per drain.
const MAX_CONCURRENT: u32 = 5;

pub struct ReimportWorker {
    store: Store,
    relay: BlockImporter,
    asset_hub: BlockImporter,
    shutdown: watch::Receiver<bool>,
}

impl ReimportWorker {
    pub fn new(
        store: Store,
        relay: BlockImporter,
        asset_hub: BlockImporter,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            relay,
            asset_hub,
            shutdown,
        }
    }

    pub async fn run(&self) {
        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = interval.tick() => {
                    if let Err(e) = self.drain().await {
                        tracing::warn!(error = %e, "reimport queue drain failed");
                    }
                }
            }
        }
    }

    /// Process up to [`MAX_CONCURRENT`] pending requests, oldest first.
    pub async fn drain(&self) -> Result<(), StoreError> {
        let pending = self.store.pending_reimports(MAX_CONCURRENT).await?;
        if pending.is_empty() {
            return Ok(());
        }

        futures::future::join_all(
            pending
                .into_iter()
                .map(|request| self.process_request(request)),
        )
        .await;
        Ok(())
    }

    async fn process_request(&self, request: ReimportRow) {
        let Ok(chain) = request.chain.parse::<ChainTag>() else {
            let _ = self
                .store
                .fail_reimport(request.id, &format!("unknown chain '{}'", request.chain))
                .await;
            return;
        };

        match self.store.claim_reimport(request.id).await {
            Ok(true) => {}
            // Already claimed elsewhere; status transitions are terminal
            // except pending -> processing.
            Ok(false) => return,
            Err(e) => {
                tracing::warn!(id = request.id, error = %e, "failed to claim reimport request");
                return;
            }
        }

        let importer = match chain {
            ChainTag::Relay => &self.relay,
            ChainTag::AssetHub => &self.asset_hub,
        };
        let number = request.block_number as u64;
        tracing::info!(id = request.id, chain = %chain, block = number, "reimporting block");

        let result: Result<(), PipelineError> = async {
            self.store.delete_block(chain, number).await?;
            importer.process_block(number).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                if let Err(e) = self.store.complete_reimport(request.id).await {
                    tracing::warn!(id = request.id, error = %e, "failed to mark reimport completed");
                }
            }
            Err(e) => {
                tracing::warn!(id = request.id, chain = %chain, block = number, error = %e, "reimport failed");
                let _ = self.store.fail_reimport(request.id, &e.to_string()).await;
            }
        }
    }
}
