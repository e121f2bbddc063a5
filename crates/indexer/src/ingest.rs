// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-chain ingestion: bounded-range backfill on startup, live
//! finalized-head subscription, and the periodic gap filler that re-attempts
//! anything the other two paths dropped.
//!
//! Every path funnels through the same idempotent per-block contract
//! ([`BlockImporter::process_block`]), so backfill, live mode, gap fill and
//! reimport may interleave on arbitrary heights without coordination.

use crate::client::{ChainApi, ChainError};
use crate::events::{RawEvent, passes_filter};
use crate::interpreter::EventInterpreter;
use crate::store::{NewEvent, Store, StoreError, state_key};
use crate::types::ChainTag;
use crate::util::sleep_cancellable;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// Attempts per block before deferring to the gap filler.
const RETRY_ATTEMPTS: u32 = 3;

/// Base of the exponential retry backoff (1s, 2s, 4s).
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// How often the gap filler sweeps.
const GAP_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// How many trailing heights the gap filler inspects.
const GAP_SCAN_DEPTH: u64 = 50;

/// Pause before re-subscribing after a dropped head subscription.
const SUBSCRIPTION_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("block {0} not found on chain")]
    MissingBlock(u64),
}

/// The idempotent per-block contract, shared by backfill, live mode, the
/// gap filler and the reimport worker.
#[derive(Clone)]
pub struct BlockImporter {
    chain: ChainTag,
    client: Arc<dyn ChainApi>,
    store: Store,
    interpreter: Option<EventInterpreter>,
}

impl BlockImporter {
    /// `interpreter` is set for the Asset Hub only; Relay Chain blocks are
    /// persisted (filtered) but never interpreted.
    pub fn new(
        chain: ChainTag,
        client: Arc<dyn ChainApi>,
        store: Store,
        interpreter: Option<EventInterpreter>,
    ) -> Self {
        Self {
            chain,
            client,
            store,
            interpreter,
        }
    }

    pub fn chain(&self) -> ChainTag {
        self.chain
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn client(&self) -> &Arc<dyn ChainApi> {
        &self.client
    }

    /// Fetch, persist and interpret one block.
    ///
    /// Already-present blocks only advance the height counter; otherwise the
    /// block and its filtered events are committed atomically, then the
    /// interpreter runs over the special events in ingestion order. Returns
    /// whether the block was newly stored.
    pub async fn process_block(&self, number: u64) -> Result<bool, PipelineError> {
        if self.store.has_block(self.chain, number).await? {
            self.store
                .set_state_max(&state_key("currentHeight", self.chain), number)
                .await?;
            return Ok(false);
        }

        let hash = self
            .client
            .block_hash(number)
            .await?
            .ok_or(PipelineError::MissingBlock(number))?;
        let timestamp = self.client.timestamp_ms(number).await?;
        let events = self.client.events(number).await?;

        let kept: Vec<&RawEvent> = events
            .iter()
            .filter(|event| passes_filter(self.chain, &event.event_type()))
            .collect();
        let new_events: Vec<NewEvent> = kept
            .iter()
            .map(|event| NewEvent {
                event_id: event.event_id(number),
                event_type: event.event_type(),
                data: event.data.to_string(),
            })
            .collect();

        let inserted = self
            .store
            .insert_block_with_events(self.chain, number, timestamp, &new_events)
            .await?;
        tracing::debug!(
            chain = %self.chain,
            block = number,
            %hash,
            events = new_events.len(),
            "stored block"
        );

        if inserted && let Some(interpreter) = &self.interpreter {
            let special: Vec<RawEvent> = kept.into_iter().cloned().collect();
            interpreter
                .apply_block(self.client.as_ref(), number, timestamp, &special)
                .await;
        }

        self.store
            .set_state_max(&state_key("currentHeight", self.chain), number)
            .await?;
        Ok(inserted)
    }

    /// Retry wrapper: bounded attempts with exponential backoff. Exhaustion
    /// is logged but never surfaced; the gap filler re-attempts the block
    /// indefinitely.
    pub async fn process_block_with_retry(
        &self,
        number: u64,
        shutdown: &watch::Receiver<bool>,
    ) -> bool {
        for attempt in 1..=RETRY_ATTEMPTS {
            match self.process_block(number).await {
                Ok(_) => return true,
                Err(e) => {
                    tracing::warn!(
                        chain = %self.chain,
                        block = number,
                        attempt,
                        error = %e,
                        "block processing failed"
                    );
                    if attempt < RETRY_ATTEMPTS {
                        let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                        if sleep_cancellable(delay, shutdown).await {
                            return false;
                        }
                    }
                }
            }
        }
        tracing::error!(
            chain = %self.chain,
            block = number,
            attempts = RETRY_ATTEMPTS,
            "giving up on block; the gap filler will retry it"
        );
        false
    }
}

/// Per-chain controller: backfill, then live subscription and gap filler
/// running as peers until shutdown.
pub struct IngestionPipeline {
    importer: BlockImporter,
    sync_window: u64,
    shutdown: watch::Receiver<bool>,
}

impl IngestionPipeline {
    pub fn new(importer: BlockImporter, sync_window: u64, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            importer,
            sync_window,
            shutdown,
        }
    }

    pub fn importer(&self) -> &BlockImporter {
        &self.importer
    }

    pub async fn run(&self) {
        loop {
            if *self.shutdown.borrow() {
                return;
            }
            match self.initial_sync().await {
                Ok(()) => break,
                Err(e) => {
                    tracing::error!(
                        chain = %self.importer.chain(),
                        error = %e,
                        "initial sync failed, retrying"
                    );
                    if sleep_cancellable(Duration::from_secs(5), &self.shutdown).await {
                        return;
                    }
                }
            }
        }

        tokio::join!(self.live_loop(), self.gap_loop());
    }

    /// Backfill the configured window of recent finalized blocks, keeping
    /// the progress counters current for the status reader.
    pub async fn initial_sync(&self) -> Result<(), PipelineError> {
        let chain = self.importer.chain();
        let store = self.importer.store();

        let finalized = self.importer.client().finalized_head().await?;
        let start = finalized.saturating_sub(self.sync_window).max(1);
        let missing = store.missing_blocks(chain, start, finalized).await?;

        store
            .set_state_max(&state_key("currentHeight", chain), finalized)
            .await?;
        store
            .set_state(&state_key("targetBlock", chain), &finalized.to_string())
            .await?;
        store
            .set_state(
                &state_key("totalMissingBlocks", chain),
                &missing.len().to_string(),
            )
            .await?;
        store.set_state(&state_key("syncedBlocks", chain), "0").await?;
        store.set_state(&state_key("isSyncing", chain), "true").await?;

        tracing::info!(
            chain = %chain,
            from = start,
            to = finalized,
            missing = missing.len(),
            "starting backfill"
        );

        let mut synced: u64 = 0;
        for number in missing {
            if *self.shutdown.borrow() {
                break;
            }
            if self
                .importer
                .process_block_with_retry(number, &self.shutdown)
                .await
            {
                synced += 1;
                store
                    .set_state(&state_key("syncedBlocks", chain), &synced.to_string())
                    .await?;
                store
                    .set_state_max(&state_key("lastProcessedBlock", chain), number)
                    .await?;
            }
        }

        store.set_state(&state_key("isSyncing", chain), "false").await?;
        tracing::info!(chain = %chain, synced, "backfill complete");
        Ok(())
    }

    /// Follow finalized-head notifications. A dropped subscription reports
    /// the disconnect to the client (so the endpoint manager can fail over)
    /// and re-subscribes after a short delay; anything missed in between is
    /// the gap filler's business.
    async fn live_loop(&self) {
        let chain = self.importer.chain();
        let mut shutdown = self.shutdown.clone();

        loop {
            if *shutdown.borrow() {
                return;
            }

            match self.importer.client().subscribe_finalized_heads().await {
                Ok(mut heads) => loop {
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        head = heads.next() => match head {
                            Some(Ok(number)) => {
                                self.importer
                                    .process_block_with_retry(number, &self.shutdown)
                                    .await;
                                let _ = self
                                    .importer
                                    .store()
                                    .set_state_max(&state_key("lastProcessedBlock", chain), number)
                                    .await;
                            }
                            Some(Err(e)) => {
                                tracing::warn!(chain = %chain, error = %e, "finalized head stream error");
                                break;
                            }
                            None => {
                                tracing::warn!(chain = %chain, "finalized head subscription ended");
                                break;
                            }
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(chain = %chain, error = %e, "failed to subscribe to finalized heads");
                }
            }

            self.importer.client().on_disconnected().await;
            if sleep_cancellable(SUBSCRIPTION_RETRY_DELAY, &self.shutdown).await {
                return;
            }
        }
    }

    async fn gap_loop(&self) {
        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(GAP_SCAN_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = interval.tick() => {
                    if let Err(e) = self.gap_scan().await {
                        tracing::warn!(chain = %self.importer.chain(), error = %e, "gap scan failed");
                    }
                }
            }
        }
    }

    /// One sweep of the durable-missing-block safety net over the trailing
    /// heights. Returns how many blocks were filled.
    pub async fn gap_scan(&self) -> Result<u64, PipelineError> {
        let chain = self.importer.chain();
        let head = self.importer.client().finalized_head().await?;
        let from = head.saturating_sub(GAP_SCAN_DEPTH - 1).max(1);
        let missing = self.importer.store().missing_blocks(chain, from, head).await?;
        if missing.is_empty() {
            return Ok(0);
        }

        tracing::info!(chain = %chain, count = missing.len(), "gap filler found missing blocks");
        let mut filled = 0;
        for number in missing {
            if *self.shutdown.borrow() {
                break;
            }
            if self
                .importer
                .process_block_with_retry(number, &self.shutdown)
                .await
            {
                filled += 1;
            }
        }
        Ok(filled)
    }
}
