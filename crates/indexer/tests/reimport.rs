// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reimport worker: delete-then-reingest through the per-block contract,
//! with terminal queue transitions.

mod common;

use common::*;
use staking_indexer::client::ChainApi;
use staking_indexer::ingest::BlockImporter;
use staking_indexer::interpreter::EventInterpreter;
use staking_indexer::reimport::ReimportWorker;
use staking_indexer::store::{NewEvent, Store};
use staking_indexer::types::ChainTag;
use std::sync::Arc;
use tokio::sync::watch;

struct Harness {
    chain: Arc<MockChain>,
    store: Store,
    worker: ReimportWorker,
    _shutdown_tx: watch::Sender<bool>,
}

async fn setup() -> Harness {
    let store = Store::open_in_memory().await.unwrap();
    let chain = Arc::new(MockChain::new());
    let relay = BlockImporter::new(
        ChainTag::Relay,
        chain.clone() as Arc<dyn ChainApi>,
        store.clone(),
        None,
    );
    let asset_hub = BlockImporter::new(
        ChainTag::AssetHub,
        chain.clone() as Arc<dyn ChainApi>,
        store.clone(),
        Some(EventInterpreter::new(store.clone(), 0)),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = ReimportWorker::new(store.clone(), relay, asset_hub, shutdown_rx);
    Harness {
        chain,
        store,
        worker,
        _shutdown_tx: shutdown_tx,
    }
}

#[tokio::test]
async fn reimport_replaces_a_block_and_its_events() {
    let harness = setup().await;

    // The store holds a stale copy of block 5 (wrong timestamp, stale event).
    let stale = vec![NewEvent {
        event_id: "5-9".to_string(),
        event_type: "staking.Stale".to_string(),
        data: "{}".to_string(),
    }];
    assert!(harness
        .store
        .insert_block_with_events(ChainTag::AssetHub, 5, 1, &stale)
        .await
        .unwrap());

    // The chain has the real thing, including a session report to derive.
    harness.chain.set_active_era(0, 1982);
    harness.chain.set_current_era(0, 1982);
    harness
        .chain
        .add_block(5, 5_000, vec![session_report_event(11935, 599, None)]);

    let id = harness.store.submit_reimport(ChainTag::AssetHub, 5).await.unwrap();
    harness.worker.drain().await.unwrap();

    let listed = harness.store.list_reimports(10).await.unwrap();
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].status, "completed");

    let block = harness
        .store
        .block_by_number(ChainTag::AssetHub, 5)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(block.timestamp, 5_000);

    let events = harness.store.events_by_block(ChainTag::AssetHub, 5).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "stakingRcClient.SessionReportReceived");

    // Interpretation ran on the reimported block.
    let session = harness.store.session_by_id(11935).await.unwrap().unwrap();
    assert_eq!(session.block_number, Some(5));
}

#[tokio::test]
async fn reimport_of_an_unknown_block_fails_terminally() {
    let harness = setup().await;

    let id = harness.store.submit_reimport(ChainTag::Relay, 999).await.unwrap();
    harness.worker.drain().await.unwrap();

    let listed = harness.store.list_reimports(10).await.unwrap();
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].status, "failed");
    assert!(listed[0].error.is_some());

    // Draining again does not resurrect the failed request.
    harness.worker.drain().await.unwrap();
    assert_eq!(harness.store.list_reimports(10).await.unwrap()[0].status, "failed");
}

#[tokio::test]
async fn drain_handles_requests_for_both_chains() {
    let harness = setup().await;
    harness.chain.add_block(3, 3_000, vec![]);

    harness.store.submit_reimport(ChainTag::AssetHub, 3).await.unwrap();
    harness.store.submit_reimport(ChainTag::Relay, 3).await.unwrap();
    harness.worker.drain().await.unwrap();

    let listed = harness.store.list_reimports(10).await.unwrap();
    let by_chain: Vec<(&str, &str)> = listed
        .iter()
        .map(|r| (r.chain.as_str(), r.status.as_str()))
        .collect();
    assert!(by_chain.contains(&("asset_hub", "completed")));
    assert!(by_chain.contains(&("relay_chain", "completed")));
    assert!(harness.store.has_block(ChainTag::Relay, 3).await.unwrap());
    assert!(harness.store.has_block(ChainTag::AssetHub, 3).await.unwrap());
}
