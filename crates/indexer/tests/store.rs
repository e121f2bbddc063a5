// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Store semantics: merge rules, cascades, the reimport queue, pruning,
//! migration idempotence and the introspection surface.

use staking_indexer::store::{
    NewElectionPhase, NewElectionScore, NewEra, NewEvent, NewSession, NewWarning, Store,
};
use staking_indexer::types::{ChainTag, ScoreStatus, Severity};

async fn store() -> Store {
    Store::open_in_memory().await.unwrap()
}

fn test_event(id: &str, event_type: &str) -> NewEvent {
    NewEvent {
        event_id: id.to_string(),
        event_type: event_type.to_string(),
        data: "{}".to_string(),
    }
}

#[tokio::test]
async fn reopening_a_database_skips_applied_migrations() {
    let path = std::env::temp_dir().join(format!(
        "staking-indexer-migrations-{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    {
        let store = Store::open(&path).await.unwrap();
        store
            .insert_block_with_events(ChainTag::AssetHub, 1, 1_000, &[])
            .await
            .unwrap();
        store.close().await;
    }

    // Second open must not re-run migrations (which would fail on existing
    // tables) and must see the previous data.
    let store = Store::open(&path).await.unwrap();
    assert!(store.has_block(ChainTag::AssetHub, 1).await.unwrap());
    store.close().await;

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(path.with_file_name(format!(
            "{}{}",
            path.file_name().unwrap().to_string_lossy(),
            suffix
        )));
    }
}

#[tokio::test]
async fn duplicate_block_insert_keeps_first_events() {
    let store = store().await;
    let first = vec![test_event("5-0", "staking.Rewarded")];
    let second = vec![
        test_event("5-0", "staking.Rewarded"),
        test_event("5-1", "session.NewSession"),
    ];

    assert!(store
        .insert_block_with_events(ChainTag::AssetHub, 5, 1_000, &first)
        .await
        .unwrap());
    assert!(!store
        .insert_block_with_events(ChainTag::AssetHub, 5, 2_000, &second)
        .await
        .unwrap());

    let events = store.events_by_block(ChainTag::AssetHub, 5).await.unwrap();
    assert_eq!(events.len(), 1);
    let block = store.block_by_number(ChainTag::AssetHub, 5).await.unwrap().unwrap();
    assert_eq!(block.timestamp, 1_000);
}

#[tokio::test]
async fn deleting_a_block_cascades_events_and_nulls_sessions() {
    let store = store().await;
    store
        .insert_block_with_events(
            ChainTag::AssetHub,
            9,
            1_000,
            &[test_event("9-0", "staking.EraPaid")],
        )
        .await
        .unwrap();
    store
        .upsert_session(NewSession {
            session_id: 100,
            block_number: Some(9),
            validator_points_total: 42,
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .insert_election_phase(NewElectionPhase {
            era_id: 10,
            block_number: 9,
            round: 1,
            phase: "Snapshot".to_string(),
            event_id: "9-0".to_string(),
            timestamp: 1_000,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(store.delete_block(ChainTag::AssetHub, 9).await.unwrap(), 1);

    assert!(store.events_by_block(ChainTag::AssetHub, 9).await.unwrap().is_empty());
    assert!(store.phases_by_era(10).await.unwrap().is_empty());
    // The session survives with its reference nulled out.
    let session = store.session_by_id(100).await.unwrap().unwrap();
    assert_eq!(session.block_number, None);
    assert_eq!(session.validator_points_total, 42);
}

#[tokio::test]
async fn session_merge_never_clobbers_known_values() {
    let store = store().await;
    store
        .insert_block_with_events(ChainTag::AssetHub, 50, 1_000, &[])
        .await
        .unwrap();
    store
        .upsert_session(NewSession {
            session_id: 11935,
            block_number: Some(50),
            activation_timestamp: Some(7_000),
            active_era_id: Some(1982),
            planned_era_id: Some(1983),
            validator_points_total: 599,
        })
        .await
        .unwrap();

    // A later sparse upsert (e.g. a pre-create racing a reimport) with
    // nulls and a zero total must absorb, not overwrite.
    store
        .upsert_session(NewSession {
            session_id: 11935,
            ..Default::default()
        })
        .await
        .unwrap();

    let session = store.session_by_id(11935).await.unwrap().unwrap();
    assert_eq!(session.block_number, Some(50));
    assert_eq!(session.activation_timestamp, Some(7_000));
    assert_eq!(session.active_era_id, Some(1982));
    assert_eq!(session.planned_era_id, Some(1983));
    assert_eq!(session.validator_points_total, 599);

    // A real points report does replace a zero.
    store
        .upsert_session(NewSession {
            session_id: 11935,
            validator_points_total: 611,
            ..Default::default()
        })
        .await
        .unwrap();
    let session = store.session_by_id(11935).await.unwrap().unwrap();
    assert_eq!(session.validator_points_total, 611);
}

#[tokio::test]
async fn era_boundary_upsert_preserves_inflation() {
    let store = store().await;
    store
        .upsert_era(NewEra {
            era_id: 1982,
            session_start: 11931,
            session_end: None,
            start_time: Some(1_000),
        })
        .await
        .unwrap();
    assert_eq!(
        store.set_era_inflation(1982, "100", "20", "120").await.unwrap(),
        1
    );

    // The next boundary closes the era; the inflation data must survive.
    store
        .upsert_era(NewEra {
            era_id: 1982,
            session_start: 11931,
            session_end: Some(11936),
            start_time: Some(1_000),
        })
        .await
        .unwrap();

    let era = store.era_by_id(1982).await.unwrap().unwrap();
    assert_eq!(era.session_end, Some(11936));
    assert_eq!(era.inflation_total.as_deref(), Some("120"));
    assert_eq!(era.inflation_validators.as_deref(), Some("100"));
    assert_eq!(era.inflation_treasury.as_deref(), Some("20"));
}

#[tokio::test]
async fn close_active_era_spares_the_new_one() {
    let store = store().await;
    store
        .upsert_era(NewEra {
            era_id: 1982,
            session_start: 11931,
            session_end: None,
            start_time: None,
        })
        .await
        .unwrap();
    store
        .upsert_era(NewEra {
            era_id: 1983,
            session_start: 11937,
            session_end: None,
            start_time: None,
        })
        .await
        .unwrap();

    assert_eq!(store.close_active_era(11936, 1983).await.unwrap(), 1);

    assert_eq!(
        store.era_by_id(1982).await.unwrap().unwrap().session_end,
        Some(11936)
    );
    assert_eq!(store.era_by_id(1983).await.unwrap().unwrap().session_end, None);
    assert_eq!(store.active_era().await.unwrap().unwrap().era_id, 1983);
}

#[tokio::test]
async fn score_upsert_preserves_nonzero_fields() {
    let store = store().await;
    store
        .upsert_election_score(NewElectionScore {
            round: 3964,
            submitter: "alice".to_string(),
            block_number: 100,
            minimal_stake: "9".to_string(),
            sum_stake: "40".to_string(),
            sum_stake_squared: "249".to_string(),
            status: ScoreStatus::Registered,
            era_id: None,
        })
        .await
        .unwrap();

    // Status-only transition: zeros stand for "no score carried".
    store
        .upsert_election_score(NewElectionScore {
            round: 3964,
            submitter: "alice".to_string(),
            block_number: 160,
            minimal_stake: "0".to_string(),
            sum_stake: "0".to_string(),
            sum_stake_squared: "0".to_string(),
            status: ScoreStatus::Rewarded,
            era_id: Some(1982),
        })
        .await
        .unwrap();

    let row = store.election_score(3964, "alice").await.unwrap().unwrap();
    assert_eq!(row.status, "rewarded");
    assert_eq!(row.block_number, 160);
    assert_eq!(row.minimal_stake, "9");
    assert_eq!(row.sum_stake, "40");
    assert_eq!(row.sum_stake_squared, "249");
    assert_eq!(row.era_id, Some(1982));

    let winners = store.winners(10).await.unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(store.winner_by_round(3964).await.unwrap().unwrap().submitter, "alice");
    assert_eq!(store.winners_by_era(1982).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reimport_queue_transitions_are_single_shot() {
    let store = store().await;
    let id = store.submit_reimport(ChainTag::Relay, 123).await.unwrap();

    let pending = store.pending_reimports(5).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].chain, "relay_chain");
    assert_eq!(pending[0].status, "pending");

    assert!(store.claim_reimport(id).await.unwrap());
    // A second claim loses the race.
    assert!(!store.claim_reimport(id).await.unwrap());
    assert!(store.pending_reimports(5).await.unwrap().is_empty());

    store.complete_reimport(id).await.unwrap();
    let listed = store.list_reimports(10).await.unwrap();
    assert_eq!(listed[0].status, "completed");
    assert!(listed[0].completed_at.is_some());

    let failed_id = store.submit_reimport(ChainTag::AssetHub, 456).await.unwrap();
    assert!(store.claim_reimport(failed_id).await.unwrap());
    store.fail_reimport(failed_id, "node unreachable").await.unwrap();
    let listed = store.list_reimports(10).await.unwrap();
    assert_eq!(listed[0].status, "failed");
    assert_eq!(listed[0].error.as_deref(), Some("node unreachable"));
}

#[tokio::test]
async fn pending_reimports_respects_limit_and_order() {
    let store = store().await;
    for number in 0..8u64 {
        store.submit_reimport(ChainTag::AssetHub, number).await.unwrap();
    }

    let pending = store.pending_reimports(5).await.unwrap();
    assert_eq!(pending.len(), 5);
    let numbers: Vec<i64> = pending.iter().map(|r| r.block_number).collect();
    assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn pruning_removes_old_eras_and_dependents_only() {
    let store = store().await;
    store
        .insert_block_with_events(ChainTag::AssetHub, 1, 1_000, &[test_event("1-0", "staking.EraPaid")])
        .await
        .unwrap();

    for era_id in 1..=120u64 {
        store
            .upsert_era(NewEra {
                era_id,
                session_start: era_id * 10,
                session_end: Some(era_id * 10 + 9),
                start_time: None,
            })
            .await
            .unwrap();
        store
            .insert_election_phase(NewElectionPhase {
                era_id,
                block_number: 1,
                round: era_id,
                phase: "Off".to_string(),
                event_id: "1-0".to_string(),
                timestamp: 1_000,
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .insert_warning(NewWarning {
                era_id: Some(era_id),
                session_id: None,
                block_number: 1,
                kind: "timing".to_string(),
                message: "test".to_string(),
                severity: Severity::Info,
                timestamp: 1_000,
            })
            .await
            .unwrap();
    }

    let pruned = store.prune_eras(100).await.unwrap();
    assert_eq!(pruned, 19); // eras 1..=19 fall below 120 - 100

    assert!(store.era_by_id(19).await.unwrap().is_none());
    assert!(store.era_by_id(20).await.unwrap().is_some());
    assert!(store.phases_by_era(19).await.unwrap().is_empty());
    assert!(!store.phases_by_era(20).await.unwrap().is_empty());
    assert!(store.warnings_by_era(19).await.unwrap().is_empty());
    assert!(!store.warnings_by_era(20).await.unwrap().is_empty());

    // Blocks and events are never touched by the era cap.
    assert!(store.has_block(ChainTag::AssetHub, 1).await.unwrap());
    assert_eq!(store.events_by_block(ChainTag::AssetHub, 1).await.unwrap().len(), 1);

    // Nothing more to prune on a second run.
    assert_eq!(store.prune_eras(100).await.unwrap(), 0);
}

#[tokio::test]
async fn events_by_era_covers_session_range_and_election_prelude() {
    let store = store().await;
    // Blocks 10..=60; election phases for era 1983 start at block 15,
    // before the era's first session boundary at block 30.
    for number in [10u64, 15, 30, 45, 60] {
        store
            .insert_block_with_events(
                ChainTag::AssetHub,
                number,
                number * 1_000,
                &[test_event(&format!("{number}-0"), "staking.Test")],
            )
            .await
            .unwrap();
    }

    // Session 99 ended at block 10 (the report that opened era 1983's span),
    // sessions 100..102 belong to era 1983, the last ending at block 60.
    store
        .upsert_session(NewSession {
            session_id: 99,
            block_number: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .upsert_session(NewSession {
            session_id: 102,
            block_number: Some(60),
            active_era_id: Some(1983),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .upsert_era(NewEra {
            era_id: 1983,
            session_start: 100,
            session_end: Some(102),
            start_time: None,
        })
        .await
        .unwrap();
    store
        .insert_election_phase(NewElectionPhase {
            era_id: 1983,
            block_number: 15,
            round: 1,
            phase: "Snapshot".to_string(),
            event_id: "15-0".to_string(),
            timestamp: 15_000,
            ..Default::default()
        })
        .await
        .unwrap();

    let events = store.events_by_era_ah(1983).await.unwrap();
    let blocks: Vec<i64> = events.iter().map(|e| e.block_number).collect();
    // [prev_session.block + 1, last_session.block] widened down to the
    // earliest phase row: block 10 excluded, 15 included via widening.
    assert_eq!(blocks, vec![15, 30, 45, 60]);
}

#[tokio::test]
async fn introspection_lists_tables_schemas_and_rows() {
    let store = store().await;
    store
        .insert_block_with_events(ChainTag::AssetHub, 77, 7_000, &[])
        .await
        .unwrap();

    let tables = store.list_tables().await.unwrap();
    for expected in [
        "blocks_rc",
        "blocks_ah",
        "events_rc",
        "events_ah",
        "eras",
        "sessions",
        "election_phases",
        "election_scores",
        "warnings",
        "indexer_state",
        "reimport_requests",
        "schema_migrations",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }

    let schema = store.table_schema("eras").await.unwrap();
    let era_id = schema.iter().find(|c| c.name == "era_id").unwrap();
    assert_eq!(era_id.pk, 1);

    let rows = store.sample_rows("blocks_ah", 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["block_number"], serde_json::json!(77));
    assert_eq!(rows[0]["timestamp"], serde_json::json!(7_000));

    assert!(store.table_schema("no_such_table").await.is_err());
    assert!(store.sample_rows("blocks_ah; DROP TABLE eras", 1).await.is_err());
}

#[tokio::test]
async fn state_max_only_moves_forward() {
    let store = store().await;
    store.set_state_max("currentHeightAH", 100).await.unwrap();
    store.set_state_max("currentHeightAH", 90).await.unwrap();
    assert_eq!(store.get_state_u64("currentHeightAH").await.unwrap(), Some(100));
    store.set_state_max("currentHeightAH", 110).await.unwrap();
    assert_eq!(store.get_state_u64("currentHeightAH").await.unwrap(), Some(110));
}

#[tokio::test]
async fn events_are_queryable_by_type_case_insensitively() {
    let store = store().await;
    store
        .insert_block_with_events(
            ChainTag::AssetHub,
            5,
            1_000,
            &[
                test_event("5-0", "stakingRcClient.SessionReportReceived"),
                test_event("5-1", "staking.EraPaid"),
            ],
        )
        .await
        .unwrap();

    let found = store
        .events_by_type(ChainTag::AssetHub, "stakingrcclient.sessionreportreceived", 10)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event_id, "5-0");

    let recent = store.recent_events(ChainTag::AssetHub, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
}
