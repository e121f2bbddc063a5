// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Session and era boundary handling, driven by the per-session report the
//! Asset Hub receives from the Relay Chain.

use super::EventInterpreter;
use crate::client::ChainApi;
use crate::events::SessionReport;
use crate::store::{NewEra, NewSession, StoreError};
use crate::types::ChainTag;

/// Session reports closer than this are suspicious.
const MIN_SESSION_INTERVAL_MS: u64 = 60_000;

/// Session reports further apart than this are suspicious.
const MAX_SESSION_INTERVAL_MS: u64 = 7_200_000;

pub(super) async fn handle_session_report(
    interp: &EventInterpreter,
    chain: &dyn ChainApi,
    block_number: u64,
    timestamp: u64,
    report: SessionReport,
) -> Result<(), StoreError> {
    let Some(end_index) = report.end_index else {
        interp
            .warn(
                block_number,
                timestamp,
                "missing_field",
                "session report without endIndex".to_string(),
            )
            .await;
        return Ok(());
    };

    emit_interval_warnings(interp, block_number, timestamp, end_index).await?;

    // The era that produced the ended session is read at the previous
    // block; the views at this block describe the session that starts now.
    let active_at_prev = chain
        .active_era(block_number.saturating_sub(1))
        .await
        .ok()
        .flatten();
    let active_now = chain.active_era(block_number).await.ok().flatten();
    let planned_now = chain.current_era(block_number).await.ok().flatten();

    // The ended session. Merge semantics in the store keep an existing
    // block number or points total from being clobbered by nulls.
    interp
        .store
        .upsert_session(NewSession {
            session_id: end_index,
            block_number: Some(block_number),
            activation_timestamp: report.activation.map(|(start_time, _)| start_time),
            active_era_id: active_at_prev,
            planned_era_id: planned_now,
            validator_points_total: report.validator_points,
        })
        .await?;

    // Pre-create the session that starts after this report.
    interp
        .store
        .upsert_session(NewSession {
            session_id: end_index + 1,
            block_number: None,
            activation_timestamp: None,
            active_era_id: active_now,
            planned_era_id: planned_now,
            validator_points_total: 0,
        })
        .await?;

    // Era boundary: the report's own activation tuple is trusted over any
    // chain query.
    if let Some((start_time, new_era_id)) = report.activation {
        interp.store.close_active_era(end_index, new_era_id).await?;
        interp
            .store
            .upsert_era(NewEra {
                era_id: new_era_id,
                session_start: end_index + 1,
                session_end: None,
                start_time: Some(start_time),
            })
            .await?;
        interp
            .store
            .upsert_session(NewSession {
                session_id: end_index + 1,
                active_era_id: Some(new_era_id),
                ..Default::default()
            })
            .await?;

        tracing::info!(era = new_era_id, session = end_index + 1, "era boundary");
    }

    Ok(())
}

/// Timing and continuity checks against the last recorded session. Only
/// forward progress is checked; replays of already-known sessions are left
/// alone.
async fn emit_interval_warnings(
    interp: &EventInterpreter,
    block_number: u64,
    timestamp: u64,
    end_index: u64,
) -> Result<(), StoreError> {
    let Some(last) = interp.store.latest_session().await? else {
        return Ok(());
    };
    let last_id = last.session_id as u64;
    if end_index <= last_id {
        return Ok(());
    }

    if last_id + 1 < end_index {
        interp
            .warn(
                block_number,
                timestamp,
                "missing_event",
                format!(
                    "session report skipped from {} to {}; {} report(s) not seen",
                    last_id,
                    end_index,
                    end_index - last_id - 1
                ),
            )
            .await;
    }

    // Compare against the report block of the previous session, if known.
    if let Some(prev_block) = last.block_number
        && let Some(prev) = interp
            .store
            .block_by_number(ChainTag::AssetHub, prev_block as u64)
            .await?
    {
        let interval = timestamp.saturating_sub(prev.timestamp as u64);
        if interval < MIN_SESSION_INTERVAL_MS || interval > MAX_SESSION_INTERVAL_MS {
            interp
                .warn(
                    block_number,
                    timestamp,
                    "timing",
                    format!(
                        "session {} reported {}ms after session {}",
                        end_index, interval, last_id
                    ),
                )
                .await;
        }
    }

    Ok(())
}
