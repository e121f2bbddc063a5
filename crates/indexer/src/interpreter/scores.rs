// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Election score submission lifecycle.
//!
//! Keyed by `(round, submitter)`. `Registered` creates (or, before any
//! terminal event, overwrites) the row with its claimed score; all other
//! events only move the status and block number. Terminal statuses are
//! immutable, which protects against replays and out-of-order processing.

use super::EventInterpreter;
use crate::client::ChainApi;
use crate::events::{SignedEventKind, SignedSubmissionEvent};
use crate::store::{NewElectionScore, StoreError};
use crate::types::ScoreStatus;
use std::str::FromStr;

pub(super) async fn handle_signed_event(
    interp: &EventInterpreter,
    chain: &dyn ChainApi,
    block_number: u64,
    timestamp: u64,
    signed: SignedSubmissionEvent,
) -> Result<(), StoreError> {
    let (Some(round), Some(submitter)) = (signed.round, signed.submitter.clone()) else {
        interp
            .warn(
                block_number,
                timestamp,
                "missing_field",
                format!("{:?} event without round or submitter", signed.kind),
            )
            .await;
        return Ok(());
    };

    let target = signed.kind.status();
    let existing = interp.store.election_score(round, &submitter).await?;

    match existing {
        None => {
            // Only a registration may create a row; a terminal event for an
            // unknown submission is dropped.
            if signed.kind != SignedEventKind::Registered {
                tracing::debug!(round, %submitter, status = %target, "event for unknown submission ignored");
                return Ok(());
            }
            let Some(score) = signed.score else {
                interp
                    .warn(
                        block_number,
                        timestamp,
                        "missing_field",
                        format!("Registered for round {round} without a score"),
                    )
                    .await;
                return Ok(());
            };

            let era_id = chain.active_era(block_number).await.ok().flatten();
            interp
                .store
                .upsert_election_score(NewElectionScore {
                    round,
                    submitter,
                    block_number,
                    minimal_stake: score.minimal_stake,
                    sum_stake: score.sum_stake,
                    sum_stake_squared: score.sum_stake_squared,
                    status: ScoreStatus::Registered,
                    era_id,
                })
                .await?;
        }
        Some(row) => {
            let current = ScoreStatus::from_str(&row.status).unwrap_or(ScoreStatus::Registered);
            if current.is_terminal() {
                // Race-condition protection: terminal rows are immutable.
                tracing::debug!(round, %submitter, status = %current, "event for terminal submission ignored");
                return Ok(());
            }

            // A repeated registration overwrites the score (latest wins);
            // status-only events keep the stored score via the store's
            // non-zero-preserves rule.
            let (minimal_stake, sum_stake, sum_stake_squared) = match &signed.score {
                Some(score) => (
                    score.minimal_stake.clone(),
                    score.sum_stake.clone(),
                    score.sum_stake_squared.clone(),
                ),
                None => ("0".to_string(), "0".to_string(), "0".to_string()),
            };

            // Populate the era lazily; a failed query leaves it null.
            let era_id = match row.era_id {
                Some(era_id) => Some(era_id as u64),
                None => chain.active_era(block_number).await.ok().flatten(),
            };

            interp
                .store
                .upsert_election_score(NewElectionScore {
                    round,
                    submitter: submitter.clone(),
                    block_number,
                    minimal_stake,
                    sum_stake,
                    sum_stake_squared,
                    status: target,
                    era_id,
                })
                .await?;

            if signed.kind == SignedEventKind::Slashed {
                interp
                    .warn(
                        block_number,
                        timestamp,
                        "unexpected_event",
                        format!("submission ({round}, {submitter}) slashed"),
                    )
                    .await;
            }
        }
    }

    Ok(())
}
