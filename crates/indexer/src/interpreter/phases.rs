// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Election phase timeline: one append-only row per observed transition,
//! enriched with per-phase metrics queried from chain state at the same
//! block.

use super::EventInterpreter;
use crate::client::ChainApi;
use crate::events::{PhaseTransition, RawEvent};
use crate::store::{NewElectionPhase, StoreError};

pub(super) async fn handle_phase_transitioned(
    interp: &EventInterpreter,
    chain: &dyn ChainApi,
    block_number: u64,
    timestamp: u64,
    event: &RawEvent,
    transition: PhaseTransition,
) -> Result<(), StoreError> {
    let Some(to_phase) = transition.to else {
        interp
            .warn(
                block_number,
                timestamp,
                "missing_field",
                "PhaseTransitioned without target phase".to_string(),
            )
            .await;
        return Ok(());
    };

    let round = match transition.round {
        Some(round) => round,
        None => chain
            .election_round(block_number)
            .await
            .ok()
            .flatten()
            .unwrap_or(0),
    };

    // The phase belongs to the era being elected into: the current planned
    // era, falling back to chain state and finally the open era row.
    let era_id = match planned_era(interp, chain, block_number).await? {
        Some(era_id) => era_id,
        None => {
            interp
                .warn(
                    block_number,
                    timestamp,
                    "election_issue",
                    format!("phase {to_phase} observed with no known planned era"),
                )
                .await;
            return Ok(());
        }
    };

    let mut phase = NewElectionPhase {
        era_id,
        block_number,
        round,
        phase: to_phase.clone(),
        event_id: event.event_id(block_number),
        timestamp,
        ..Default::default()
    };

    match to_phase.as_str() {
        "Snapshot" => {
            phase.validator_candidates =
                chain.counter_for_validators(block_number).await.ok().flatten();
            phase.nominator_candidates =
                chain.counter_for_nominators(block_number).await.ok().flatten();
            phase.target_validator_count =
                chain.validator_count(block_number).await.ok().flatten();
        }
        "Signed" => {
            phase.minimum_score = chain
                .minimum_election_score(block_number)
                .await
                .ok()
                .flatten()
                .and_then(|score| serde_json::to_string(&score).ok());
        }
        "SignedValidation" => {
            phase.queued_solution_score = chain
                .queued_solution_score(block_number)
                .await
                .ok()
                .flatten()
                .and_then(|score| serde_json::to_string(&score).ok());
            phase.sorted_scores = chain
                .sorted_scores(block_number, round)
                .await
                .ok()
                .flatten()
                .map(|scores| scores.to_string());
        }
        "Done" | "Export" => {
            let elected = chain.electable_stashes(block_number).await.ok().flatten();
            phase.validators_elected = elected;
            if let Some(count) = elected {
                interp.store.set_era_validators_elected(era_id, count).await?;
            }
        }
        "Off" => {
            check_round_outcome(interp, block_number, timestamp, round).await?;
        }
        _ => {}
    }

    interp.store.insert_election_phase(phase).await?;
    Ok(())
}

async fn planned_era(
    interp: &EventInterpreter,
    chain: &dyn ChainApi,
    block_number: u64,
) -> Result<Option<u64>, StoreError> {
    if let Some(session) = interp.store.latest_session().await?
        && let Some(planned) = session.planned_era_id
    {
        return Ok(Some(planned as u64));
    }
    if let Some(planned) = chain.current_era(block_number).await.ok().flatten() {
        return Ok(Some(planned));
    }
    Ok(interp.store.active_era().await?.map(|era| era.era_id as u64))
}

/// A round that closed with submissions but no winner means every
/// submission was rejected. The round counter may have advanced by the time
/// the `Off` transition is observed, so the previous round is checked when
/// the carried one is empty.
async fn check_round_outcome(
    interp: &EventInterpreter,
    block_number: u64,
    timestamp: u64,
    round: u64,
) -> Result<(), StoreError> {
    for candidate in [round, round.saturating_sub(1)] {
        let submissions = interp.store.submission_count(candidate).await?;
        if submissions == 0 {
            continue;
        }
        if interp.store.winner_by_round(candidate).await?.is_none() {
            interp
                .warn(
                    block_number,
                    timestamp,
                    "election_issue",
                    format!(
                        "round {candidate} closed with {submissions} submission(s) and no winner"
                    ),
                )
                .await;
        }
        break;
    }
    Ok(())
}
