// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Shared test fixtures: an in-memory [`ChainApi`] implementation driven by
//! maps, plus builders for the handful of runtime events the interpreter
//! understands.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{Value as JsonValue, json};
use staking_indexer::client::{ChainApi, ChainError, HeadStream};
use staking_indexer::events::RawEvent;
use staking_indexer::types::ScoreTriple;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct MockBlock {
    pub timestamp: u64,
    pub events: Vec<RawEvent>,
}

/// Chain state driven from maps. Era queries are "as of height": the value
/// set at the greatest height not above the queried one wins, which mirrors
/// storage at historical blocks.
#[derive(Default)]
pub struct MockChain {
    finalized: Mutex<u64>,
    blocks: Mutex<BTreeMap<u64, MockBlock>>,
    active_era: Mutex<BTreeMap<u64, u64>>,
    current_era: Mutex<BTreeMap<u64, u64>>,
    validator_count: Mutex<Option<u64>>,
    counter_for_validators: Mutex<Option<u64>>,
    counter_for_nominators: Mutex<Option<u64>>,
    electable_stashes: Mutex<Option<u64>>,
    election_round: Mutex<Option<u64>>,
    minimum_score: Mutex<Option<ScoreTriple>>,
    queued_score: Mutex<Option<ScoreTriple>>,
    /// Heights that fail (with a transient storage error) this many more
    /// times before succeeding.
    failures: Mutex<HashMap<u64, u32>>,
}

#[allow(dead_code)]
impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_finalized(&self, number: u64) {
        *self.finalized.lock().unwrap() = number;
    }

    pub fn add_block(&self, number: u64, timestamp: u64, events: Vec<RawEvent>) {
        self.blocks
            .lock()
            .unwrap()
            .insert(number, MockBlock { timestamp, events });
        let mut finalized = self.finalized.lock().unwrap();
        if number > *finalized {
            *finalized = number;
        }
    }

    /// The active era takes this value from `from_height` on.
    pub fn set_active_era(&self, from_height: u64, era: u64) {
        self.active_era.lock().unwrap().insert(from_height, era);
    }

    /// The planned (current) era takes this value from `from_height` on.
    pub fn set_current_era(&self, from_height: u64, era: u64) {
        self.current_era.lock().unwrap().insert(from_height, era);
    }

    pub fn set_validator_count(&self, count: u64) {
        *self.validator_count.lock().unwrap() = Some(count);
    }

    pub fn set_candidate_counters(&self, validators: u64, nominators: u64) {
        *self.counter_for_validators.lock().unwrap() = Some(validators);
        *self.counter_for_nominators.lock().unwrap() = Some(nominators);
    }

    pub fn set_electable_stashes(&self, count: u64) {
        *self.electable_stashes.lock().unwrap() = Some(count);
    }

    pub fn set_election_round(&self, round: u64) {
        *self.election_round.lock().unwrap() = Some(round);
    }

    pub fn set_minimum_score(&self, score: ScoreTriple) {
        *self.minimum_score.lock().unwrap() = Some(score);
    }

    pub fn set_queued_score(&self, score: ScoreTriple) {
        *self.queued_score.lock().unwrap() = Some(score);
    }

    /// Make the next `times` fetches of this height fail transiently.
    pub fn fail_block_times(&self, number: u64, times: u32) {
        self.failures.lock().unwrap().insert(number, times);
    }

    fn check_failure(&self, number: u64) -> Result<(), ChainError> {
        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&number) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ChainError::Storage("System.Events"));
            }
        }
        Ok(())
    }

    fn era_at(map: &Mutex<BTreeMap<u64, u64>>, height: u64) -> Option<u64> {
        map.lock()
            .unwrap()
            .range(..=height)
            .next_back()
            .map(|(_, era)| *era)
    }
}

#[async_trait]
impl ChainApi for MockChain {
    async fn finalized_head(&self) -> Result<u64, ChainError> {
        Ok(*self.finalized.lock().unwrap())
    }

    async fn subscribe_finalized_heads(&self) -> Result<HeadStream, ChainError> {
        let heads: Vec<u64> = self.blocks.lock().unwrap().keys().copied().collect();
        Ok(futures::stream::iter(heads.into_iter().map(Ok)).boxed())
    }

    async fn block_hash(&self, number: u64) -> Result<Option<String>, ChainError> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&number)
            .map(|_| format!("0x{:064x}", number)))
    }

    async fn timestamp_ms(&self, number: u64) -> Result<u64, ChainError> {
        self.blocks
            .lock()
            .unwrap()
            .get(&number)
            .map(|block| block.timestamp)
            .ok_or(ChainError::Storage("Timestamp.Now"))
    }

    async fn events(&self, number: u64) -> Result<Vec<RawEvent>, ChainError> {
        self.check_failure(number)?;
        self.blocks
            .lock()
            .unwrap()
            .get(&number)
            .map(|block| block.events.clone())
            .ok_or(ChainError::Storage("System.Events"))
    }

    async fn active_era(&self, number: u64) -> Result<Option<u64>, ChainError> {
        Ok(Self::era_at(&self.active_era, number))
    }

    async fn current_era(&self, number: u64) -> Result<Option<u64>, ChainError> {
        Ok(Self::era_at(&self.current_era, number))
    }

    async fn validator_count(&self, _number: u64) -> Result<Option<u64>, ChainError> {
        Ok(*self.validator_count.lock().unwrap())
    }

    async fn counter_for_validators(&self, _number: u64) -> Result<Option<u64>, ChainError> {
        Ok(*self.counter_for_validators.lock().unwrap())
    }

    async fn counter_for_nominators(&self, _number: u64) -> Result<Option<u64>, ChainError> {
        Ok(*self.counter_for_nominators.lock().unwrap())
    }

    async fn electable_stashes(&self, _number: u64) -> Result<Option<u64>, ChainError> {
        Ok(*self.electable_stashes.lock().unwrap())
    }

    async fn election_round(&self, _number: u64) -> Result<Option<u64>, ChainError> {
        Ok(*self.election_round.lock().unwrap())
    }

    async fn minimum_election_score(
        &self,
        _number: u64,
    ) -> Result<Option<ScoreTriple>, ChainError> {
        Ok(self.minimum_score.lock().unwrap().clone())
    }

    async fn queued_solution_score(
        &self,
        _number: u64,
    ) -> Result<Option<ScoreTriple>, ChainError> {
        Ok(self.queued_score.lock().unwrap().clone())
    }

    async fn sorted_scores(
        &self,
        _number: u64,
        _round: u64,
    ) -> Result<Option<JsonValue>, ChainError> {
        Ok(None)
    }
}

// ================================================================================================
// Event builders
// ================================================================================================

#[allow(dead_code)]
pub fn session_report_event(
    end_index: u64,
    validator_points: u64,
    activation: Option<(u64, u64)>,
) -> RawEvent {
    let activation_json = match activation {
        Some((timestamp, era)) => json!({ "name": "Some", "value": [timestamp, era] }),
        None => json!("None"),
    };
    RawEvent {
        index: 0,
        pallet: "stakingRcClient".to_string(),
        method: "SessionReportReceived".to_string(),
        data: json!({
            "endIndex": end_index,
            "validatorPointsCounts": validator_points,
            "activationTimestamp": activation_json,
            "leftoverMessagesRemaining": 0
        }),
    }
}

#[allow(dead_code)]
pub fn era_paid_event(era_index: u64, validator_payout: &str, remainder: &str) -> RawEvent {
    RawEvent {
        index: 0,
        pallet: "staking".to_string(),
        method: "EraPaid".to_string(),
        data: json!({
            "eraIndex": era_index,
            "validatorPayout": validator_payout,
            "remainder": remainder
        }),
    }
}

#[allow(dead_code)]
pub fn phase_event(from: &str, to: JsonValue, round: u64) -> RawEvent {
    RawEvent {
        index: 0,
        pallet: "multiBlockElection".to_string(),
        method: "PhaseTransitioned".to_string(),
        data: json!({ "from": from, "to": to, "round": round }),
    }
}

#[allow(dead_code)]
pub fn signed_event(
    method: &str,
    round: u64,
    who_byte: u8,
    score: Option<(&str, &str, &str)>,
) -> RawEvent {
    let who = format!("0x{}", hex::encode([who_byte; 32]));
    let mut data = json!({ "round": round, "who": who });
    if let Some((minimal, sum, squared)) = score {
        data["claimedScore"] = json!({
            "minimalStake": minimal,
            "sumStake": sum,
            "sumStakeSquared": squared
        });
    }
    RawEvent {
        index: 0,
        pallet: "multiBlockElectionSigned".to_string(),
        method: method.to_string(),
        data,
    }
}

/// Assigns a distinct in-block index to an event.
#[allow(dead_code)]
pub fn at_index(mut event: RawEvent, index: u32) -> RawEvent {
    event.index = index;
    event
}
