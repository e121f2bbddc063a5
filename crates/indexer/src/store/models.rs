// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Row models read from the store and the input structs for its write
//! operations.

use crate::types::{ScoreStatus, Severity};
use serde::Serialize;
use sqlx::FromRow;

// ================================================================================================
// Persisted rows
// ================================================================================================

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRow {
    pub block_number: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    pub id: i64,
    pub block_number: i64,
    pub event_id: String,
    pub event_type: String,
    pub data: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EraRow {
    pub era_id: i64,
    pub session_start: i64,
    pub session_end: Option<i64>,
    pub start_time: Option<i64>,
    pub inflation_total: Option<String>,
    pub inflation_validators: Option<String>,
    pub inflation_treasury: Option<String>,
    pub validators_elected: Option<i64>,
}

/// An era joined with its end time, derived from the activation timestamp
/// of the session that closed it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EraDetailRow {
    pub era_id: i64,
    pub session_start: i64,
    pub session_end: Option<i64>,
    pub start_time: Option<i64>,
    pub inflation_total: Option<String>,
    pub inflation_validators: Option<String>,
    pub inflation_treasury: Option<String>,
    pub validators_elected: Option<i64>,
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub session_id: i64,
    pub block_number: Option<i64>,
    pub activation_timestamp: Option<i64>,
    pub active_era_id: Option<i64>,
    pub planned_era_id: Option<i64>,
    pub validator_points_total: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionPhaseRow {
    pub id: i64,
    pub era_id: i64,
    pub block_number: i64,
    pub round: i64,
    pub phase: String,
    pub event_id: String,
    pub timestamp: i64,
    pub validator_candidates: Option<i64>,
    pub nominator_candidates: Option<i64>,
    pub target_validator_count: Option<i64>,
    pub minimum_score: Option<String>,
    pub sorted_scores: Option<String>,
    pub queued_solution_score: Option<String>,
    pub validators_elected: Option<i64>,
    pub expected_duration_blocks: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionScoreRow {
    pub round: i64,
    pub submitter: String,
    pub block_number: i64,
    pub minimal_stake: String,
    pub sum_stake: String,
    pub sum_stake_squared: String,
    pub status: String,
    pub era_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningRow {
    pub id: i64,
    pub era_id: Option<i64>,
    pub session_id: Option<i64>,
    pub block_number: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub warning_type: String,
    pub message: String,
    pub severity: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimportRow {
    pub id: i64,
    pub chain: String,
    pub block_number: i64,
    pub status: String,
    pub submitted_at: i64,
    pub completed_at: Option<i64>,
    pub error: Option<String>,
}

/// A column description from `PRAGMA table_info`, used by the
/// administrative introspection queries.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub column_type: String,
    pub notnull: i64,
    pub dflt_value: Option<String>,
    pub pk: i64,
}

// ================================================================================================
// Write inputs
// ================================================================================================

/// A filtered event ready for persistence alongside its block.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_id: String,
    pub event_type: String,
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct NewEra {
    pub era_id: u64,
    pub session_start: u64,
    pub session_end: Option<u64>,
    pub start_time: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub session_id: u64,
    pub block_number: Option<u64>,
    pub activation_timestamp: Option<u64>,
    pub active_era_id: Option<u64>,
    pub planned_era_id: Option<u64>,
    pub validator_points_total: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NewElectionPhase {
    pub era_id: u64,
    pub block_number: u64,
    pub round: u64,
    pub phase: String,
    pub event_id: String,
    pub timestamp: u64,
    pub validator_candidates: Option<u64>,
    pub nominator_candidates: Option<u64>,
    pub target_validator_count: Option<u64>,
    pub minimum_score: Option<String>,
    pub sorted_scores: Option<String>,
    pub queued_solution_score: Option<String>,
    pub validators_elected: Option<u64>,
    pub expected_duration_blocks: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewElectionScore {
    pub round: u64,
    pub submitter: String,
    pub block_number: u64,
    pub minimal_stake: String,
    pub sum_stake: String,
    pub sum_stake_squared: String,
    pub status: ScoreStatus,
    pub era_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NewWarning {
    pub era_id: Option<u64>,
    pub session_id: Option<u64>,
    pub block_number: u64,
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: u64,
}
