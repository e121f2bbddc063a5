// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Domain types shared across the indexer: chain tags, lifecycle enums and
//! the status snapshot served to readers.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One of the two chains the indexer follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainTag {
    Relay,
    AssetHub,
}

impl ChainTag {
    /// Suffix of the `indexer_state` keys, e.g. `currentHeightRC`.
    pub fn key_suffix(&self) -> &'static str {
        match self {
            ChainTag::Relay => "RC",
            ChainTag::AssetHub => "AH",
        }
    }

    /// Suffix of the per-chain tables, e.g. `blocks_rc`.
    pub fn table_suffix(&self) -> &'static str {
        match self {
            ChainTag::Relay => "rc",
            ChainTag::AssetHub => "ah",
        }
    }

    /// The external name used in the reimport queue.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainTag::Relay => "relay_chain",
            ChainTag::AssetHub => "asset_hub",
        }
    }
}

impl FromStr for ChainTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relay_chain" => Ok(ChainTag::Relay),
            "asset_hub" => Ok(ChainTag::AssetHub),
            other => Err(format!("unknown chain tag '{other}'")),
        }
    }
}

impl fmt::Display for ChainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an election score submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreStatus {
    Registered,
    Rewarded,
    Slashed,
    Ejected,
    Discarded,
    Bailed,
}

impl ScoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreStatus::Registered => "registered",
            ScoreStatus::Rewarded => "rewarded",
            ScoreStatus::Slashed => "slashed",
            ScoreStatus::Ejected => "ejected",
            ScoreStatus::Discarded => "discarded",
            ScoreStatus::Bailed => "bailed",
        }
    }

    /// Terminal statuses are immutable; later events for the same
    /// `(round, submitter)` must not change them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScoreStatus::Registered)
    }
}

impl FromStr for ScoreStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(ScoreStatus::Registered),
            "rewarded" => Ok(ScoreStatus::Rewarded),
            "slashed" => Ok(ScoreStatus::Slashed),
            "ejected" => Ok(ScoreStatus::Ejected),
            "discarded" => Ok(ScoreStatus::Discarded),
            "bailed" => Ok(ScoreStatus::Bailed),
            other => Err(format!("unknown score status '{other}'")),
        }
    }
}

impl fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an interpreter warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a queued reimport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReimportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReimportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReimportStatus::Pending => "pending",
            ReimportStatus::Processing => "processing",
            ReimportStatus::Completed => "completed",
            ReimportStatus::Failed => "failed",
        }
    }
}

/// A score triple as carried by election events and verifier storage.
/// All components are decimal strings of planck amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTriple {
    pub minimal_stake: String,
    pub sum_stake: String,
    pub sum_stake_squared: String,
}

/// Sync state of one chain as reported by `get_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    #[serde(rename = "syncing")]
    Syncing,
    #[serde(rename = "in-sync")]
    InSync,
    #[serde(rename = "out-of-sync")]
    OutOfSync,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSyncInfo {
    pub status: SyncStatus,
    pub last_block_number: Option<u64>,
    pub last_block_time: Option<u64>,
    pub current_height: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_progress: Option<f64>,
}

/// Snapshot returned by the status query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub current_era: Option<u64>,
    pub current_session: Option<u64>,
    pub relay_chain: ChainSyncInfo,
    pub asset_hub: ChainSyncInfo,
    pub chain: String,
}
