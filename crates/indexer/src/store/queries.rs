// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read accessors consumed by the downstream API.
//!
//! These are plain queries over committed state; readers in another process
//! open their own connection and see the WAL snapshot advance as this
//! process commits.

use super::models::*;
use super::{Store, StoreError, block_table, events_table, state_key};
use crate::types::{ChainSyncInfo, ChainTag, StatusSnapshot, SyncStatus};
use serde_json::{Value as JsonValue, json};
use sqlx::{Column, Row, TypeInfo, sqlite::SqliteRow};

/// A chain is reported in sync while its freshest block is younger than this.
const IN_SYNC_MAX_AGE_MS: u64 = 60_000;

impl Store {
    // ============================================================================================
    // Status
    // ============================================================================================

    pub async fn status(&self, network: &str, now_ms: u64) -> Result<StatusSnapshot, StoreError> {
        let current_era: Option<(i64,)> = sqlx::query_as(
            "SELECT era_id FROM eras WHERE session_end IS NULL ORDER BY era_id DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?;

        let current_session: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT MAX(session_id) FROM sessions")
                .fetch_optional(self.pool())
                .await?;

        Ok(StatusSnapshot {
            current_era: current_era.map(|(id,)| id as u64),
            current_session: current_session.and_then(|(id,)| id).map(|id| id as u64),
            relay_chain: self.chain_sync_info(ChainTag::Relay, now_ms).await?,
            asset_hub: self.chain_sync_info(ChainTag::AssetHub, now_ms).await?,
            chain: network.to_string(),
        })
    }

    pub async fn chain_sync_info(
        &self,
        chain: ChainTag,
        now_ms: u64,
    ) -> Result<ChainSyncInfo, StoreError> {
        let is_syncing = matches!(
            self.get_state(&state_key("isSyncing", chain)).await?.as_deref(),
            Some("true")
        );
        let last_block = self.latest_block(chain).await?;
        let current_height = self.get_state_u64(&state_key("currentHeight", chain)).await?;

        let status = if is_syncing {
            SyncStatus::Syncing
        } else {
            match &last_block {
                Some(block)
                    if now_ms.saturating_sub(block.timestamp as u64) < IN_SYNC_MAX_AGE_MS =>
                {
                    SyncStatus::InSync
                }
                _ => SyncStatus::OutOfSync,
            }
        };

        let sync_progress = if is_syncing {
            let total = self
                .get_state_u64(&state_key("totalMissingBlocks", chain))
                .await?;
            let synced = self.get_state_u64(&state_key("syncedBlocks", chain)).await?;
            match (total, synced) {
                (Some(total), Some(synced)) if total > 0 => {
                    Some((synced as f64 / total as f64) * 100.0)
                }
                _ => None,
            }
        } else {
            None
        };

        Ok(ChainSyncInfo {
            status,
            last_block_number: last_block.as_ref().map(|b| b.block_number as u64),
            last_block_time: last_block.as_ref().map(|b| b.timestamp as u64),
            current_height,
            sync_progress,
        })
    }

    // ============================================================================================
    // Blocks
    // ============================================================================================

    pub async fn latest_block(&self, chain: ChainTag) -> Result<Option<BlockRow>, StoreError> {
        let row = sqlx::query_as(&format!(
            "SELECT * FROM {} ORDER BY block_number DESC LIMIT 1",
            block_table(chain)
        ))
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn recent_blocks(
        &self,
        chain: ChainTag,
        limit: u32,
    ) -> Result<Vec<BlockRow>, StoreError> {
        let rows = sqlx::query_as(&format!(
            "SELECT * FROM {} ORDER BY block_number DESC LIMIT ?1",
            block_table(chain)
        ))
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn block_by_number(
        &self,
        chain: ChainTag,
        number: u64,
    ) -> Result<Option<BlockRow>, StoreError> {
        let row = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE block_number = ?1",
            block_table(chain)
        ))
        .bind(number as i64)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    // ============================================================================================
    // Eras
    // ============================================================================================

    pub async fn recent_eras(&self, limit: u32) -> Result<Vec<EraRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM eras ORDER BY era_id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn era_by_id(&self, era_id: u64) -> Result<Option<EraRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM eras WHERE era_id = ?1")
            .bind(era_id as i64)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    /// The era with `end_time` derived from the activation timestamp of the
    /// session that closed it.
    pub async fn era_detail(&self, era_id: u64) -> Result<Option<EraDetailRow>, StoreError> {
        let row = sqlx::query_as(
            "SELECT e.*, s.activation_timestamp AS end_time
             FROM eras e
             LEFT JOIN sessions s ON s.session_id = e.session_end
             WHERE e.era_id = ?1",
        )
        .bind(era_id as i64)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    /// The era currently producing blocks, i.e. the one with no session end.
    pub async fn active_era(&self) -> Result<Option<EraRow>, StoreError> {
        let row = sqlx::query_as(
            "SELECT * FROM eras WHERE session_end IS NULL ORDER BY era_id DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    // ============================================================================================
    // Sessions
    // ============================================================================================

    pub async fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM sessions ORDER BY session_id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn session_by_id(&self, session_id: u64) -> Result<Option<SessionRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM sessions WHERE session_id = ?1")
            .bind(session_id as i64)
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn sessions_by_era(&self, era_id: u64) -> Result<Vec<SessionRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM sessions WHERE active_era_id = ?1 ORDER BY session_id",
        )
        .bind(era_id as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn latest_session(&self) -> Result<Option<SessionRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM sessions ORDER BY session_id DESC LIMIT 1")
            .fetch_optional(self.pool())
            .await?;
        Ok(row)
    }

    // ============================================================================================
    // Events
    // ============================================================================================

    pub async fn recent_events(
        &self,
        chain: ChainTag,
        limit: u32,
    ) -> Result<Vec<EventRow>, StoreError> {
        let rows = sqlx::query_as(&format!(
            "SELECT * FROM {} ORDER BY block_number DESC, id DESC LIMIT ?1",
            events_table(chain)
        ))
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn events_by_type(
        &self,
        chain: ChainTag,
        event_type: &str,
        limit: u32,
    ) -> Result<Vec<EventRow>, StoreError> {
        let rows = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE event_type = ?1 COLLATE NOCASE
             ORDER BY block_number DESC, id DESC LIMIT ?2",
            events_table(chain)
        ))
        .bind(event_type)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn events_by_block(
        &self,
        chain: ChainTag,
        number: u64,
    ) -> Result<Vec<EventRow>, StoreError> {
        let rows = sqlx::query_as(&format!(
            "SELECT * FROM {} WHERE block_number = ?1 ORDER BY id",
            events_table(chain)
        ))
        .bind(number as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Asset Hub events belonging to an era: the block range spanned by its
    /// sessions, widened to include all election phase rows for the era
    /// (election phases for era E are emitted during era E−1).
    pub async fn events_by_era_ah(&self, era_id: u64) -> Result<Vec<EventRow>, StoreError> {
        let Some(era) = self.era_by_id(era_id).await? else {
            return Ok(Vec::new());
        };

        let session_low: Option<i64> = self
            .session_by_id((era.session_start as u64).saturating_sub(1))
            .await?
            .and_then(|s| s.block_number)
            .map(|b| b + 1);

        let session_high: Option<i64> = match era.session_end {
            Some(session_end) => self
                .session_by_id(session_end as u64)
                .await?
                .and_then(|s| s.block_number),
            None => self
                .latest_block(ChainTag::AssetHub)
                .await?
                .map(|b| b.block_number),
        };

        let phase_range: Option<(Option<i64>, Option<i64>)> = sqlx::query_as(
            "SELECT MIN(block_number), MAX(block_number) FROM election_phases WHERE era_id = ?1",
        )
        .bind(era_id as i64)
        .fetch_optional(self.pool())
        .await?;
        let (phase_low, phase_high) = phase_range.unwrap_or((None, None));

        let low = match (session_low, phase_low) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let high = match (session_high, phase_high) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        let (Some(low), Some(high)) = (low, high) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as(
            "SELECT * FROM events_ah WHERE block_number BETWEEN ?1 AND ?2 ORDER BY block_number, id",
        )
        .bind(low)
        .bind(high)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    // ============================================================================================
    // Election phases
    // ============================================================================================

    pub async fn phases_by_era(&self, era_id: u64) -> Result<Vec<ElectionPhaseRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM election_phases WHERE era_id = ?1 ORDER BY id")
            .bind(era_id as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn recent_phases(&self, limit: u32) -> Result<Vec<ElectionPhaseRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM election_phases ORDER BY id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    // ============================================================================================
    // Election scores
    // ============================================================================================

    pub async fn winners(&self, limit: u32) -> Result<Vec<ElectionScoreRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM election_scores WHERE status = 'rewarded' ORDER BY round DESC LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn winners_by_era(&self, era_id: u64) -> Result<Vec<ElectionScoreRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM election_scores WHERE status = 'rewarded' AND era_id = ?1
             ORDER BY round DESC",
        )
        .bind(era_id as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn winner_by_round(
        &self,
        round: u64,
    ) -> Result<Option<ElectionScoreRow>, StoreError> {
        let row = sqlx::query_as(
            "SELECT * FROM election_scores WHERE status = 'rewarded' AND round = ?1",
        )
        .bind(round as i64)
        .fetch_optional(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn submission_count(&self, round: u64) -> Result<u64, StoreError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM election_scores WHERE round = ?1")
                .bind(round as i64)
                .fetch_one(self.pool())
                .await?;
        Ok(count.0 as u64)
    }

    pub async fn scores_by_round(&self, round: u64) -> Result<Vec<ElectionScoreRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM election_scores WHERE round = ?1 ORDER BY submitter",
        )
        .bind(round as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    // ============================================================================================
    // Warnings
    // ============================================================================================

    pub async fn recent_warnings(&self, limit: u32) -> Result<Vec<WarningRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM warnings ORDER BY id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn warnings_by_severity(
        &self,
        severity: &str,
        limit: u32,
    ) -> Result<Vec<WarningRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM warnings WHERE severity = ?1 ORDER BY id DESC LIMIT ?2",
        )
        .bind(severity)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn warnings_by_era(&self, era_id: u64) -> Result<Vec<WarningRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM warnings WHERE era_id = ?1 ORDER BY id")
            .bind(era_id as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    // ============================================================================================
    // Database introspection (administrative UI)
    // ============================================================================================

    pub async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn table_schema(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        self.ensure_known_table(table).await?;
        let rows = sqlx::query_as(&format!("PRAGMA table_info(\"{}\")", table))
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn sample_rows(
        &self,
        table: &str,
        limit: u32,
    ) -> Result<Vec<JsonValue>, StoreError> {
        self.ensure_known_table(table).await?;
        let rows = sqlx::query(&format!("SELECT * FROM \"{}\" LIMIT ?1", table))
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Table names are interpolated into SQL, so they are validated against
    /// the actual table list first.
    async fn ensure_known_table(&self, table: &str) -> Result<(), StoreError> {
        let tables = self.list_tables().await?;
        if tables.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(StoreError::UnknownTable(table.to_string()))
        }
    }
}

fn row_to_json(row: &SqliteRow) -> JsonValue {
    let mut object = serde_json::Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "INTEGER" => row
                .try_get::<Option<i64>, _>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "REAL" => row
                .try_get::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(|v| json!(v)),
            "BLOB" => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(format!("0x{}", hex::encode(v)))),
            _ => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::String),
        };
        object.insert(column.name().to_string(), value.unwrap_or(JsonValue::Null));
    }
    JsonValue::Object(object)
}
