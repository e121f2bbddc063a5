// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Durable persistence for the indexer.
//!
//! A single SQLite file per network, write-ahead logging enabled so that
//! reader processes see committed snapshots while this process writes.
//! All writes go through the typed operations here; they encapsulate the
//! merge rules (absorb-don't-overwrite) the event interpreter relies on.
//!
//! `era_id` columns on sessions, election phases and warnings may name eras
//! that do not exist yet (elections for era E run during era E−1), so no
//! foreign key is declared on them; era pruning deletes the dependent rows
//! explicitly instead.

pub mod models;
pub mod queries;

pub use models::*;

use crate::types::ChainTag;
use crate::util::now_ms;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("unknown table '{0}'")]
    UnknownTable(String),
}

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Migrations are applied at most once each, recorded by version in
/// `schema_migrations`.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial schema",
    sql: r#"
CREATE TABLE blocks_rc (
    block_number INTEGER PRIMARY KEY,
    timestamp INTEGER NOT NULL
);

CREATE TABLE blocks_ah (
    block_number INTEGER PRIMARY KEY,
    timestamp INTEGER NOT NULL
);

CREATE TABLE events_rc (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_number INTEGER NOT NULL REFERENCES blocks_rc (block_number) ON DELETE CASCADE,
    event_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    data TEXT NOT NULL
);
CREATE INDEX idx_events_rc_block ON events_rc (block_number);
CREATE INDEX idx_events_rc_type ON events_rc (event_type);

CREATE TABLE events_ah (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    block_number INTEGER NOT NULL REFERENCES blocks_ah (block_number) ON DELETE CASCADE,
    event_id TEXT NOT NULL,
    event_type TEXT NOT NULL,
    data TEXT NOT NULL
);
CREATE INDEX idx_events_ah_block ON events_ah (block_number);
CREATE INDEX idx_events_ah_type ON events_ah (event_type);

CREATE TABLE eras (
    era_id INTEGER PRIMARY KEY,
    session_start INTEGER NOT NULL,
    session_end INTEGER,
    start_time INTEGER,
    inflation_total TEXT,
    inflation_validators TEXT,
    inflation_treasury TEXT,
    validators_elected INTEGER,
    CHECK (session_end IS NULL OR session_end >= session_start)
);

CREATE TABLE sessions (
    session_id INTEGER PRIMARY KEY,
    block_number INTEGER REFERENCES blocks_ah (block_number) ON DELETE SET NULL,
    activation_timestamp INTEGER,
    active_era_id INTEGER,
    planned_era_id INTEGER,
    validator_points_total INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX idx_sessions_active_era ON sessions (active_era_id);

CREATE TABLE election_phases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    era_id INTEGER NOT NULL,
    block_number INTEGER NOT NULL REFERENCES blocks_ah (block_number) ON DELETE CASCADE,
    round INTEGER NOT NULL,
    phase TEXT NOT NULL,
    event_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    validator_candidates INTEGER,
    nominator_candidates INTEGER,
    target_validator_count INTEGER,
    minimum_score TEXT,
    sorted_scores TEXT,
    queued_solution_score TEXT,
    validators_elected INTEGER,
    expected_duration_blocks INTEGER,
    status TEXT
);
CREATE INDEX idx_election_phases_era ON election_phases (era_id);
CREATE INDEX idx_election_phases_round ON election_phases (round);

CREATE TABLE election_scores (
    round INTEGER NOT NULL,
    submitter TEXT NOT NULL,
    block_number INTEGER NOT NULL,
    minimal_stake TEXT NOT NULL,
    sum_stake TEXT NOT NULL,
    sum_stake_squared TEXT NOT NULL,
    status TEXT NOT NULL
        CHECK (status IN ('registered', 'rewarded', 'slashed', 'ejected', 'discarded', 'bailed')),
    era_id INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (round, submitter)
);
CREATE INDEX idx_election_scores_status ON election_scores (status);

CREATE TABLE warnings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    era_id INTEGER,
    session_id INTEGER,
    block_number INTEGER NOT NULL,
    type TEXT NOT NULL,
    message TEXT NOT NULL,
    severity TEXT NOT NULL CHECK (severity IN ('info', 'warning', 'error')),
    timestamp INTEGER NOT NULL
);
CREATE INDEX idx_warnings_era ON warnings (era_id);
CREATE INDEX idx_warnings_severity ON warnings (severity);

CREATE TABLE indexer_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE reimport_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chain TEXT NOT NULL CHECK (chain IN ('relay_chain', 'asset_hub')),
    block_number INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
    submitted_at INTEGER NOT NULL,
    completed_at INTEGER,
    error TEXT
);
"#,
}];

fn block_table(chain: ChainTag) -> &'static str {
    match chain {
        ChainTag::Relay => "blocks_rc",
        ChainTag::AssetHub => "blocks_ah",
    }
}

fn events_table(chain: ChainTag) -> &'static str {
    match chain {
        ChainTag::Relay => "events_rc",
        ChainTag::AssetHub => "events_ah",
    }
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database file and apply migrations.
    ///
    /// WAL journal mode with `synchronous = NORMAL` and enforced foreign
    /// keys; a single writer connection so concurrent tasks serialize on
    /// the pool instead of hitting `SQLITE_BUSY`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        Self::open_with(options).await
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);

        Self::open_with(options).await
    }

    async fn open_with(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        // One connection: an in-memory database lives and dies with it, and
        // the file-backed database has a single writer by design.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        for migration in MIGRATIONS {
            let applied: Option<(i64,)> =
                sqlx::query_as("SELECT version FROM schema_migrations WHERE version = ?1")
                    .bind(migration.version)
                    .fetch_optional(&self.pool)
                    .await?;
            if applied.is_some() {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration.sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| StoreError::Migration {
                    version: migration.version,
                    source,
                })?;
            sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)")
                .bind(migration.version)
                .bind(migration.name)
                .bind(now_ms() as i64)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(version = migration.version, name = migration.name, "applied migration");
        }

        Ok(())
    }

    // ============================================================================================
    // Blocks and events
    // ============================================================================================

    pub async fn has_block(&self, chain: ChainTag, number: u64) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT block_number FROM {} WHERE block_number = ?1",
            block_table(chain)
        ))
        .bind(number as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Heights in `[from, to]` with no block row yet, ascending.
    pub async fn missing_blocks(
        &self,
        chain: ChainTag,
        from: u64,
        to: u64,
    ) -> Result<Vec<u64>, StoreError> {
        if from > to {
            return Ok(Vec::new());
        }

        let present: Vec<(i64,)> = sqlx::query_as(&format!(
            "SELECT block_number FROM {} WHERE block_number BETWEEN ?1 AND ?2",
            block_table(chain)
        ))
        .bind(from as i64)
        .bind(to as i64)
        .fetch_all(&self.pool)
        .await?;

        let present: std::collections::HashSet<u64> =
            present.into_iter().map(|(n,)| n as u64).collect();
        Ok((from..=to).filter(|n| !present.contains(n)).collect())
    }

    /// Insert a block and its filtered events in one transaction.
    ///
    /// Returns `false` without touching the events when the block already
    /// exists, so every ingestion path (backfill, live, gap fill, reimport)
    /// stores a block's events at most once.
    pub async fn insert_block_with_events(
        &self,
        chain: ChainTag,
        number: u64,
        timestamp: u64,
        events: &[NewEvent],
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO {} (block_number, timestamp) VALUES (?1, ?2)
             ON CONFLICT (block_number) DO NOTHING",
            block_table(chain)
        ))
        .bind(number as i64)
        .bind(timestamp as i64)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for event in events {
            sqlx::query(&format!(
                "INSERT INTO {} (block_number, event_id, event_type, data) VALUES (?1, ?2, ?3, ?4)",
                events_table(chain)
            ))
            .bind(number as i64)
            .bind(&event.event_id)
            .bind(&event.event_type)
            .bind(&event.data)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Delete a block; its events go with it (cascade), session references
    /// are nulled out.
    pub async fn delete_block(&self, chain: ChainTag, number: u64) -> Result<u64, StoreError> {
        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE block_number = ?1",
            block_table(chain)
        ))
        .bind(number as i64)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted)
    }

    // ============================================================================================
    // Eras and sessions
    // ============================================================================================

    /// Insert or update an era. Boundary fields are replaced; inflation and
    /// validator-count fields are left alone so a boundary event never
    /// blanks out data a later `EraPaid` added.
    pub async fn upsert_era(&self, era: NewEra) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO eras (era_id, session_start, session_end, start_time)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (era_id) DO UPDATE SET
                session_start = excluded.session_start,
                session_end = excluded.session_end,
                start_time = excluded.start_time",
        )
        .bind(era.era_id as i64)
        .bind(era.session_start as i64)
        .bind(era.session_end.map(|v| v as i64))
        .bind(era.start_time.map(|v| v as i64))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Close the currently active era (the one with `session_end` null) at
    /// the given session. The era being opened is excluded so interleavings
    /// can never close it by accident.
    pub async fn close_active_era(
        &self,
        end_session: u64,
        exclude_era: u64,
    ) -> Result<u64, StoreError> {
        let updated = sqlx::query(
            "UPDATE eras SET session_end = ?1 WHERE session_end IS NULL AND era_id <> ?2",
        )
        .bind(end_session as i64)
        .bind(exclude_era as i64)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated)
    }

    /// Latest observation wins for inflation values.
    pub async fn set_era_inflation(
        &self,
        era_id: u64,
        validators: &str,
        treasury: &str,
        total: &str,
    ) -> Result<u64, StoreError> {
        let updated = sqlx::query(
            "UPDATE eras SET inflation_validators = ?2, inflation_treasury = ?3, inflation_total = ?4
             WHERE era_id = ?1",
        )
        .bind(era_id as i64)
        .bind(validators)
        .bind(treasury)
        .bind(total)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated)
    }

    pub async fn set_era_validators_elected(
        &self,
        era_id: u64,
        count: u64,
    ) -> Result<u64, StoreError> {
        let updated = sqlx::query("UPDATE eras SET validators_elected = ?2 WHERE era_id = ?1")
            .bind(era_id as i64)
            .bind(count as i64)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated)
    }

    /// Insert or merge a session row. Null never clobbers a known value and
    /// a zero points total never clobbers a reported one.
    pub async fn upsert_session(&self, session: NewSession) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (
                session_id, block_number, activation_timestamp,
                active_era_id, planned_era_id, validator_points_total
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (session_id) DO UPDATE SET
                block_number = COALESCE(excluded.block_number, sessions.block_number),
                activation_timestamp = COALESCE(excluded.activation_timestamp, sessions.activation_timestamp),
                active_era_id = COALESCE(excluded.active_era_id, sessions.active_era_id),
                planned_era_id = COALESCE(excluded.planned_era_id, sessions.planned_era_id),
                validator_points_total = CASE
                    WHEN excluded.validator_points_total > 0 THEN excluded.validator_points_total
                    ELSE sessions.validator_points_total
                END",
        )
        .bind(session.session_id as i64)
        .bind(session.block_number.map(|v| v as i64))
        .bind(session.activation_timestamp.map(|v| v as i64))
        .bind(session.active_era_id.map(|v| v as i64))
        .bind(session.planned_era_id.map(|v| v as i64))
        .bind(session.validator_points_total as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ============================================================================================
    // Elections
    // ============================================================================================

    /// Phase rows are append-only; the timeline is a log.
    pub async fn insert_election_phase(&self, phase: NewElectionPhase) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO election_phases (
                era_id, block_number, round, phase, event_id, timestamp,
                validator_candidates, nominator_candidates, target_validator_count,
                minimum_score, sorted_scores, queued_solution_score,
                validators_elected, expected_duration_blocks, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(phase.era_id as i64)
        .bind(phase.block_number as i64)
        .bind(phase.round as i64)
        .bind(&phase.phase)
        .bind(&phase.event_id)
        .bind(phase.timestamp as i64)
        .bind(phase.validator_candidates.map(|v| v as i64))
        .bind(phase.nominator_candidates.map(|v| v as i64))
        .bind(phase.target_validator_count.map(|v| v as i64))
        .bind(&phase.minimum_score)
        .bind(&phase.sorted_scores)
        .bind(&phase.queued_solution_score)
        .bind(phase.validators_elected.map(|v| v as i64))
        .bind(phase.expected_duration_blocks.map(|v| v as i64))
        .bind(&phase.status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn election_score(
        &self,
        round: u64,
        submitter: &str,
    ) -> Result<Option<ElectionScoreRow>, StoreError> {
        let row = sqlx::query_as(
            "SELECT * FROM election_scores WHERE round = ?1 AND submitter = ?2",
        )
        .bind(round as i64)
        .bind(submitter)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert or merge a score submission. Status transitions are gated by
    /// the caller (terminal rows are never fed back here); score fields
    /// follow the non-zero-preserves rule so status-only events keep the
    /// registered score.
    pub async fn upsert_election_score(&self, score: NewElectionScore) -> Result<(), StoreError> {
        let now = now_ms() as i64;
        sqlx::query(
            "INSERT INTO election_scores (
                round, submitter, block_number,
                minimal_stake, sum_stake, sum_stake_squared,
                status, era_id, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             ON CONFLICT (round, submitter) DO UPDATE SET
                block_number = excluded.block_number,
                minimal_stake = CASE
                    WHEN excluded.minimal_stake <> '0' THEN excluded.minimal_stake
                    ELSE election_scores.minimal_stake
                END,
                sum_stake = CASE
                    WHEN excluded.sum_stake <> '0' THEN excluded.sum_stake
                    ELSE election_scores.sum_stake
                END,
                sum_stake_squared = CASE
                    WHEN excluded.sum_stake_squared <> '0' THEN excluded.sum_stake_squared
                    ELSE election_scores.sum_stake_squared
                END,
                status = excluded.status,
                era_id = COALESCE(excluded.era_id, election_scores.era_id),
                updated_at = excluded.updated_at",
        )
        .bind(score.round as i64)
        .bind(&score.submitter)
        .bind(score.block_number as i64)
        .bind(&score.minimal_stake)
        .bind(&score.sum_stake)
        .bind(&score.sum_stake_squared)
        .bind(score.status.as_str())
        .bind(score.era_id.map(|v| v as i64))
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ============================================================================================
    // Warnings
    // ============================================================================================

    pub async fn insert_warning(&self, warning: NewWarning) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO warnings (era_id, session_id, block_number, type, message, severity, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(warning.era_id.map(|v| v as i64))
        .bind(warning.session_id.map(|v| v as i64))
        .bind(warning.block_number as i64)
        .bind(&warning.kind)
        .bind(&warning.message)
        .bind(warning.severity.as_str())
        .bind(warning.timestamp as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ============================================================================================
    // Indexer state
    // ============================================================================================

    pub async fn set_state(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO indexer_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Set a numeric state key, keeping whichever value is larger. Used for
    /// height counters that live ingestion and gap fill race on.
    pub async fn set_state_max(&self, key: &str, value: u64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO indexer_state (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (key) DO UPDATE SET
                value = CASE
                    WHEN CAST(excluded.value AS INTEGER) > CAST(indexer_state.value AS INTEGER)
                        THEN excluded.value
                    ELSE indexer_state.value
                END,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value.to_string())
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_state(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM indexer_state WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn get_state_u64(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.get_state(key).await?.and_then(|v| v.parse().ok()))
    }

    // ============================================================================================
    // Reimport queue
    // ============================================================================================

    pub async fn submit_reimport(
        &self,
        chain: ChainTag,
        block_number: u64,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO reimport_requests (chain, block_number, status, submitted_at)
             VALUES (?1, ?2, 'pending', ?3)",
        )
        .bind(chain.as_str())
        .bind(block_number as i64)
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn pending_reimports(&self, limit: u32) -> Result<Vec<ReimportRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM reimport_requests WHERE status = 'pending'
             ORDER BY submitted_at, id LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Transition `pending → processing`. Returns false when the request was
    /// already claimed, so each request is processed at most once.
    pub async fn claim_reimport(&self, id: i64) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE reimport_requests SET status = 'processing' WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    pub async fn complete_reimport(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE reimport_requests SET status = 'completed', completed_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail_reimport(&self, id: i64, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE reimport_requests SET status = 'failed', completed_at = ?2, error = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(now_ms() as i64)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_reimports(&self, limit: u32) -> Result<Vec<ReimportRow>, StoreError> {
        let rows = sqlx::query_as("SELECT * FROM reimport_requests ORDER BY id DESC LIMIT ?1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ============================================================================================
    // Pruning
    // ============================================================================================

    /// Enforce the era retention cap: eras older than `latest − max_eras`
    /// are deleted, along with their phase and warning rows. Blocks and
    /// events are not touched.
    pub async fn prune_eras(&self, max_eras: u64) -> Result<u64, StoreError> {
        let latest: Option<(Option<i64>,)> = sqlx::query_as("SELECT MAX(era_id) FROM eras")
            .fetch_optional(&self.pool)
            .await?;
        let Some((Some(latest),)) = latest else {
            return Ok(0);
        };

        let cutoff = latest - max_eras as i64;
        if cutoff <= 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM warnings WHERE era_id < ?1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM election_phases WHERE era_id < ?1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;
        let pruned = sqlx::query("DELETE FROM eras WHERE era_id < ?1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if pruned > 0 {
            tracing::info!(pruned, cutoff, "pruned old eras");
        }
        Ok(pruned)
    }
}

/// Key of a per-chain `indexer_state` entry, e.g. `currentHeightAH`.
pub fn state_key(prefix: &str, chain: ChainTag) -> String {
    format!("{}{}", prefix, chain.key_suffix())
}
