// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fault-tolerant endpoint pool for one chain.
//!
//! Owns the list of RPC URLs for a chain, walks it with an advancing cursor
//! when connecting, tracks per-endpoint health and cools failing endpoints
//! down before they are retried. The manager itself implements [`ChainApi`]
//! by delegating to the currently connected client, so callers never deal
//! with individual endpoints.

use crate::client::{ChainApi, ChainError, HeadStream, SubxtChain};
use crate::events::RawEvent;
use crate::types::{ChainTag, ScoreTriple};
use crate::util::{now_ms, sleep_cancellable};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use staking_indexer_config::RpcConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{RwLock, watch};

/// Failures after which an endpoint is considered unhealthy.
const MAX_FAIL: u32 = 3;

/// How long an unhealthy endpoint stays out of rotation.
const COOLDOWN_MS: u64 = 60_000;

/// Delay before walking the pool again after an observed disconnect.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Interval of the periodic connection liveness check.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("no endpoints configured for {0}")]
    NoEndpoints(ChainTag),

    #[error("shutdown requested while connecting")]
    Cancelled,
}

#[derive(Debug)]
struct EndpointState {
    url: String,
    last_attempt_ms: u64,
    consecutive_failures: u32,
    healthy: bool,
}

impl EndpointState {
    fn new(url: String) -> Self {
        Self {
            url,
            last_attempt_ms: 0,
            consecutive_failures: 0,
            healthy: true,
        }
    }

    /// An endpoint is in rotation while it is healthy; once it has failed
    /// `MAX_FAIL` times in a row it only gets another try after the
    /// cooldown has elapsed since its last attempt.
    fn eligible(&self, now: u64) -> bool {
        self.healthy && self.consecutive_failures < MAX_FAIL
            || now.saturating_sub(self.last_attempt_ms) >= COOLDOWN_MS
    }
}

struct Pool {
    endpoints: Vec<EndpointState>,
    cursor: usize,
}

pub struct EndpointManager {
    chain: ChainTag,
    rpc: RpcConfig,
    ss58_prefix: u16,
    pool: Mutex<Pool>,
    current: RwLock<Option<Arc<SubxtChain>>>,
    shutdown: watch::Receiver<bool>,
}

impl EndpointManager {
    pub fn new(
        chain: ChainTag,
        urls: Vec<String>,
        rpc: RpcConfig,
        ss58_prefix: u16,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            chain,
            rpc,
            ss58_prefix,
            pool: Mutex::new(Pool {
                endpoints: urls.into_iter().map(EndpointState::new).collect(),
                cursor: 0,
            }),
            current: RwLock::new(None),
            shutdown,
        }
    }

    pub fn chain(&self) -> ChainTag {
        self.chain
    }

    /// URL of the endpoint currently connected to, if any.
    pub async fn current_endpoint(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|client| client.url().to_string())
    }

    pub async fn is_connected(&self) -> bool {
        self.current.read().await.is_some()
    }

    fn lock_pool(&self) -> std::sync::MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pick the next endpoint to try. Walks the pool from the advancing
    /// cursor; if two full passes find nothing eligible, every endpoint is
    /// reset to healthy (the outage is assumed to be a transient network
    /// fault on our side) and the walk continues.
    fn pick(&self) -> Option<String> {
        let mut pool = self.lock_pool();
        let len = pool.endpoints.len();
        if len == 0 {
            return None;
        }

        let now = now_ms();
        for _ in 0..2 * len {
            let idx = pool.cursor % len;
            pool.cursor = (pool.cursor + 1) % len;
            if pool.endpoints[idx].eligible(now) {
                pool.endpoints[idx].last_attempt_ms = now;
                return Some(pool.endpoints[idx].url.clone());
            }
        }

        for endpoint in &mut pool.endpoints {
            endpoint.healthy = true;
            endpoint.consecutive_failures = 0;
        }
        let idx = pool.cursor % len;
        pool.cursor = (pool.cursor + 1) % len;
        pool.endpoints[idx].last_attempt_ms = now;
        Some(pool.endpoints[idx].url.clone())
    }

    fn record_success(&self, url: &str) {
        let mut pool = self.lock_pool();
        if let Some(endpoint) = pool.endpoints.iter_mut().find(|e| e.url == url) {
            endpoint.consecutive_failures = 0;
            endpoint.healthy = true;
        }
    }

    fn record_failure(&self, url: &str) {
        let mut pool = self.lock_pool();
        if let Some(endpoint) = pool.endpoints.iter_mut().find(|e| e.url == url) {
            endpoint.last_attempt_ms = now_ms();
            endpoint.consecutive_failures += 1;
            if endpoint.consecutive_failures >= MAX_FAIL {
                endpoint.healthy = false;
            }
        }
    }

    /// Walk the pool until a connection is established. Each attempt is
    /// bounded by the configured connect timeout. Only gives up when
    /// shutdown is requested (or no endpoints are configured at all).
    pub async fn connect(&self) -> Result<Arc<SubxtChain>, EndpointError> {
        loop {
            if *self.shutdown.borrow() {
                return Err(EndpointError::Cancelled);
            }

            let Some(url) = self.pick() else {
                return Err(EndpointError::NoEndpoints(self.chain));
            };

            tracing::info!(chain = %self.chain, %url, "connecting");
            let attempt = tokio::time::timeout(
                Duration::from_secs(self.rpc.connect_timeout_secs),
                SubxtChain::connect(&url, &self.rpc, self.ss58_prefix),
            )
            .await;

            match attempt {
                Ok(Ok(connected)) => {
                    self.record_success(&url);
                    let client = Arc::new(connected);
                    *self.current.write().await = Some(client.clone());
                    tracing::info!(chain = %self.chain, %url, "connected");
                    return Ok(client);
                }
                Ok(Err(e)) => {
                    self.record_failure(&url);
                    tracing::warn!(chain = %self.chain, %url, error = %e, "connect attempt failed");
                }
                Err(_) => {
                    self.record_failure(&url);
                    tracing::warn!(
                        chain = %self.chain,
                        %url,
                        timeout_secs = self.rpc.connect_timeout_secs,
                        "connect attempt timed out"
                    );
                }
            }

            if sleep_cancellable(Duration::from_secs(1), &self.shutdown).await {
                return Err(EndpointError::Cancelled);
            }
        }
    }

    /// Drop the current connection and walk the pool again after a short
    /// delay. Used when a subscription drops or the liveness check fails.
    pub async fn reconnect(&self) -> Result<Arc<SubxtChain>, EndpointError> {
        *self.current.write().await = None;
        if sleep_cancellable(RECONNECT_DELAY, &self.shutdown).await {
            return Err(EndpointError::Cancelled);
        }
        self.connect().await
    }

    /// Periodic liveness check: verifies the current connection still
    /// answers and reconnects when it does not.
    pub async fn run_liveness(self: Arc<Self>) {
        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(LIVENESS_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = interval.tick() => {
                    let client = self.current.read().await.clone();
                    match client {
                        Some(client) => {
                            if let Err(e) = client.finalized_head().await {
                                tracing::warn!(chain = %self.chain, error = %e, "liveness check failed, reconnecting");
                                let _ = self.reconnect().await;
                            }
                        }
                        None => {
                            let _ = self.connect().await;
                        }
                    }
                }
            }
        }
    }

    async fn api(&self) -> Result<Arc<SubxtChain>, ChainError> {
        self.current.read().await.clone().ok_or(ChainError::NotConnected)
    }
}

#[async_trait]
impl ChainApi for EndpointManager {
    async fn finalized_head(&self) -> Result<u64, ChainError> {
        self.api().await?.finalized_head().await
    }

    async fn subscribe_finalized_heads(&self) -> Result<HeadStream, ChainError> {
        self.api().await?.subscribe_finalized_heads().await
    }

    async fn block_hash(&self, number: u64) -> Result<Option<String>, ChainError> {
        self.api().await?.block_hash(number).await
    }

    async fn timestamp_ms(&self, number: u64) -> Result<u64, ChainError> {
        self.api().await?.timestamp_ms(number).await
    }

    async fn events(&self, number: u64) -> Result<Vec<RawEvent>, ChainError> {
        self.api().await?.events(number).await
    }

    async fn active_era(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.active_era(number).await
    }

    async fn current_era(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.current_era(number).await
    }

    async fn validator_count(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.validator_count(number).await
    }

    async fn counter_for_validators(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.counter_for_validators(number).await
    }

    async fn counter_for_nominators(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.counter_for_nominators(number).await
    }

    async fn electable_stashes(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.electable_stashes(number).await
    }

    async fn election_round(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.api().await?.election_round(number).await
    }

    async fn minimum_election_score(
        &self,
        number: u64,
    ) -> Result<Option<ScoreTriple>, ChainError> {
        self.api().await?.minimum_election_score(number).await
    }

    async fn queued_solution_score(
        &self,
        number: u64,
    ) -> Result<Option<ScoreTriple>, ChainError> {
        self.api().await?.queued_solution_score(number).await
    }

    async fn sorted_scores(
        &self,
        number: u64,
        round: u64,
    ) -> Result<Option<JsonValue>, ChainError> {
        self.api().await?.sorted_scores(number, round).await
    }

    /// An observed disconnect retires the current connection and walks the
    /// pool again after the short reconnect delay.
    async fn on_disconnected(&self) {
        if let Err(e) = self.reconnect().await {
            tracing::warn!(chain = %self.chain, error = %e, "reconnect after disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(urls: &[&str]) -> EndpointManager {
        let (_tx, rx) = watch::channel(false);
        manager_with_shutdown(urls, rx)
    }

    fn manager_with_shutdown(urls: &[&str], shutdown: watch::Receiver<bool>) -> EndpointManager {
        EndpointManager::new(
            ChainTag::Relay,
            urls.iter().map(|u| u.to_string()).collect(),
            RpcConfig::default(),
            0,
            shutdown,
        )
    }

    #[test]
    fn test_pick_advances_round_robin() {
        let manager = manager(&["ws://a", "ws://b", "ws://c"]);
        assert_eq!(manager.pick().as_deref(), Some("ws://a"));
        assert_eq!(manager.pick().as_deref(), Some("ws://b"));
        assert_eq!(manager.pick().as_deref(), Some("ws://c"));
        assert_eq!(manager.pick().as_deref(), Some("ws://a"));
    }

    #[test]
    fn test_pick_skips_unhealthy_endpoint() {
        let manager = manager(&["ws://a", "ws://b"]);
        for _ in 0..MAX_FAIL {
            manager.record_failure("ws://a");
        }
        assert_eq!(manager.pick().as_deref(), Some("ws://b"));
        assert_eq!(manager.pick().as_deref(), Some("ws://b"));
    }

    #[test]
    fn test_all_unhealthy_resets_pool() {
        let manager = manager(&["ws://a", "ws://b"]);
        for url in ["ws://a", "ws://b"] {
            for _ in 0..MAX_FAIL {
                manager.record_failure(url);
            }
        }
        // Everything is out of rotation, so the pool resets and keeps going.
        let picked = manager.pick();
        assert!(picked.is_some());
        let pool = manager.lock_pool();
        assert!(pool.endpoints.iter().all(|e| e.healthy));
        assert!(pool.endpoints.iter().all(|e| e.consecutive_failures == 0));
    }

    #[test]
    fn test_success_resets_failure_counter() {
        let manager = manager(&["ws://a"]);
        manager.record_failure("ws://a");
        manager.record_failure("ws://a");
        manager.record_success("ws://a");
        let pool = manager.lock_pool();
        assert_eq!(pool.endpoints[0].consecutive_failures, 0);
        assert!(pool.endpoints[0].healthy);
    }

    #[test]
    fn test_cooldown_restores_eligibility() {
        let now = now_ms();
        let mut endpoint = EndpointState::new("ws://a".to_string());
        endpoint.consecutive_failures = MAX_FAIL;
        endpoint.last_attempt_ms = now;
        assert!(endpoint.eligible(now + COOLDOWN_MS));
        assert!(!endpoint.eligible(now + COOLDOWN_MS - 1));
    }

    #[tokio::test]
    async fn test_no_endpoints_is_an_error() {
        let manager = manager(&[]);
        let result = manager.connect().await;
        assert!(matches!(result, Err(EndpointError::NoEndpoints(_))));
    }

    #[tokio::test]
    async fn test_connect_cancelled_by_shutdown() {
        let (tx, rx) = watch::channel(false);
        let manager = manager_with_shutdown(&["ws://a"], rx);
        tx.send(true).ok();
        let result = manager.connect().await;
        assert!(matches!(result, Err(EndpointError::Cancelled)));
    }

    #[tokio::test]
    async fn test_not_connected_surfaces_chain_error() {
        let manager = manager(&["ws://a"]);
        let result = manager.finalized_head().await;
        assert!(matches!(result, Err(ChainError::NotConnected)));
    }
}
