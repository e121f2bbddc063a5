// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! The chain access capability.
//!
//! [`ChainApi`] is the opaque interface the rest of the indexer programs
//! against: finalized-head tracking plus a small set of named storage
//! queries, all keyed by block number. [`SubxtChain`] implements it over a
//! reconnecting WebSocket JSON-RPC connection; tests implement it from
//! in-memory maps.

use crate::events::{RawEvent, decode_event_records};
use crate::types::ScoreTriple;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use parity_scale_codec::{Decode, DecodeAll};
use serde_json::{Value as JsonValue, json};
use sp_core::crypto::{AccountId32, Ss58Codec};
use staking_indexer_config::RpcConfig;
use std::time::Duration;
use subxt::config::RpcConfigFor;
use subxt::error::OnlineClientAtBlockError;
use subxt::{OnlineClient, OnlineClientAtBlock, SubstrateConfig};
use subxt_rpcs::client::reconnecting_rpc_client::{
    ExponentialBackoff, RpcClient as ReconnectingRpcClient,
};
use subxt_rpcs::{LegacyRpcMethods, RpcClient, rpc_params};
use thiserror::Error;

/// Type alias for LegacyRpcMethods with the correct RpcConfig wrapper.
pub type LegacyRpc = LegacyRpcMethods<RpcConfigFor<SubstrateConfig>>;

/// A client pinned to a specific block height.
pub type BlockClient = OnlineClientAtBlock<SubstrateConfig>;

/// Stream of finalized head heights.
pub type HeadStream = BoxStream<'static, Result<u64, ChainError>>;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc call failed: {0}")]
    Rpc(#[from] subxt_rpcs::Error),

    #[error("failed to pin client at block {number}: {source}")]
    AtBlock {
        number: u64,
        #[source]
        source: Box<OnlineClientAtBlockError>,
    },

    #[error("failed to initialize online client for {url}: {message}")]
    ClientInit { url: String, message: String },

    #[error("header field '{0}' missing or malformed")]
    HeaderField(&'static str),

    #[error("failed to fetch or decode {0}")]
    Storage(&'static str),

    #[error("not connected to any endpoint")]
    NotConnected,
}

/// Everything the indexer may ask of a chain. Every operation can fail and
/// every failure is retryable; the named state queries return `None` for
/// values absent at that block.
#[async_trait]
pub trait ChainApi: Send + Sync + 'static {
    async fn finalized_head(&self) -> Result<u64, ChainError>;

    async fn subscribe_finalized_heads(&self) -> Result<HeadStream, ChainError>;

    async fn block_hash(&self, number: u64) -> Result<Option<String>, ChainError>;

    async fn timestamp_ms(&self, number: u64) -> Result<u64, ChainError>;

    async fn events(&self, number: u64) -> Result<Vec<RawEvent>, ChainError>;

    async fn active_era(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn current_era(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn validator_count(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn counter_for_validators(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn counter_for_nominators(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn electable_stashes(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn election_round(&self, number: u64) -> Result<Option<u64>, ChainError>;

    async fn minimum_election_score(&self, number: u64)
    -> Result<Option<ScoreTriple>, ChainError>;

    async fn queued_solution_score(&self, number: u64)
    -> Result<Option<ScoreTriple>, ChainError>;

    async fn sorted_scores(
        &self,
        number: u64,
        round: u64,
    ) -> Result<Option<JsonValue>, ChainError>;

    /// Callers report an observed disconnect (a dropped subscription or
    /// repeated transport failures) here. Implementations that manage
    /// multiple endpoints use it to fail over; the default does nothing.
    async fn on_disconnected(&self) {}
}

// ================================================================================================
// SCALE decode types
// ================================================================================================

/// Active era info structure from `Staking.ActiveEra`.
#[derive(Debug, Clone, Decode)]
struct ActiveEraInfo {
    index: u32,
    #[allow(dead_code)]
    start: Option<u64>,
}

/// Composite election score from the verifier/signed pallets.
#[derive(Debug, Clone, Decode)]
struct ScoreValue {
    minimal_stake: u128,
    sum_stake: u128,
    sum_stake_squared: u128,
}

impl ScoreValue {
    fn into_triple(self) -> ScoreTriple {
        ScoreTriple {
            minimal_stake: self.minimal_stake.to_string(),
            sum_stake: self.sum_stake.to_string(),
            sum_stake_squared: self.sum_stake_squared.to_string(),
        }
    }
}

fn decode_active_era(raw: &[u8]) -> Option<ActiveEraInfo> {
    // ActiveEra is Option<ActiveEraInfo { index, start }>; some runtimes
    // hand back the bare struct, others the Option wrapper. Full-input
    // decoding keeps the two cases apart.
    if let Ok(info) = ActiveEraInfo::decode_all(&mut &raw[..]) {
        return Some(info);
    }
    if raw.len() > 1
        && raw[0] == 1
        && let Ok(info) = ActiveEraInfo::decode_all(&mut &raw[1..])
    {
        return Some(info);
    }
    None
}

fn decode_option_u32(raw: &[u8]) -> Option<u32> {
    // Handle the Option wrapper first, then a bare u32.
    if !raw.is_empty()
        && raw[0] == 1
        && raw.len() >= 5
        && let Ok(value) = u32::decode_all(&mut &raw[1..])
    {
        return Some(value);
    }
    if let Ok(value) = u32::decode_all(&mut &raw[..]) {
        return Some(value);
    }
    None
}

fn decode_score(raw: &[u8]) -> Option<ScoreValue> {
    if let Ok(score) = ScoreValue::decode_all(&mut &raw[..]) {
        return Some(score);
    }
    if raw.len() > 1
        && raw[0] == 1
        && let Ok(score) = ScoreValue::decode_all(&mut &raw[1..])
    {
        return Some(score);
    }
    None
}

fn parse_header_number(header: &JsonValue) -> Result<u64, ChainError> {
    let number_hex = header
        .get("number")
        .and_then(|v| v.as_str())
        .ok_or(ChainError::HeaderField("number"))?;

    u64::from_str_radix(number_hex.trim_start_matches("0x"), 16)
        .map_err(|_| ChainError::HeaderField("number"))
}

// ================================================================================================
// Subxt-backed implementation
// ================================================================================================

/// A live connection to one node of one chain.
pub struct SubxtChain {
    url: String,
    client: OnlineClient<SubstrateConfig>,
    legacy_rpc: LegacyRpc,
    rpc_client: RpcClient,
    ss58_prefix: u16,
}

impl SubxtChain {
    /// Open a reconnecting WebSocket connection and set up the typed client.
    /// The reconnecting layer retries the *same* URL with exponential
    /// backoff; failing over to a different URL is the endpoint manager's
    /// job.
    pub async fn connect(
        url: &str,
        rpc: &RpcConfig,
        ss58_prefix: u16,
    ) -> Result<Self, ChainError> {
        let reconnecting_client = ReconnectingRpcClient::builder()
            .retry_policy(
                ExponentialBackoff::from_millis(rpc.reconnect_initial_delay_ms)
                    .max_delay(Duration::from_millis(rpc.reconnect_max_delay_ms)),
            )
            .request_timeout(Duration::from_millis(rpc.request_timeout_ms))
            .build(url)
            .await
            .map_err(|source| ChainError::Rpc(subxt_rpcs::Error::Client(Box::new(source))))?;

        let rpc_client = RpcClient::new(reconnecting_client);
        let legacy_rpc: LegacyRpc = LegacyRpcMethods::new(rpc_client.clone());

        let client =
            OnlineClient::from_rpc_client_with_config(SubstrateConfig::new(), rpc_client.clone())
                .await
                .map_err(|e| ChainError::ClientInit {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            url: url.to_string(),
            client,
            legacy_rpc,
            rpc_client,
            ss58_prefix,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn at(&self, number: u64) -> Result<BlockClient, ChainError> {
        self.client
            .at_block(number)
            .await
            .map_err(|e| ChainError::AtBlock {
                number,
                source: Box::new(e),
            })
    }

    async fn fetch_bytes(
        &self,
        at: &BlockClient,
        pallet: &'static str,
        entry: &'static str,
    ) -> Option<Vec<u8>> {
        let addr = subxt::dynamic::storage::<(), ()>(pallet, entry);
        let value = at.storage().fetch(addr, ()).await.ok()?;
        Some(value.into_bytes())
    }

    async fn fetch_u32(
        &self,
        number: u64,
        pallet: &'static str,
        entry: &'static str,
    ) -> Result<Option<u64>, ChainError> {
        let at = self.at(number).await?;
        let addr = subxt::dynamic::storage::<(), u32>(pallet, entry);
        match at.storage().fetch(addr, ()).await {
            Ok(value) => Ok(value.decode().ok().map(u64::from)),
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl ChainApi for SubxtChain {
    async fn finalized_head(&self) -> Result<u64, ChainError> {
        let finalized_hash = self.legacy_rpc.chain_get_finalized_head().await?;
        let finalized_hash_str = format!("0x{}", hex::encode(finalized_hash.0));

        let header_json: JsonValue = self
            .rpc_client
            .request("chain_getHeader", rpc_params![finalized_hash_str])
            .await?;

        parse_header_number(&header_json)
    }

    async fn subscribe_finalized_heads(&self) -> Result<HeadStream, ChainError> {
        let subscription = self
            .rpc_client
            .subscribe::<JsonValue>(
                "chain_subscribeFinalizedHeads",
                rpc_params![],
                "chain_unsubscribeFinalizedHeads",
            )
            .await?;

        let stream = subscription.map(|item| {
            let header = item.map_err(ChainError::from)?;
            parse_header_number(&header)
        });

        Ok(stream.boxed())
    }

    async fn block_hash(&self, number: u64) -> Result<Option<String>, ChainError> {
        let hash = self
            .legacy_rpc
            .chain_get_block_hash(Some(number.into()))
            .await?;

        Ok(hash.map(|h| format!("0x{}", hex::encode(h.0))))
    }

    async fn timestamp_ms(&self, number: u64) -> Result<u64, ChainError> {
        let at = self.at(number).await?;
        let addr = subxt::dynamic::storage::<(), u64>("Timestamp", "Now");
        let value = at
            .storage()
            .fetch(addr, ())
            .await
            .map_err(|_| ChainError::Storage("Timestamp.Now"))?;
        value.decode().map_err(|_| ChainError::Storage("Timestamp.Now"))
    }

    async fn events(&self, number: u64) -> Result<Vec<RawEvent>, ChainError> {
        let at = self.at(number).await?;
        let addr = subxt::dynamic::storage::<(), scale_value::Value>("System", "Events");
        let value = at
            .storage()
            .fetch(addr, ())
            .await
            .map_err(|_| ChainError::Storage("System.Events"))?;
        let decoded = value
            .decode()
            .map_err(|_| ChainError::Storage("System.Events"))?;
        Ok(decode_event_records(decoded))
    }

    async fn active_era(&self, number: u64) -> Result<Option<u64>, ChainError> {
        let at = self.at(number).await?;
        Ok(self
            .fetch_bytes(&at, "Staking", "ActiveEra")
            .await
            .and_then(|raw| decode_active_era(&raw))
            .map(|info| u64::from(info.index)))
    }

    async fn current_era(&self, number: u64) -> Result<Option<u64>, ChainError> {
        let at = self.at(number).await?;
        Ok(self
            .fetch_bytes(&at, "Staking", "CurrentEra")
            .await
            .and_then(|raw| decode_option_u32(&raw))
            .map(u64::from))
    }

    async fn validator_count(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.fetch_u32(number, "Staking", "ValidatorCount").await
    }

    async fn counter_for_validators(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.fetch_u32(number, "Staking", "CounterForValidators").await
    }

    async fn counter_for_nominators(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.fetch_u32(number, "Staking", "CounterForNominators").await
    }

    async fn electable_stashes(&self, number: u64) -> Result<Option<u64>, ChainError> {
        let at = self.at(number).await?;
        Ok(self
            .fetch_bytes(&at, "Staking", "ElectableStashes")
            .await
            .and_then(|raw| Vec::<[u8; 32]>::decode(&mut &raw[..]).ok())
            .map(|stashes| stashes.len() as u64))
    }

    async fn election_round(&self, number: u64) -> Result<Option<u64>, ChainError> {
        self.fetch_u32(number, "MultiBlockElection", "Round").await
    }

    async fn minimum_election_score(
        &self,
        number: u64,
    ) -> Result<Option<ScoreTriple>, ChainError> {
        let at = self.at(number).await?;
        Ok(self
            .fetch_bytes(&at, "MultiBlockElectionVerifier", "MinimumScore")
            .await
            .and_then(|raw| decode_score(&raw))
            .map(ScoreValue::into_triple))
    }

    async fn queued_solution_score(
        &self,
        number: u64,
    ) -> Result<Option<ScoreTriple>, ChainError> {
        let at = self.at(number).await?;
        Ok(self
            .fetch_bytes(&at, "MultiBlockElectionVerifier", "QueuedSolutionScore")
            .await
            .and_then(|raw| decode_score(&raw))
            .map(ScoreValue::into_triple))
    }

    async fn sorted_scores(
        &self,
        number: u64,
        round: u64,
    ) -> Result<Option<JsonValue>, ChainError> {
        let at = self.at(number).await?;
        let addr = subxt::dynamic::storage::<(u32,), ()>("MultiBlockElectionSigned", "SortedScores");
        let Ok(value) = at.storage().fetch(addr, (round as u32,)).await else {
            return Ok(None);
        };
        let raw = value.into_bytes();
        let Ok(entries) = Vec::<([u8; 32], ScoreValue)>::decode(&mut &raw[..]) else {
            return Ok(None);
        };

        let scores: Vec<JsonValue> = entries
            .into_iter()
            .map(|(who, score)| {
                json!({
                    "submitter": AccountId32::from(who)
                        .to_ss58check_with_version(self.ss58_prefix.into()),
                    "minimalStake": score.minimal_stake.to_string(),
                    "sumStake": score.sum_stake.to_string(),
                    "sumStakeSquared": score.sum_stake_squared.to_string(),
                })
            })
            .collect();

        Ok(Some(JsonValue::Array(scores)))
    }
}
