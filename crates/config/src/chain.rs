// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Network selection and the static per-network RPC endpoint lists.
//!
//! The indexer follows two chains of one network: the Relay Chain layer and
//! the Asset Hub layer. Endpoints are ordered by preference; the endpoint
//! manager walks the list and fails over on its own.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Unknown network '{0}'. Must be one of: polkadot, kusama, westend")]
    Unknown(String),
}

/// The network whose Relay Chain + Asset Hub pair is being indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Polkadot,
    Kusama,
    Westend,
}

/// Which of the two chains of a network an endpoint list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLayer {
    Relay,
    AssetHub,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Polkadot => "polkadot",
            Network::Kusama => "kusama",
            Network::Westend => "westend",
        }
    }

    /// SS58 address format prefix used when rendering account ids.
    pub fn ss58_prefix(&self) -> u16 {
        match self {
            Network::Polkadot => 0,
            Network::Kusama => 2,
            Network::Westend => 42,
        }
    }

    /// File name of the per-network database (one file per network).
    pub fn db_file_name(&self) -> String {
        format!("staking-index-{}.db", self.as_str())
    }

    /// Default RPC endpoints for one layer of this network.
    pub fn default_endpoints(&self, layer: ChainLayer) -> Vec<String> {
        let urls: &[&str] = match (self, layer) {
            (Network::Polkadot, ChainLayer::Relay) => &[
                "wss://rpc.ibp.network/polkadot",
                "wss://polkadot.dotters.network",
                "wss://polkadot-rpc.dwellir.com",
                "wss://rpc-polkadot.luckyfriday.io",
            ],
            (Network::Polkadot, ChainLayer::AssetHub) => &[
                "wss://sys.ibp.network/asset-hub-polkadot",
                "wss://asset-hub-polkadot.dotters.network",
                "wss://asset-hub-polkadot-rpc.dwellir.com",
                "wss://polkadot-asset-hub-rpc.polkadot.io",
            ],
            (Network::Kusama, ChainLayer::Relay) => &[
                "wss://rpc.ibp.network/kusama",
                "wss://kusama.dotters.network",
                "wss://kusama-rpc.dwellir.com",
                "wss://rpc-kusama.luckyfriday.io",
            ],
            (Network::Kusama, ChainLayer::AssetHub) => &[
                "wss://sys.ibp.network/asset-hub-kusama",
                "wss://asset-hub-kusama.dotters.network",
                "wss://asset-hub-kusama-rpc.dwellir.com",
                "wss://kusama-asset-hub-rpc.polkadot.io",
            ],
            (Network::Westend, ChainLayer::Relay) => &[
                "wss://westend-rpc.polkadot.io",
                "wss://westend.dotters.network",
                "wss://westend-rpc.dwellir.com",
            ],
            (Network::Westend, ChainLayer::AssetHub) => &[
                "wss://westend-asset-hub-rpc.polkadot.io",
                "wss://asset-hub-westend.dotters.network",
                "wss://asset-hub-westend-rpc.dwellir.com",
            ],
        };
        urls.iter().map(|url| url.to_string()).collect()
    }
}

impl FromStr for Network {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "polkadot" => Ok(Network::Polkadot),
            "kusama" => Ok(Network::Kusama),
            "westend" => Ok(Network::Westend),
            other => Err(NetworkError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_str() {
        assert_eq!("polkadot".parse::<Network>().unwrap(), Network::Polkadot);
        assert_eq!("Kusama".parse::<Network>().unwrap(), Network::Kusama);
        assert_eq!("WESTEND".parse::<Network>().unwrap(), Network::Westend);
        assert!("rococo".parse::<Network>().is_err());
    }

    #[test]
    fn test_ss58_prefixes() {
        assert_eq!(Network::Polkadot.ss58_prefix(), 0);
        assert_eq!(Network::Kusama.ss58_prefix(), 2);
        assert_eq!(Network::Westend.ss58_prefix(), 42);
    }

    #[test]
    fn test_db_file_name_is_per_network() {
        assert_eq!(Network::Polkadot.db_file_name(), "staking-index-polkadot.db");
        assert_ne!(
            Network::Kusama.db_file_name(),
            Network::Westend.db_file_name()
        );
    }

    #[test]
    fn test_every_network_has_endpoints_for_both_layers() {
        for network in [Network::Polkadot, Network::Kusama, Network::Westend] {
            for layer in [ChainLayer::Relay, ChainLayer::AssetHub] {
                let endpoints = network.default_endpoints(layer);
                assert!(!endpoints.is_empty());
                for url in &endpoints {
                    assert!(url.starts_with("wss://"), "expected wss url, got {url}");
                }
            }
        }
    }
}
