mod chain;
mod error;
mod log;

pub use chain::{ChainLayer, Network, NetworkError};
pub use error::ConfigError;
pub use log::{LogConfig, LogError};

use serde::Deserialize;
use std::path::PathBuf;

/// Flat structure for loading from environment variables.
/// This works better with envy than nested structs.
#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default)]
    chain: Network,

    #[serde(default = "default_sync_blocks")]
    sync_blocks: u64,

    #[serde(default = "default_max_eras")]
    max_eras: u64,

    #[serde(default)]
    custom_rpc_endpoint: Option<String>,

    #[serde(default = "default_database_path")]
    database_path: String,

    #[serde(default = "default_log_level")]
    log_level: String,

    #[serde(default = "default_log_json")]
    log_json: bool,

    #[serde(default = "default_log_strip_ansi")]
    log_strip_ansi: bool,

    #[serde(default = "default_log_write")]
    log_write: bool,

    #[serde(default = "default_log_write_path")]
    log_write_path: String,

    #[serde(default = "default_log_write_max_file_size")]
    log_write_max_file_size: u64,

    #[serde(default = "default_log_write_max_files")]
    log_write_max_files: usize,

    #[serde(default = "default_rpc_connect_timeout_secs")]
    rpc_connect_timeout_secs: u64,

    #[serde(default = "default_rpc_request_timeout_ms")]
    rpc_request_timeout_ms: u64,

    #[serde(default = "default_rpc_reconnect_initial_delay_ms")]
    rpc_reconnect_initial_delay_ms: u64,

    #[serde(default = "default_rpc_reconnect_max_delay_ms")]
    rpc_reconnect_max_delay_ms: u64,
}

fn default_sync_blocks() -> u64 {
    600
}

fn default_max_eras() -> u64 {
    100
}

fn default_database_path() -> String {
    "./data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    false
}

fn default_log_strip_ansi() -> bool {
    false
}

fn default_log_write() -> bool {
    false
}

fn default_log_write_path() -> String {
    "./logs".to_string()
}

fn default_log_write_max_file_size() -> u64 {
    5_242_880 // 5MB
}

fn default_log_write_max_files() -> usize {
    5
}

fn default_rpc_connect_timeout_secs() -> u64 {
    30
}

fn default_rpc_request_timeout_ms() -> u64 {
    30_000
}

fn default_rpc_reconnect_initial_delay_ms() -> u64 {
    100
}

fn default_rpc_reconnect_max_delay_ms() -> u64 {
    10_000
}

/// RPC client timing configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Hard timeout for one connect attempt against one endpoint.
    pub connect_timeout_secs: u64,
    /// Per-request timeout inherited by every RPC call.
    pub request_timeout_ms: u64,
    /// Initial delay of the exponential reconnect backoff.
    pub reconnect_initial_delay_ms: u64,
    /// Upper bound of the exponential reconnect backoff.
    pub reconnect_max_delay_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_rpc_connect_timeout_secs(),
            request_timeout_ms: default_rpc_request_timeout_ms(),
            reconnect_initial_delay_ms: default_rpc_reconnect_initial_delay_ms(),
            reconnect_max_delay_ms: default_rpc_reconnect_max_delay_ms(),
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Network whose Relay Chain / Asset Hub pair is indexed.
    pub network: Network,
    /// Number of recent blocks to backfill on startup.
    pub sync_blocks: u64,
    /// Era retention cap; older eras are pruned.
    pub max_eras: u64,
    /// Optional override replacing the Relay Chain endpoint list.
    pub custom_rpc_endpoint: Option<String>,
    /// Directory holding the per-network database file.
    pub database_path: PathBuf,
    pub log: LogConfig,
    pub rpc: RpcConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            sync_blocks: default_sync_blocks(),
            max_eras: default_max_eras(),
            custom_rpc_endpoint: None,
            database_path: PathBuf::from(default_database_path()),
            log: LogConfig::default(),
            rpc: RpcConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Load configuration from environment variables.
    ///
    /// Looks for:
    /// - CHAIN (polkadot | kusama | westend)
    /// - SYNC_BLOCKS
    /// - MAX_ERAS
    /// - CUSTOM_RPC_ENDPOINT
    /// - DATABASE_PATH
    /// - LOG_LEVEL / LOG_JSON / LOG_STRIP_ANSI / LOG_WRITE / LOG_WRITE_PATH
    ///   / LOG_WRITE_MAX_FILE_SIZE / LOG_WRITE_MAX_FILES
    /// - RPC_CONNECT_TIMEOUT_SECS / RPC_REQUEST_TIMEOUT_MS
    ///   / RPC_RECONNECT_INITIAL_DELAY_MS / RPC_RECONNECT_MAX_DELAY_MS
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_config = envy::from_env::<EnvConfig>()?;

        let config = Self {
            network: env_config.chain,
            sync_blocks: env_config.sync_blocks,
            max_eras: env_config.max_eras,
            custom_rpc_endpoint: env_config.custom_rpc_endpoint,
            database_path: PathBuf::from(env_config.database_path),
            log: LogConfig {
                level: env_config.log_level,
                json: env_config.log_json,
                strip_ansi: env_config.log_strip_ansi,
                write: env_config.log_write,
                write_path: env_config.log_write_path,
                write_max_file_size: env_config.log_write_max_file_size,
                write_max_files: env_config.log_write_max_files,
            },
            rpc: RpcConfig {
                connect_timeout_secs: env_config.rpc_connect_timeout_secs,
                request_timeout_ms: env_config.rpc_request_timeout_ms,
                reconnect_initial_delay_ms: env_config.rpc_reconnect_initial_delay_ms,
                reconnect_max_delay_ms: env_config.rpc_reconnect_max_delay_ms,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync_blocks == 0 {
            return Err(ConfigError::ValidateError(
                "SYNC_BLOCKS must be at least 1".to_string(),
            ));
        }

        if self.max_eras == 0 {
            return Err(ConfigError::ValidateError(
                "MAX_ERAS must be at least 1".to_string(),
            ));
        }

        if let Some(endpoint) = &self.custom_rpc_endpoint {
            validate_ws_url(endpoint)?;
        }

        if self.rpc.connect_timeout_secs == 0 {
            return Err(ConfigError::ValidateError(
                "RPC_CONNECT_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        self.log
            .validate()
            .map_err(|e| ConfigError::ValidateError(e.to_string()))?;

        Ok(())
    }

    /// Relay Chain endpoint list. `CUSTOM_RPC_ENDPOINT` replaces the static
    /// list with a singleton when set.
    pub fn relay_endpoints(&self) -> Vec<String> {
        if let Some(endpoint) = &self.custom_rpc_endpoint {
            return vec![endpoint.clone()];
        }
        self.network.default_endpoints(ChainLayer::Relay)
    }

    /// Asset Hub endpoint list.
    pub fn asset_hub_endpoints(&self) -> Vec<String> {
        self.network.default_endpoints(ChainLayer::AssetHub)
    }

    /// Full path of this network's database file.
    pub fn database_file(&self) -> PathBuf {
        self.database_path.join(self.network.db_file_name())
    }
}

fn validate_ws_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::ValidateError(format!("Invalid RPC URL '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        scheme => Err(ConfigError::ValidateError(format!(
            "Invalid URL scheme '{}'. Must be ws:// or wss://",
            scheme
        ))),
    }
}
