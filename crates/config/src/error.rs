use crate::chain::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration from environment: {0}")]
    EnvError(#[from] envy::Error),

    #[error(transparent)]
    NetworkError(#[from] NetworkError),

    #[error("Invalid configuration value: {0}")]
    ValidateError(String),
}
