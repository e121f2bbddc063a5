// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log level '{level}'. Must be one of: {valid_levels}")]
    InvalidLogLevel { level: String, valid_levels: String },

    #[error("Log write max file size must be at least 1KB (1024 bytes)")]
    MaxFileSizeTooSmall,

    #[error("Log write max files must be at least 1")]
    MaxFilesZero,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log Level
    ///
    /// Env: LOG_LEVEL
    /// Valid values: trace, debug, info, warn, error
    /// Default: info
    pub level: String,

    /// Output logs in JSON format
    ///
    /// Env: LOG_JSON
    /// Default: false
    pub json: bool,

    /// Strip ANSI color codes from logs
    ///
    /// Env: LOG_STRIP_ANSI
    /// Default: false
    pub strip_ansi: bool,

    /// Whether to write logs to a log file (indexer.log)
    ///
    /// Env: LOG_WRITE
    /// Default: false
    pub write: bool,

    /// Path to write the log files
    ///
    /// Env: LOG_WRITE_PATH
    /// Default: ./logs
    pub write_path: String,

    /// The max size the log file should not exceed (in bytes)
    ///
    /// Env: LOG_WRITE_MAX_FILE_SIZE
    /// Default: 5242880 (5MB)
    pub write_max_file_size: u64,

    /// The max number of log files to keep
    ///
    /// Env: LOG_WRITE_MAX_FILES
    /// Default: 5
    pub write_max_files: usize,
}

impl LogConfig {
    pub(crate) fn validate(&self) -> Result<(), LogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];

        if !valid_levels.contains(&self.level.as_str()) {
            return Err(LogError::InvalidLogLevel {
                level: self.level.clone(),
                valid_levels: valid_levels.join(", "),
            });
        }

        if self.write_max_file_size < 1024 {
            return Err(LogError::MaxFileSizeTooSmall);
        }

        if self.write_max_files == 0 {
            return Err(LogError::MaxFilesZero);
        }

        Ok(())
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            strip_ansi: false,
            write: false,
            write_path: "./logs".to_string(),
            write_max_file_size: 5_242_880,
            write_max_files: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert!(!config.write);
        assert_eq!(config.write_path, "./logs");
        assert_eq!(config.write_max_file_size, 5_242_880);
        assert_eq!(config.write_max_files, 5);
    }

    #[test]
    fn test_validate_valid_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let config = LogConfig {
                level: level.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "Level {} should be valid", level);
        }
    }

    #[test]
    fn test_validate_invalid_level() {
        let config = LogConfig {
            level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_max_file_size_too_small() {
        let config = LogConfig {
            write_max_file_size: 512,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_max_files_zero() {
        let config = LogConfig {
            write_max_files: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
