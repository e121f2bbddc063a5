// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tracing initialization: console output (plain or JSON) with an optional
//! size-rotated log file.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use staking_indexer_config::LogConfig;
use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level '{level}': {source}")]
    InvalidLogLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Failed to create log directory or file appender: {0}")]
    IoError(#[from] std::io::Error),
}

/// Initialize tracing from the log configuration.
///
/// Returns the worker guard of the file appender when file output is
/// enabled; the caller keeps it alive for the lifetime of the process so
/// buffered log lines are flushed on shutdown.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter =
        EnvFilter::try_new(config.level.as_str()).map_err(|source| LoggingError::InvalidLogLevel {
            level: config.level.clone(),
            source,
        })?;

    let file_writer = if config.write {
        let path = PathBuf::from(&config.write_path);
        std::fs::create_dir_all(&path)?;
        let appender = BasicRollingFileAppender::new(
            path.join("indexer.log"),
            RollingConditionBasic::new().max_size(config.write_max_file_size),
            config.write_max_files,
        )?;
        Some(tracing_appender::non_blocking(appender))
    } else {
        None
    };

    let ansi = !config.strip_ansi;
    let registry = tracing_subscriber::registry().with(filter);

    match (config.json, file_writer) {
        (true, Some((writer, guard))) => {
            registry
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        (true, None) => {
            registry.with(fmt::layer().json()).init();
            Ok(None)
        }
        (false, Some((writer, guard))) => {
            registry
                .with(fmt::layer().with_ansi(ansi))
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        (false, None) => {
            registry.with(fmt::layer().with_ansi(ansi)).init();
            Ok(None)
        }
    }
}
