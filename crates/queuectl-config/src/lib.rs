// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process configuration for queuectl.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`QUEUECTL_*`)
//!
//! Runtime job settings such as `max_retries` live in the database, not here.

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::QueueConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;
use tracing::{debug, info};

/// Fully resolved process configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueConfig {
	pub database: DatabaseConfig,
	pub worker: WorkerConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`QUEUECTL_*`)
/// 2. Config file (`config_path`, or `/etc/queuectl/queuectl.toml`)
/// 3. Built-in defaults
pub fn load_config(config_path: Option<PathBuf>) -> Result<QueueConfig, ConfigError> {
	let toml = match config_path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};
	let mut sources: Vec<Box<dyn ConfigSource>> =
		vec![Box::new(DefaultsSource), Box::new(toml), Box::new(EnvSource)];

	sources.sort_by_key(|s| s.precedence());

	let mut merged = QueueConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: QueueConfigLayer) -> Result<QueueConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let worker = layer.worker.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&database, &worker)?;

	info!(
		database = %database.url,
		busy_timeout_ms = database.busy_timeout_ms,
		poll_interval_ms = worker.poll_interval_ms,
		worker_count = worker.count,
		"Configuration loaded"
	);

	Ok(QueueConfig {
		database,
		worker,
		logging,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(database: &DatabaseConfig, worker: &WorkerConfig) -> Result<(), ConfigError> {
	if database.url.trim().is_empty() {
		return Err(ConfigError::Validation(
			"database url must not be empty".to_string(),
		));
	}
	if worker.poll_interval_ms == 0 {
		return Err(ConfigError::Validation(
			"worker poll_interval_ms must be greater than zero".to_string(),
		));
	}
	if worker.count == 0 {
		return Err(ConfigError::Validation(
			"worker count must be at least 1".to_string(),
		));
	}

	Ok(())
}
