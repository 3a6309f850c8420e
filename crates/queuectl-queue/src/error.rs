// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use queuectl_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("Validation error: {0}")]
	Validation(String),

	#[error("Failed to read config key {key}: {source}")]
	ConfigRead {
		key: String,
		#[source]
		source: DbError,
	},

	#[error("Invalid value for config key {key}: {value:?}")]
	InvalidConfig { key: String, value: String },

	#[error("Repository error: {0}")]
	Repository(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, QueueError>;
