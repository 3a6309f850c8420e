// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for queuectl.
//!
//! Two relations live here: `jobs`, the durable backlog with its atomic
//! claim, and `config`, the key/value settings snapshotted at enqueue time.

pub mod config;
pub mod error;
pub mod job;
pub mod migrations;
pub mod pool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ConfigRepository, ConfigStore};
pub use error::{DbError, Result};
pub use job::{format_timestamp, FailureTransition, Job, JobRepository, JobState, JobStore};
pub use migrations::run_migrations;
pub use pool::create_pool;
