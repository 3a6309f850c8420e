// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Queue engine for queuectl.
//!
//! This crate ties the SQLite job store to the job lifecycle: enqueueing with
//! a snapshot of the retry limit, the atomic claim, exponential backoff with
//! dead-lettering, and the worker loop that drives execution.

pub mod backoff;
pub mod cancel;
pub mod error;
pub mod executor;
pub mod queue;
pub mod types;
pub mod worker;

pub use backoff::{backoff_delay, decide_failure};
pub use cancel::CancellationToken;
pub use error::{QueueError, Result};
pub use executor::{
	CommandExecutor, ExecutionFailure, ExecutionOutput, ExecutionResult, ShellExecutor,
};
pub use queue::{JobQueue, DEFAULT_MAX_RETRIES, MAX_RETRIES_KEY};
pub use types::{FailureOutcome, Job, JobState, ReviveOutcome, StateCount};
pub use worker::{Tick, Worker, DEFAULT_POLL_INTERVAL};
