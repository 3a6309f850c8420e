// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Serialize;

pub use queuectl_db::{Job, JobState};

/// What a recorded failure did to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOutcome {
	Retry,
	Dead,
}

impl FailureOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			FailureOutcome::Retry => "retry",
			FailureOutcome::Dead => "dead",
		}
	}
}

impl std::fmt::Display for FailureOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.pad(self.as_str())
	}
}

/// Result of asking to move a job out of the dead-letter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviveOutcome {
	Revived,
	/// The id is unknown or the job is not dead; nothing changed.
	NotFound,
}

/// Job counts for one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateCount {
	pub state: JobState,
	pub count: u64,
}
