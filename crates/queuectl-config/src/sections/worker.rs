// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Worker configuration section.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_COUNT: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfigLayer {
	pub poll_interval_ms: Option<u64>,
	pub count: Option<u32>,
}

impl WorkerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.poll_interval_ms.is_some() {
			self.poll_interval_ms = other.poll_interval_ms;
		}
		if other.count.is_some() {
			self.count = other.count;
		}
	}

	pub fn finalize(self) -> WorkerConfig {
		WorkerConfig {
			poll_interval_ms: self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
			count: self.count.unwrap_or(DEFAULT_COUNT),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerConfig {
	/// Pause between claim attempts while the backlog is empty.
	pub poll_interval_ms: u64,
	/// Workers started by `worker start` when `--count` is not given.
	pub count: u32,
}

impl WorkerConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
			count: DEFAULT_COUNT,
		}
	}
}
