// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry and dead-letter policy for failed executions.

use chrono::{DateTime, Duration, Utc};
use queuectl_db::FailureTransition;

const BACKOFF_BASE: i64 = 2;
const MAX_BACKOFF_EXPONENT: u32 = 32;

/// Delay before a job that has now failed `attempts` times becomes eligible
/// again: `2^attempts` seconds.
pub fn backoff_delay(attempts: u32) -> Duration {
	Duration::seconds(BACKOFF_BASE.pow(attempts.min(MAX_BACKOFF_EXPONENT)))
}

/// Decide what a failure does to a job, given the attempt count and retry
/// limit the caller observed when it claimed the job.
pub fn decide_failure(attempts: u32, max_retries: u32, now: DateTime<Utc>) -> FailureTransition {
	let attempts = attempts.saturating_add(1);
	if attempts >= max_retries {
		FailureTransition::Dead { attempts }
	} else {
		FailureTransition::Retry {
			attempts,
			next_run_at: now + backoff_delay(attempts),
		}
	}
}
