// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use queuectl_db::{ConfigRepository, ConfigStore, FailureTransition, JobRepository, JobStore};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::backoff::decide_failure;
use crate::error::{QueueError, Result};
use crate::types::{FailureOutcome, Job, JobState, ReviveOutcome, StateCount};

pub const MAX_RETRIES_KEY: &str = "max_retries";
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The queue engine's public surface. Cheap to clone; every clone shares the
/// same stores.
#[derive(Clone)]
pub struct JobQueue {
	jobs: Arc<dyn JobStore>,
	config: Arc<dyn ConfigStore>,
}

impl JobQueue {
	pub fn new(jobs: Arc<dyn JobStore>, config: Arc<dyn ConfigStore>) -> Self {
		Self { jobs, config }
	}

	pub fn from_pool(pool: SqlitePool) -> Self {
		Self::new(
			Arc::new(JobRepository::new(pool.clone())),
			Arc::new(ConfigRepository::new(pool)),
		)
	}

	/// Create a pending job, snapshotting the current `max_retries` setting.
	#[instrument(skip(self, command))]
	pub async fn enqueue(&self, command: &str) -> Result<Job> {
		if command.trim().is_empty() {
			return Err(QueueError::Validation(
				"command must not be empty".to_string(),
			));
		}

		let max_retries = self.max_retries().await?;
		let job = self.jobs.insert_job(command, max_retries).await?;
		info!(job_id = %job.id, max_retries, "Job enqueued");
		Ok(job)
	}

	async fn max_retries(&self) -> Result<u32> {
		let value = self
			.config
			.get(MAX_RETRIES_KEY)
			.await
			.map_err(|source| QueueError::ConfigRead {
				key: MAX_RETRIES_KEY.to_string(),
				source,
			})?;

		match value {
			None => Ok(DEFAULT_MAX_RETRIES),
			Some(value) => parse_max_retries(&value).ok_or_else(|| QueueError::InvalidConfig {
				key: MAX_RETRIES_KEY.to_string(),
				value,
			}),
		}
	}

	pub async fn claim_next(&self) -> Result<Option<Job>> {
		self.claim_next_at(Utc::now()).await
	}

	/// Claim the oldest job whose `next_run_at` is at or before `now`.
	#[instrument(skip(self))]
	pub async fn claim_next_at(&self, now: DateTime<Utc>) -> Result<Option<Job>> {
		let job = self.jobs.claim_next(now).await?;
		if let Some(job) = &job {
			debug!(job_id = %job.id, attempts = job.attempts, "Job claimed");
		}
		Ok(job)
	}

	/// Mark a claimed job completed. Unknown or non-processing ids are ignored.
	#[instrument(skip(self))]
	pub async fn complete(&self, id: &str) -> Result<()> {
		if !self.jobs.mark_completed(id).await? {
			debug!(job_id = %id, "complete had no effect");
		}
		Ok(())
	}

	/// Apply the retry policy to a failed execution.
	///
	/// `attempts` and `max_retries` are the values on the job as claimed; they
	/// are not re-read from the store.
	#[instrument(skip(self, error))]
	pub async fn record_failure(
		&self,
		id: &str,
		error: &str,
		attempts: u32,
		max_retries: u32,
	) -> Result<FailureOutcome> {
		let transition = decide_failure(attempts, max_retries, Utc::now());
		if !self.jobs.record_failure(id, error, &transition).await? {
			warn!(job_id = %id, "failure recorded for unknown job");
		}

		Ok(match transition {
			FailureTransition::Retry { .. } => FailureOutcome::Retry,
			FailureTransition::Dead { .. } => FailureOutcome::Dead,
		})
	}

	pub async fn list_dead(&self) -> Result<Vec<Job>> {
		self.list_jobs(Some(JobState::Dead)).await
	}

	#[instrument(skip(self))]
	pub async fn revive_from_dead(&self, id: &str) -> Result<ReviveOutcome> {
		if self.jobs.revive_dead(id).await? {
			info!(job_id = %id, "Job moved from dead to pending");
			Ok(ReviveOutcome::Revived)
		} else {
			Ok(ReviveOutcome::NotFound)
		}
	}

	pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
		Ok(self.jobs.get_job(id).await?)
	}

	pub async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
		Ok(self.jobs.list_jobs(state).await?)
	}

	/// Job counts per state. States with no jobs are omitted.
	pub async fn status(&self) -> Result<Vec<StateCount>> {
		let counts = self.jobs.count_by_state().await?;
		Ok(
			counts
				.into_iter()
				.map(|(state, count)| StateCount { state, count })
				.collect(),
		)
	}

	#[instrument(skip(self, value))]
	pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
		if key.trim().is_empty() {
			return Err(QueueError::Validation(
				"config key must not be empty".to_string(),
			));
		}
		if key == MAX_RETRIES_KEY && parse_max_retries(value).is_none() {
			return Err(QueueError::Validation(format!(
				"{MAX_RETRIES_KEY} must be a non-negative integer, got {value:?}"
			)));
		}

		self.config.set(key, value).await?;
		info!(key, value, "Config updated");
		Ok(())
	}

	pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
		Ok(self.config.get(key).await?)
	}
}

fn parse_max_retries(value: &str) -> Option<u32> {
	value.trim().parse().ok()
}
