// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{DbError, Result};

const JOB_COLUMNS: &str =
	"id, command, state, attempts, max_retries, last_error, next_run_at, created_at, updated_at";

type JobRow = (
	String,
	String,
	String,
	i64,
	i64,
	Option<String>,
	DateTime<Utc>,
	DateTime<Utc>,
	DateTime<Utc>,
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
	Pending,
	Processing,
	Completed,
	Dead,
}

impl JobState {
	pub const ALL: [JobState; 4] = [
		JobState::Pending,
		JobState::Processing,
		JobState::Completed,
		JobState::Dead,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			JobState::Pending => "pending",
			JobState::Processing => "processing",
			JobState::Completed => "completed",
			JobState::Dead => "dead",
		}
	}
}

impl std::fmt::Display for JobState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.pad(self.as_str())
	}
}

impl std::str::FromStr for JobState {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"pending" => Ok(JobState::Pending),
			"processing" => Ok(JobState::Processing),
			"completed" => Ok(JobState::Completed),
			"dead" => Ok(JobState::Dead),
			_ => Err(format!("unknown job state: {s}")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
	pub id: String,
	pub command: String,
	pub state: JobState,
	pub attempts: u32,
	pub max_retries: u32,
	pub last_error: Option<String>,
	pub next_run_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// The write a failed execution turns into. Computed by the retry policy,
/// applied by the store as a single UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTransition {
	Retry {
		attempts: u32,
		next_run_at: DateTime<Utc>,
	},
	Dead {
		attempts: u32,
	},
}

/// Fixed-width RFC 3339 so that text comparison in SQL matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn row_to_job(row: JobRow) -> Result<Job> {
	let (id, command, state, attempts, max_retries, last_error, next_run_at, created_at, updated_at) =
		row;
	Ok(Job {
		id,
		command,
		state: state.parse().map_err(|e: String| DbError::Internal(e))?,
		attempts: attempts as u32,
		max_retries: max_retries as u32,
		last_error,
		next_run_at,
		created_at,
		updated_at,
	})
}

#[derive(Clone)]
pub struct JobRepository {
	pool: SqlitePool,
}

impl JobRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, command))]
	pub async fn insert_job(&self, command: &str, max_retries: u32) -> Result<Job> {
		let id = uuid::Uuid::new_v4().to_string();
		let now = format_timestamp(Utc::now());

		let row = sqlx::query_as::<_, JobRow>(&format!(
			r#"
            INSERT INTO jobs (id, command, state, attempts, max_retries, next_run_at, created_at, updated_at)
            VALUES (?, ?, 'pending', 0, ?, ?, ?, ?)
            RETURNING {JOB_COLUMNS}
            "#
		))
		.bind(&id)
		.bind(command)
		.bind(max_retries as i64)
		.bind(&now)
		.bind(&now)
		.bind(&now)
		.fetch_one(&self.pool)
		.await?;

		row_to_job(row)
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
		let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
			.bind(id)
			.fetch_optional(&self.pool)
			.await?;

		row.map(row_to_job).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
		let state = state.map(|s| s.as_str());
		let rows = sqlx::query_as::<_, JobRow>(&format!(
			r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE (? IS NULL OR state = ?)
            ORDER BY created_at ASC, rowid ASC
            "#
		))
		.bind(state)
		.bind(state)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(row_to_job).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_by_state(&self) -> Result<Vec<(JobState, u64)>> {
		let rows = sqlx::query_as::<_, (String, i64)>(
			"SELECT state, COUNT(*) FROM jobs GROUP BY state ORDER BY state",
		)
		.fetch_all(&self.pool)
		.await?;

		rows
			.into_iter()
			.map(|(state, count)| {
				let state = state.parse().map_err(|e: String| DbError::Internal(e))?;
				Ok((state, count as u64))
			})
			.collect()
	}

	/// Take the oldest eligible pending job and mark it processing.
	///
	/// Selection and transition happen in one UPDATE statement. SQLite takes
	/// the write lock before the sub-select runs, so two callers can never
	/// pick the same row; the loser of the race sees the next job or none.
	#[tracing::instrument(skip(self))]
	pub async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Job>> {
		let now = format_timestamp(now);
		let row = sqlx::query_as::<_, JobRow>(&format!(
			r#"
            UPDATE jobs
            SET state = 'processing', updated_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE state = 'pending' AND next_run_at <= ?
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            AND state = 'pending'
            RETURNING {JOB_COLUMNS}
            "#
		))
		.bind(&now)
		.bind(&now)
		.fetch_optional(&self.pool)
		.await?;

		row.map(row_to_job).transpose()
	}

	/// Returns false when the job is unknown or not processing.
	#[tracing::instrument(skip(self))]
	pub async fn mark_completed(&self, id: &str) -> Result<bool> {
		let now = format_timestamp(Utc::now());
		let result = sqlx::query(
			"UPDATE jobs SET state = 'completed', updated_at = ? WHERE id = ? AND state = 'processing'",
		)
		.bind(&now)
		.bind(id)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self, error))]
	pub async fn record_failure(
		&self,
		id: &str,
		error: &str,
		transition: &FailureTransition,
	) -> Result<bool> {
		let now = format_timestamp(Utc::now());
		let result = match *transition {
			FailureTransition::Retry {
				attempts,
				next_run_at,
			} => {
				sqlx::query(
					r#"
                    UPDATE jobs
                    SET state = 'pending',
                        last_error = ?,
                        attempts = ?,
                        next_run_at = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
				)
				.bind(error)
				.bind(attempts as i64)
				.bind(format_timestamp(next_run_at))
				.bind(&now)
				.bind(id)
				.execute(&self.pool)
				.await?
			}
			FailureTransition::Dead { attempts } => {
				sqlx::query(
					r#"
                    UPDATE jobs
                    SET state = 'dead',
                        last_error = ?,
                        attempts = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
				)
				.bind(error)
				.bind(attempts as i64)
				.bind(&now)
				.bind(id)
				.execute(&self.pool)
				.await?
			}
		};

		Ok(result.rows_affected() > 0)
	}

	/// Move a dead job back to pending with a fresh retry budget.
	/// Returns false when the job is unknown or not dead.
	#[tracing::instrument(skip(self))]
	pub async fn revive_dead(&self, id: &str) -> Result<bool> {
		let now = format_timestamp(Utc::now());
		let result = sqlx::query(
			r#"
            UPDATE jobs
            SET state = 'pending', attempts = 0, next_run_at = ?, updated_at = ?
            WHERE id = ? AND state = 'dead'
            "#,
		)
		.bind(&now)
		.bind(&now)
		.bind(id)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}
}

#[async_trait]
pub trait JobStore: Send + Sync {
	async fn insert_job(&self, command: &str, max_retries: u32) -> Result<Job>;
	async fn get_job(&self, id: &str) -> Result<Option<Job>>;
	async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>>;
	async fn count_by_state(&self) -> Result<Vec<(JobState, u64)>>;
	async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Job>>;
	async fn mark_completed(&self, id: &str) -> Result<bool>;
	async fn record_failure(
		&self,
		id: &str,
		error: &str,
		transition: &FailureTransition,
	) -> Result<bool>;
	async fn revive_dead(&self, id: &str) -> Result<bool>;
}

#[async_trait]
impl JobStore for JobRepository {
	async fn insert_job(&self, command: &str, max_retries: u32) -> Result<Job> {
		self.insert_job(command, max_retries).await
	}

	async fn get_job(&self, id: &str) -> Result<Option<Job>> {
		self.get_job(id).await
	}

	async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
		self.list_jobs(state).await
	}

	async fn count_by_state(&self) -> Result<Vec<(JobState, u64)>> {
		self.count_by_state().await
	}

	async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<Job>> {
		self.claim_next(now).await
	}

	async fn mark_completed(&self, id: &str) -> Result<bool> {
		self.mark_completed(id).await
	}

	async fn record_failure(
		&self,
		id: &str,
		error: &str,
		transition: &FailureTransition,
	) -> Result<bool> {
		self.record_failure(id, error, transition).await
	}

	async fn revive_dead(&self, id: &str) -> Result<bool> {
		self.revive_dead(id).await
	}
}
