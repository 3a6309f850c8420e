// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::queue::JobQueue;
use crate::types::FailureOutcome;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a single pass of the worker loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
	/// No eligible job was waiting.
	Idle,
	Completed {
		job_id: String,
	},
	Failed {
		job_id: String,
		outcome: FailureOutcome,
	},
}

/// A sequential claim → execute → record loop. Workers never coordinate with
/// each other directly; the store's atomic claim keeps them apart.
pub struct Worker {
	id: String,
	queue: JobQueue,
	executor: Arc<dyn CommandExecutor>,
	poll_interval: Duration,
}

impl Worker {
	pub fn new(id: impl Into<String>, queue: JobQueue, executor: Arc<dyn CommandExecutor>) -> Self {
		Self {
			id: id.into(),
			queue,
			executor,
			poll_interval: DEFAULT_POLL_INTERVAL,
		}
	}

	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	/// Run until `shutdown` is cancelled.
	///
	/// Cancellation is only observed between iterations: a command that is
	/// already executing runs to completion and its outcome is recorded.
	#[instrument(skip(self, shutdown), fields(worker_id = %self.id))]
	pub async fn run(&self, shutdown: CancellationToken) {
		info!("Worker started");

		while !shutdown.is_cancelled() {
			match self.run_once().await {
				Ok(Tick::Idle) => self.pause(&shutdown).await,
				Ok(_) => {}
				Err(e) => {
					error!(error = %e, "Worker iteration failed");
					self.pause(&shutdown).await;
				}
			}
		}

		info!("Worker shut down");
	}

	/// One iteration: claim a job, execute it, record the outcome.
	pub async fn run_once(&self) -> Result<Tick> {
		let Some(job) = self.queue.claim_next().await? else {
			return Ok(Tick::Idle);
		};

		info!(
			worker_id = %self.id,
			job_id = %job.id,
			command = %job.command,
			attempts = job.attempts,
			"Processing job"
		);

		match self.executor.execute(&job.command).await {
			Ok(output) => {
				debug!(
					worker_id = %self.id,
					job_id = %job.id,
					output = %output.stdout.trim(),
					truncated = output.truncated,
					"Job output"
				);
				self.queue.complete(&job.id).await?;
				info!(worker_id = %self.id, job_id = %job.id, "Job completed");
				Ok(Tick::Completed { job_id: job.id })
			}
			Err(failure) => {
				let outcome = self
					.queue
					.record_failure(&job.id, &failure.detail, job.attempts, job.max_retries)
					.await?;
				warn!(
					worker_id = %self.id,
					job_id = %job.id,
					attempts = job.attempts + 1,
					max_retries = job.max_retries,
					outcome = %outcome,
					error = %failure.detail,
					"Job failed"
				);
				Ok(Tick::Failed {
					job_id: job.id,
					outcome,
				})
			}
		}
	}

	async fn pause(&self, shutdown: &CancellationToken) {
		tokio::select! {
			_ = tokio::time::sleep(self.poll_interval) => {}
			_ = shutdown.cancelled() => {}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::executor::{ExecutionFailure, ExecutionOutput, ExecutionResult};
	use crate::types::JobState;
	use async_trait::async_trait;
	use chrono::{DateTime, Utc};
	use queuectl_db::testing::create_queue_test_pool;
	use queuectl_db::{ConfigRepository, DbError, FailureTransition, Job, JobStore};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;
	use tokio::sync::Notify;

	/// Succeeds for any command except `false`.
	struct ScriptedExecutor {
		executed: Mutex<Vec<String>>,
	}

	impl ScriptedExecutor {
		fn new() -> Arc<Self> {
			Arc::new(Self {
				executed: Mutex::new(Vec::new()),
			})
		}
	}

	#[async_trait]
	impl CommandExecutor for ScriptedExecutor {
		async fn execute(&self, command: &str) -> ExecutionResult {
			self.executed.lock().unwrap().push(command.to_string());
			if command == "false" {
				Err(ExecutionFailure::new("exit status: 1"))
			} else {
				Ok(ExecutionOutput {
					stdout: String::new(),
					truncated: false,
				})
			}
		}
	}

	/// Blocks inside `execute` until released.
	struct GatedExecutor {
		started: Notify,
		release: Notify,
	}

	#[async_trait]
	impl CommandExecutor for GatedExecutor {
		async fn execute(&self, _command: &str) -> ExecutionResult {
			self.started.notify_one();
			self.release.notified().await;
			Ok(ExecutionOutput {
				stdout: String::new(),
				truncated: false,
			})
		}
	}

	struct UnavailableStore {
		claims: AtomicUsize,
	}

	fn unavailable() -> DbError {
		DbError::Internal("store unavailable".to_string())
	}

	#[async_trait]
	impl JobStore for UnavailableStore {
		async fn insert_job(&self, _command: &str, _max_retries: u32) -> queuectl_db::Result<Job> {
			Err(unavailable())
		}

		async fn get_job(&self, _id: &str) -> queuectl_db::Result<Option<Job>> {
			Err(unavailable())
		}

		async fn list_jobs(&self, _state: Option<JobState>) -> queuectl_db::Result<Vec<Job>> {
			Err(unavailable())
		}

		async fn count_by_state(&self) -> queuectl_db::Result<Vec<(JobState, u64)>> {
			Err(unavailable())
		}

		async fn claim_next(&self, _now: DateTime<Utc>) -> queuectl_db::Result<Option<Job>> {
			self.claims.fetch_add(1, Ordering::SeqCst);
			Err(unavailable())
		}

		async fn mark_completed(&self, _id: &str) -> queuectl_db::Result<bool> {
			Err(unavailable())
		}

		async fn record_failure(
			&self,
			_id: &str,
			_error: &str,
			_transition: &FailureTransition,
		) -> queuectl_db::Result<bool> {
			Err(unavailable())
		}

		async fn revive_dead(&self, _id: &str) -> queuectl_db::Result<bool> {
			Err(unavailable())
		}
	}

	async fn setup_queue() -> JobQueue {
		JobQueue::from_pool(create_queue_test_pool().await)
	}

	#[tokio::test]
	async fn test_run_once_idle_when_empty() {
		let queue = setup_queue().await;
		let worker = Worker::new("w-1", queue, ScriptedExecutor::new());

		assert_eq!(worker.run_once().await.unwrap(), Tick::Idle);
	}

	#[tokio::test]
	async fn test_run_once_completes_successful_job() {
		let queue = setup_queue().await;
		let job = queue.enqueue("echo hello").await.unwrap();
		let executor = ScriptedExecutor::new();
		let worker = Worker::new("w-1", queue.clone(), executor.clone());

		let tick = worker.run_once().await.unwrap();
		assert_eq!(
			tick,
			Tick::Completed {
				job_id: job.id.clone()
			}
		);
		assert_eq!(*executor.executed.lock().unwrap(), vec!["echo hello"]);

		let stored = queue.get_job(&job.id).await.unwrap().unwrap();
		assert_eq!(stored.state, JobState::Completed);
		assert_eq!(stored.attempts, 0);
	}

	#[tokio::test]
	async fn test_run_once_records_failure() {
		let queue = setup_queue().await;
		let job = queue.enqueue("false").await.unwrap();
		let worker = Worker::new("w-1", queue.clone(), ScriptedExecutor::new());

		let tick = worker.run_once().await.unwrap();
		assert_eq!(
			tick,
			Tick::Failed {
				job_id: job.id.clone(),
				outcome: FailureOutcome::Retry,
			}
		);

		let stored = queue.get_job(&job.id).await.unwrap().unwrap();
		assert_eq!(stored.state, JobState::Pending);
		assert_eq!(stored.attempts, 1);
		assert_eq!(stored.last_error.as_deref(), Some("exit status: 1"));

		// Backed off, so not eligible yet.
		assert_eq!(worker.run_once().await.unwrap(), Tick::Idle);
	}

	#[tokio::test]
	async fn test_run_stops_immediately_when_already_cancelled() {
		let queue = setup_queue().await;
		queue.enqueue("echo hello").await.unwrap();
		let executor = ScriptedExecutor::new();
		let worker = Worker::new("w-1", queue, executor.clone());

		let shutdown = CancellationToken::new();
		shutdown.cancel();
		worker.run(shutdown).await;

		assert!(executor.executed.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_run_drains_backlog_then_wakes_on_cancel() {
		let queue = setup_queue().await;
		for i in 0..3 {
			queue.enqueue(&format!("echo {i}")).await.unwrap();
		}
		let executor = ScriptedExecutor::new();
		let worker = Arc::new(
			Worker::new("w-1", queue.clone(), executor.clone())
				.with_poll_interval(Duration::from_secs(3600)),
		);

		let shutdown = CancellationToken::new();
		let handle = {
			let worker = Arc::clone(&worker);
			let shutdown = shutdown.clone();
			tokio::spawn(async move { worker.run(shutdown).await })
		};

		for _ in 0..100 {
			if executor.executed.lock().unwrap().len() == 3 {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		shutdown.cancel();

		tokio::time::timeout(Duration::from_secs(5), handle)
			.await
			.expect("worker should stop while idle")
			.unwrap();

		let completed = queue.list_jobs(Some(JobState::Completed)).await.unwrap();
		assert_eq!(completed.len(), 3);
	}

	#[tokio::test]
	async fn test_cancel_during_execution_finishes_and_records_job() {
		let queue = setup_queue().await;
		let job = queue.enqueue("sleep 60").await.unwrap();
		let executor = Arc::new(GatedExecutor {
			started: Notify::new(),
			release: Notify::new(),
		});
		let worker = Arc::new(
			Worker::new("w-1", queue.clone(), executor.clone())
				.with_poll_interval(Duration::from_secs(3600)),
		);

		let shutdown = CancellationToken::new();
		let handle = {
			let worker = Arc::clone(&worker);
			let shutdown = shutdown.clone();
			tokio::spawn(async move { worker.run(shutdown).await })
		};

		tokio::time::timeout(Duration::from_secs(5), executor.started.notified())
			.await
			.expect("job should start executing");
		shutdown.cancel();

		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(!handle.is_finished());
		assert_eq!(
			queue.get_job(&job.id).await.unwrap().unwrap().state,
			JobState::Processing
		);

		executor.release.notify_one();
		tokio::time::timeout(Duration::from_secs(5), handle)
			.await
			.expect("worker should stop after the job finishes")
			.unwrap();

		let stored = queue.get_job(&job.id).await.unwrap().unwrap();
		assert_eq!(stored.state, JobState::Completed);
		assert!(queue.claim_next().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_store_errors_do_not_stop_the_worker() {
		let pool = create_queue_test_pool().await;
		let store = Arc::new(UnavailableStore {
			claims: AtomicUsize::new(0),
		});
		let queue = JobQueue::new(store.clone(), Arc::new(ConfigRepository::new(pool)));
		let worker = Arc::new(
			Worker::new("w-1", queue, ScriptedExecutor::new())
				.with_poll_interval(Duration::from_millis(5)),
		);

		assert!(worker.run_once().await.is_err());

		let shutdown = CancellationToken::new();
		let handle = {
			let worker = Arc::clone(&worker);
			let shutdown = shutdown.clone();
			tokio::spawn(async move { worker.run(shutdown).await })
		};

		for _ in 0..200 {
			if store.claims.load(Ordering::SeqCst) >= 4 {
				break;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		shutdown.cancel();
		tokio::time::timeout(Duration::from_secs(5), handle)
			.await
			.unwrap()
			.unwrap();

		assert!(store.claims.load(Ordering::SeqCst) >= 4);
	}
}
