// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand handlers. Results go to stdout; diagnostics go through tracing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use queuectl_queue::{
	CancellationToken, CommandExecutor, Job, JobQueue, JobState, ReviveOutcome, ShellExecutor,
	Worker, DEFAULT_MAX_RETRIES, MAX_RETRIES_KEY,
};

use crate::payload::parse_enqueue_args;

const COMMAND_WIDTH: usize = 40;

pub async fn enqueue(queue: &JobQueue, args: &[String]) -> Result<()> {
	let command = parse_enqueue_args(args)?;
	let job = queue
		.enqueue(&command)
		.await
		.context("failed to enqueue job")?;

	println!("Job enqueued: {}", job.id);
	println!("  command:     {}", job.command);
	println!("  max_retries: {}", job.max_retries);
	Ok(())
}

/// Run `count` workers until Ctrl-C, then wait for in-flight jobs to finish.
pub async fn start_workers(queue: &JobQueue, count: u32, poll_interval: Duration) -> Result<()> {
	if count == 0 {
		bail!("worker count must be at least 1");
	}

	let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new());
	let shutdown = CancellationToken::new();
	let pid = std::process::id();

	let mut handles = Vec::with_capacity(count as usize);
	for i in 0..count {
		let worker = Worker::new(format!("{pid}-{i}"), queue.clone(), Arc::clone(&executor))
			.with_poll_interval(poll_interval);
		let shutdown = shutdown.clone();
		handles.push(tokio::spawn(async move { worker.run(shutdown).await }));
	}

	println!("Started {count} worker(s). Press Ctrl-C to stop.");

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for Ctrl-C")?;

	info!("Shutdown requested, waiting for workers to finish");
	println!("Stopping workers...");
	shutdown.cancel();

	for handle in handles {
		handle.await.context("worker task panicked")?;
	}

	println!("All workers stopped.");
	Ok(())
}

pub async fn status(queue: &JobQueue, json: bool) -> Result<()> {
	let counts = queue.status().await.context("failed to read job counts")?;

	if json {
		println!("{}", serde_json::to_string_pretty(&counts)?);
		return Ok(());
	}

	if counts.is_empty() {
		println!("No jobs in the queue.");
		return Ok(());
	}

	println!("{:<12} {:>8}", "STATE", "COUNT");
	println!("{}", "-".repeat(21));
	for entry in counts {
		println!("{:<12} {:>8}", entry.state, entry.count);
	}
	Ok(())
}

pub async fn list(queue: &JobQueue, state: Option<JobState>, json: bool) -> Result<()> {
	let jobs = queue
		.list_jobs(state)
		.await
		.context("failed to list jobs")?;

	if json {
		println!("{}", serde_json::to_string_pretty(&jobs)?);
		return Ok(());
	}

	if jobs.is_empty() {
		println!("No jobs found.");
		return Ok(());
	}

	println!(
		"{:<36} {:<COMMAND_WIDTH$} {:<10} {:>8}  {}",
		"ID", "COMMAND", "STATE", "ATTEMPTS", "NEXT RUN"
	);
	println!("{}", "-".repeat(36 + COMMAND_WIDTH + 10 + 8 + 24));
	for job in &jobs {
		println!(
			"{:<36} {:<COMMAND_WIDTH$} {:<10} {:>8}  {}",
			job.id,
			truncate(&job.command, COMMAND_WIDTH),
			job.state,
			format!("{}/{}", job.attempts, job.max_retries),
			job.next_run_at.format("%Y-%m-%d %H:%M:%S"),
		);
	}
	Ok(())
}

pub async fn dlq_list(queue: &JobQueue, json: bool) -> Result<()> {
	let jobs = queue
		.list_dead()
		.await
		.context("failed to list dead jobs")?;

	if json {
		println!("{}", serde_json::to_string_pretty(&jobs)?);
		return Ok(());
	}

	if jobs.is_empty() {
		println!("Dead-letter queue is empty.");
		return Ok(());
	}

	println!(
		"{:<36} {:<COMMAND_WIDTH$} {:>8}  {}",
		"ID", "COMMAND", "ATTEMPTS", "LAST ERROR"
	);
	println!("{}", "-".repeat(36 + COMMAND_WIDTH + 8 + 14));
	for job in &jobs {
		println!(
			"{:<36} {:<COMMAND_WIDTH$} {:>8}  {}",
			job.id,
			truncate(&job.command, COMMAND_WIDTH),
			job.attempts,
			last_error_line(job),
		);
	}
	Ok(())
}

pub async fn dlq_retry(queue: &JobQueue, id: &str) -> Result<()> {
	match queue
		.revive_from_dead(id)
		.await
		.context("failed to revive job")?
	{
		ReviveOutcome::Revived => {
			println!("Job {id} moved back to pending.");
			Ok(())
		}
		ReviveOutcome::NotFound => bail!("job {id} not found or not dead"),
	}
}

pub async fn config_set(queue: &JobQueue, key: &str, value: &str) -> Result<()> {
	queue.set_config(key, value).await?;
	println!("{key} = {value}");
	Ok(())
}

pub async fn config_get(queue: &JobQueue, key: &str) -> Result<()> {
	match queue.get_config(key).await? {
		Some(value) => println!("{key} = {value}"),
		None if key == MAX_RETRIES_KEY => println!("{key} = {DEFAULT_MAX_RETRIES} (default)"),
		None => println!("{key} is not set"),
	}
	Ok(())
}

fn last_error_line(job: &Job) -> &str {
	job.last_error
		.as_deref()
		.and_then(|e| e.lines().next())
		.unwrap_or("-")
}

fn truncate(s: &str, max_chars: usize) -> String {
	if s.chars().count() <= max_chars {
		return s.to_string();
	}
	let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
	format!("{kept}...")
}
