// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! queuectl - persistent background job queue.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use queuectl_config::LoggingConfig;
use queuectl_db::{create_pool, run_migrations};
use queuectl_queue::{JobQueue, JobState};

mod commands;
mod payload;

/// queuectl - a persistent, multi-worker job queue
#[derive(Parser, Debug)]
#[command(name = "queuectl", version, about, long_about = None)]
struct Args {
	/// Path to configuration file (default: /etc/queuectl/queuectl.toml)
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log output format
	#[arg(long, value_enum, default_value = "text")]
	log_format: LogFormat,

	#[command(subcommand)]
	command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
	Text,
	Json,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Add a job, e.g. `queuectl enqueue echo hello`
	Enqueue {
		/// Command words, or a JSON object with a `command` field
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		args: Vec<String>,
	},
	/// Manage workers
	Worker {
		#[command(subcommand)]
		command: WorkerCommand,
	},
	/// Show job counts by state
	Status {
		/// Output raw JSON
		#[arg(long)]
		json: bool,
	},
	/// List jobs
	List {
		/// Only show jobs in this state (pending, processing, completed, dead)
		#[arg(long)]
		state: Option<JobState>,
		/// Output raw JSON
		#[arg(long)]
		json: bool,
	},
	/// Inspect and revive dead-lettered jobs
	Dlq {
		#[command(subcommand)]
		command: DlqCommand,
	},
	/// Read and write runtime settings stored in the queue database
	Config {
		#[command(subcommand)]
		command: ConfigCommand,
	},
}

#[derive(Subcommand, Debug)]
enum WorkerCommand {
	/// Run workers in the foreground until Ctrl-C
	Start {
		/// Number of concurrent workers (default from config)
		#[arg(short = 'n', long)]
		count: Option<u32>,
	},
}

#[derive(Subcommand, Debug)]
enum DlqCommand {
	/// List dead jobs
	List {
		/// Output raw JSON
		#[arg(long)]
		json: bool,
	},
	/// Move a dead job back to pending with a fresh retry budget
	Retry {
		/// Job ID
		id: String,
	},
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
	/// Set a value, e.g. `queuectl config set max_retries 5`
	Set { key: String, value: String },
	/// Show a value
	Get { key: String },
}

fn init_tracing(logging: &LoggingConfig, format: LogFormat) {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	match format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Text => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config =
		queuectl_config::load_config(args.config.clone()).context("failed to load configuration")?;

	init_tracing(&config.logging, args.log_format);

	tracing::debug!(database = %config.database.url, "opening queue database");

	let pool = create_pool(&config.database.url, config.database.busy_timeout())
		.await
		.context("failed to open queue database")?;
	run_migrations(&pool)
		.await
		.context("failed to run database migrations")?;

	let queue = JobQueue::from_pool(pool);

	match args.command {
		Command::Enqueue { args } => commands::enqueue(&queue, &args).await,
		Command::Worker {
			command: WorkerCommand::Start { count },
		} => {
			let count = count.unwrap_or(config.worker.count);
			commands::start_workers(&queue, count, config.worker.poll_interval()).await
		}
		Command::Status { json } => commands::status(&queue, json).await,
		Command::List { state, json } => commands::list(&queue, state, json).await,
		Command::Dlq { command } => match command {
			DlqCommand::List { json } => commands::dlq_list(&queue, json).await,
			DlqCommand::Retry { id } => commands::dlq_retry(&queue, &id).await,
		},
		Command::Config { command } => match command {
			ConfigCommand::Set { key, value } => commands::config_set(&queue, &key, &value).await,
			ConfigCommand::Get { key } => commands::config_get(&queue, &key).await,
		},
	}
}
