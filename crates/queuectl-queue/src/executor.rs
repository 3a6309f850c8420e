// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command execution capability used by workers.
//!
//! Job payloads are arbitrary command strings. [`ShellExecutor`] hands them to
//! `sh -c` with the worker's own privileges and performs no sandboxing; run
//! workers under an account and in an environment you are prepared to let
//! submitters control.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

const MAX_OUTPUT_BYTES: usize = 64 * 1024; // per stream

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutput {
	pub stdout: String,
	/// `stdout` was cut at the per-stream limit.
	pub truncated: bool,
}

/// Opaque failure detail recorded as the job's `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ExecutionFailure {
	pub detail: String,
	pub exit_code: Option<i32>,
}

impl ExecutionFailure {
	pub fn new(detail: impl Into<String>) -> Self {
		Self {
			detail: detail.into(),
			exit_code: None,
		}
	}
}

pub type ExecutionResult = std::result::Result<ExecutionOutput, ExecutionFailure>;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
	/// Run `command` to completion. There is no timeout; the future resolves
	/// when the command exits.
	async fn execute(&self, command: &str) -> ExecutionResult;
}

pub struct ShellExecutor {
	shell: String,
}

impl ShellExecutor {
	pub fn new() -> Self {
		Self::with_shell("sh")
	}

	pub fn with_shell(shell: impl Into<String>) -> Self {
		Self {
			shell: shell.into(),
		}
	}

	fn truncate_output(output: &[u8], max_bytes: usize) -> (String, bool) {
		if output.len() <= max_bytes {
			(String::from_utf8_lossy(output).to_string(), false)
		} else {
			let content = String::from_utf8_lossy(&output[..max_bytes]).to_string();
			(content, true)
		}
	}
}

impl Default for ShellExecutor {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
	async fn execute(&self, command: &str) -> ExecutionResult {
		tracing::debug!(shell = %self.shell, command = %command, "executing command");

		let output = Command::new(&self.shell)
			.arg("-c")
			.arg(command)
			.stdin(Stdio::null())
			.output()
			.await
			.map_err(|e| {
				tracing::warn!(error = %e, "command failed to spawn");
				ExecutionFailure::new(format!("failed to spawn {}: {e}", self.shell))
			})?;

		let (stdout, truncated) = Self::truncate_output(&output.stdout, MAX_OUTPUT_BYTES);
		let (stderr, _) = Self::truncate_output(&output.stderr, MAX_OUTPUT_BYTES);

		tracing::debug!(
			exit_code = ?output.status.code(),
			stdout_len = output.stdout.len(),
			stderr_len = output.stderr.len(),
			"command exited"
		);

		if output.status.success() {
			return Ok(ExecutionOutput { stdout, truncated });
		}

		let stderr = stderr.trim();
		let detail = if stderr.is_empty() {
			match output.status.code() {
				Some(code) => format!("exit status: {code}"),
				None => "terminated by signal".to_string(),
			}
		} else {
			stderr.to_string()
		};

		Err(ExecutionFailure {
			detail,
			exit_code: output.status.code(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_successful_command_captures_stdout() {
		let output = ShellExecutor::new().execute("echo hello").await.unwrap();
		assert_eq!(output.stdout.trim(), "hello");
		assert!(!output.truncated);
	}

	#[tokio::test]
	async fn test_failure_prefers_stderr() {
		let failure = ShellExecutor::new()
			.execute("echo broken >&2; exit 3")
			.await
			.unwrap_err();
		assert_eq!(failure.detail, "broken");
		assert_eq!(failure.exit_code, Some(3));
	}

	#[tokio::test]
	async fn test_failure_without_stderr_reports_exit_status() {
		let failure = ShellExecutor::new().execute("false").await.unwrap_err();
		assert_eq!(failure.detail, "exit status: 1");
		assert_eq!(failure.exit_code, Some(1));
	}

	#[tokio::test]
	async fn test_missing_shell_is_a_failure() {
		let failure = ShellExecutor::with_shell("/nonexistent/shell")
			.execute("echo hi")
			.await
			.unwrap_err();
		assert!(failure.detail.starts_with("failed to spawn /nonexistent/shell"));
		assert_eq!(failure.exit_code, None);
	}

	#[tokio::test]
	async fn test_truncated_flag_tracks_stdout_only() {
		let output = ShellExecutor::new()
			.execute("head -c 70000 /dev/zero >&2; echo ok")
			.await
			.unwrap();
		assert_eq!(output.stdout.trim(), "ok");
		assert!(!output.truncated);

		let output = ShellExecutor::new()
			.execute("head -c 70000 /dev/zero | tr '\\0' a")
			.await
			.unwrap();
		assert_eq!(output.stdout.len(), MAX_OUTPUT_BYTES);
		assert!(output.truncated);
	}

	#[test]
	fn test_truncate_output() {
		let (content, truncated) = ShellExecutor::truncate_output(b"abcdef", 4);
		assert_eq!(content, "abcd");
		assert!(truncated);

		let (content, truncated) = ShellExecutor::truncate_output(b"abc", 4);
		assert_eq!(content, "abc");
		assert!(!truncated);
	}
}
