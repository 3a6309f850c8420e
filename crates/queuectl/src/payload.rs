// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turning `enqueue` arguments into a command string.
//!
//! Arguments are joined with single spaces. If the joined text starts with
//! `{` it is treated as a JSON request and must carry a `command` field,
//! e.g. `queuectl enqueue '{"command": "sleep 2"}'`.

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
	#[error("missing command")]
	Empty,

	#[error("invalid JSON payload: {0}")]
	InvalidJson(#[from] serde_json::Error),

	#[error("field 'command' is required")]
	MissingCommand,
}

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
	#[serde(default)]
	command: Option<String>,
}

pub fn parse_enqueue_args(args: &[String]) -> Result<String, PayloadError> {
	let raw = args.join(" ");
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err(PayloadError::Empty);
	}

	if !trimmed.starts_with('{') {
		return Ok(raw);
	}

	let request: EnqueueRequest = serde_json::from_str(trimmed)?;
	match request.command {
		Some(command) if !command.trim().is_empty() => Ok(command),
		_ => Err(PayloadError::MissingCommand),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn args(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_plain_args_are_joined() {
		assert_eq!(
			parse_enqueue_args(&args(&["echo", "hello", "world"])).unwrap(),
			"echo hello world"
		);
	}

	#[test]
	fn test_json_payload_extracts_command() {
		let command = parse_enqueue_args(&args(&[r#"{"command": "sleep 2", "id": "ignored"}"#])).unwrap();
		assert_eq!(command, "sleep 2");
	}

	#[test]
	fn test_json_split_across_args() {
		let command = parse_enqueue_args(&args(&["{\"command\":", "\"ls -la\"}"])).unwrap();
		assert_eq!(command, "ls -la");
	}

	#[test]
	fn test_json_without_command_rejected() {
		let result = parse_enqueue_args(&args(&[r#"{"cmd": "ls"}"#]));
		assert!(matches!(result, Err(PayloadError::MissingCommand)));

		let result = parse_enqueue_args(&args(&[r#"{"command": ""}"#]));
		assert!(matches!(result, Err(PayloadError::MissingCommand)));
	}

	#[test]
	fn test_malformed_json_rejected() {
		let result = parse_enqueue_args(&args(&["{not json"]));
		assert!(matches!(result, Err(PayloadError::InvalidJson(_))));
	}

	#[test]
	fn test_empty_args_rejected() {
		assert!(matches!(parse_enqueue_args(&[]), Err(PayloadError::Empty)));
		assert!(matches!(
			parse_enqueue_args(&args(&["  "])),
			Err(PayloadError::Empty)
		));
	}
}
