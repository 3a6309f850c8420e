// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;

use crate::migrations::run_migrations;
use crate::pool::create_pool;

/// In-memory pool pinned to a single connection so every query sees the
/// same database.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap()
}

pub async fn create_queue_test_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	run_migrations(&pool).await.unwrap();
	pool
}

/// File-backed pool with several connections, for tests that need real
/// concurrent writers.
pub async fn create_file_test_pool(path: &Path) -> SqlitePool {
	let url = format!("sqlite:{}", path.display());
	let pool = create_pool(&url, Duration::from_secs(10)).await.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}
