// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::Result;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_create_jobs",
		include_str!("../migrations/001_create_jobs.sql"),
	),
	(
		"002_create_config",
		include_str!("../migrations/002_create_config.sql"),
	),
];

/// Create the `jobs` and `config` tables.
///
/// # Note
/// Migrations are idempotent - safe to run multiple times and from several
/// worker processes at once.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			sqlx::query(stmt).execute(pool).await?;
		}
		tracing::debug!(migration = %name, "migration applied");
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn test_migrations_are_idempotent() {
		let pool = create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();

		let tables: Vec<(String,)> = sqlx::query_as(
			"SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('jobs', 'config') ORDER BY name",
		)
		.fetch_all(&pool)
		.await
		.unwrap();
		assert_eq!(
			tables,
			vec![("config".to_string(),), ("jobs".to_string(),)]
		);
	}
}
