// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable key/value settings read by the queue at enqueue time.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::Result;

#[derive(Clone)]
pub struct ConfigRepository {
	pool: SqlitePool,
}

impl ConfigRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn get(&self, key: &str) -> Result<Option<String>> {
		let row = sqlx::query_as::<_, (String,)>("SELECT value FROM config WHERE key = ?")
			.bind(key)
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.map(|(value,)| value))
	}

	#[tracing::instrument(skip(self, value))]
	pub async fn set(&self, key: &str, value: &str) -> Result<()> {
		sqlx::query(
			r#"
            INSERT INTO config (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
		)
		.bind(key)
		.bind(value)
		.execute(&self.pool)
		.await?;

		Ok(())
	}
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>>;
	async fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[async_trait]
impl ConfigStore for ConfigRepository {
	async fn get(&self, key: &str) -> Result<Option<String>> {
		self.get(key).await
	}

	async fn set(&self, key: &str, value: &str) -> Result<()> {
		self.set(key, value).await
	}
}
