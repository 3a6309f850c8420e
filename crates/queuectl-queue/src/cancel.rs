// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cooperative shutdown signal shared by a supervisor and its workers.
#[derive(Clone)]
pub struct CancellationToken {
	inner: Arc<Inner>,
}

struct Inner {
	cancelled: AtomicBool,
	notify: Notify,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				cancelled: AtomicBool::new(false),
				notify: Notify::new(),
			}),
		}
	}

	pub fn cancel(&self) {
		self.inner.cancelled.store(true, Ordering::SeqCst);
		self.inner.notify.notify_waiters();
	}

	pub fn is_cancelled(&self) -> bool {
		self.inner.cancelled.load(Ordering::SeqCst)
	}

	/// Resolves once `cancel` has been called.
	pub async fn cancelled(&self) {
		loop {
			// Registered before the flag check so a concurrent cancel is not missed.
			let notified = self.inner.notify.notified();
			if self.is_cancelled() {
				return;
			}
			notified.await;
		}
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[test]
	fn test_cancel_sets_flag_for_all_clones() {
		let token = CancellationToken::new();
		let clone = token.clone();
		assert!(!clone.is_cancelled());
		token.cancel();
		assert!(clone.is_cancelled());
	}

	#[tokio::test]
	async fn test_cancelled_resolves_after_cancel() {
		let token = CancellationToken::new();
		let waiter = {
			let token = token.clone();
			tokio::spawn(async move { token.cancelled().await })
		};

		tokio::time::sleep(Duration::from_millis(10)).await;
		token.cancel();

		tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.expect("waiter should wake")
			.unwrap();
	}

	#[tokio::test]
	async fn test_cancelled_returns_immediately_when_already_cancelled() {
		let token = CancellationToken::new();
		token.cancel();
		tokio::time::timeout(Duration::from_millis(100), token.cancelled())
			.await
			.unwrap();
	}
}
