// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, LoggingConfigLayer, WorkerConfigLayer};

/// Queue configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueueConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub worker: Option<WorkerConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl QueueConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: QueueConfigLayer) {
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.worker, other.worker, WorkerConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = QueueConfigLayer::default();
		base.merge(QueueConfigLayer {
			worker: Some(WorkerConfigLayer {
				count: Some(3),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(base.worker.unwrap().count, Some(3));
		assert!(base.database.is_none());
	}

	proptest! {
		#[test]
		fn prop_later_layer_wins(base_count in proptest::option::of(1u32..64), over_count in proptest::option::of(1u32..64)) {
			let mut merged = QueueConfigLayer {
				worker: Some(WorkerConfigLayer { count: base_count, poll_interval_ms: None }),
				..Default::default()
			};
			merged.merge(QueueConfigLayer {
				worker: Some(WorkerConfigLayer { count: over_count, poll_interval_ms: None }),
				..Default::default()
			});
			let count = merged.worker.and_then(|w| w.count);
			prop_assert_eq!(count, over_count.or(base_count));
		}
	}
}
