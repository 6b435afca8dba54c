// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use arkiv_subscription::{DeliveryConfig, RetryPolicy};
use arkiv_type::{FileMeta, FileRef, Timestamp};

/// Parses a timestamp, panicking on bad input.
pub fn ts(value: &str) -> Timestamp {
	Timestamp::parse(value).unwrap_or_else(|e| panic!("bad timestamp '{}': {}", value, e))
}

/// A FITS file, version 1 on `disk-1`, ingested at `date`.
pub fn file(id: &str, date: &str) -> FileMeta {
	FileMeta::new(FileRef::new(id, 1, "disk-1"), ts(date), "image/fits")
		.with_checksum(format!("crc32:{:08x}", id.len()))
		.with_size(2880)
		.with_path(format!("/archive/disk-1/{}.fits", id))
}

/// Short timeouts so tests converge quickly. The periodic sweep is slow
/// enough that tests drive dispatch explicitly.
pub fn fast_config() -> DeliveryConfig {
	DeliveryConfig::new()
		.sweep_interval(Duration::from_secs(3600))
		.queue_poll_timeout(Duration::from_millis(20))
		.suspend_poll_timeout(Duration::from_millis(20))
		.retry(
			RetryPolicy::default()
				.max_attempts(3)
				.initial_backoff(Duration::from_millis(5))
				.max_backoff(Duration::from_millis(20)),
		)
		.dispatch_batch_size(2)
}
