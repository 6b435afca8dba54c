// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Changing `concurrent_threads` on a running subscriber.

mod common;

use std::time::Duration;

use arkiv_testing::wait_for;
use arkiv_type::{SubscriberId, SubscriberUpdate};
use common::Harness;

fn threads(n: u32) -> SubscriberUpdate {
	SubscriberUpdate {
		concurrent_threads: Some(n),
		..Default::default()
	}
}

fn archive_many(h: &Harness, n: usize) -> Vec<String> {
	(0..n)
		.map(|i| {
			let id = format!("F{:02}", i);
			h.archive(&id, &format!("2020-01-{:02}", i + 1));
			id
		})
		.collect()
}

#[test]
fn test_shrinking_pool_delivers_everything_once() {
	let h = Harness::new();
	h.transport.set_latency(Duration::from_millis(30));
	h.subscribe("s1", "2020-01-01", 4);
	let expected = archive_many(&h, 12);

	wait_for(|| h.transport.delivered_count() >= 2, "deliveries under way");
	h.update("s1", threads(1));
	let pool = h.engine.registry().pool(&SubscriberId::new("s1")).unwrap();
	assert_eq!(pool.worker_count(), 1);

	wait_for(|| h.delivered_ids("s1") == expected, "all files delivered");
	wait_for(|| pool.live_threads() == 1, "revoked workers exited");
	assert_eq!(h.transport.delivered_count(), expected.len());
	assert_eq!(h.pending("s1"), 0);
}

#[test]
fn test_growing_pool_runs_workers_in_parallel() {
	let h = Harness::new();
	h.transport.set_latency(Duration::from_millis(30));
	h.subscribe("s1", "2020-01-01", 1);
	h.update("s1", threads(4));
	let pool = h.engine.registry().pool(&SubscriberId::new("s1")).unwrap();
	assert_eq!(pool.worker_count(), 4);

	let expected = archive_many(&h, 12);
	wait_for(|| h.delivered_ids("s1") == expected, "all files delivered");
	assert_eq!(h.transport.delivered_count(), expected.len());
	assert!(h.transport.max_concurrency() > 1, "workers should overlap");
	assert_eq!(h.status("s1").workers, 4);
}

#[test]
fn test_shrink_then_grow() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 3);
	h.update("s1", threads(1));
	h.update("s1", threads(2));
	let pool = h.engine.registry().pool(&SubscriberId::new("s1")).unwrap();
	assert_eq!(pool.worker_count(), 2);
	wait_for(|| pool.live_threads() == 2, "revoked workers exited");

	let expected = archive_many(&h, 4);
	wait_for(|| h.delivered_ids("s1") == expected, "all files delivered");
}
