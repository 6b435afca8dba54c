// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! End to end delivery: dispatch, workers, watermark and reference counts.

mod common;

use std::{sync::Arc, thread, time::Duration};

use arkiv_subscription::{FilterPlugin, FilterRegistry, SubscribeRequest, SubscriberTarget};
use arkiv_testing::{
	ts,
	wait::{DEFAULT_POLL_INTERVAL, hold_for},
	wait_for, wait_for_condition,
};
use arkiv_type::{Error, FileMeta, Result, SubscriberId, SubscriberUpdate};
use common::Harness;

/// Matches everything, slowly, the way a filter backed by a remote lookup would.
struct SlowFilter;

impl FilterPlugin for SlowFilter {
	fn name(&self) -> &str {
		"slow"
	}

	fn matches(&self, _file: &FileMeta, _params: &str) -> Result<bool> {
		thread::sleep(Duration::from_millis(1500));
		Ok(true)
	}
}

#[test]
fn test_files_since_start_date_are_delivered_and_watermarked() {
	let h = Harness::new();
	let f1 = h.archive("F1", "2020-01-02");
	let f2 = h.archive("F2", "2020-01-03");
	h.subscribe("s1", "2020-01-01", 2);

	wait_for(|| h.delivered_ids("s1") == vec!["F1", "F2"], "both files delivered");
	wait_for(|| h.subscriber("s1").last_file_ingestion_date == Some(ts("2020-01-03")), "watermark reaches F2");
	h.engine.sweep();
	hold_for(|| h.transport.delivered_count() == 2, Duration::from_millis(100), "each file delivered once");

	assert_eq!(h.pending("s1"), 0);
	assert_eq!(h.count(&f1), 0);
	assert_eq!(h.count(&f2), 0);
	let mut evicted = h.drain_evictions();
	evicted.sort();
	assert_eq!(evicted, vec![f1, f2]);

	let stored = h.store.load_subscribers().unwrap();
	assert_eq!(stored[0].last_file_ingestion_date, Some(ts("2020-01-03")));
}

#[test]
fn test_files_before_start_date_are_never_delivered() {
	let h = Harness::new();
	h.archive("old", "2019-12-31");
	h.subscribe("s1", "2020-01-01", 1);
	h.archive("new", "2020-01-05");

	wait_for(|| h.delivered_ids("s1") == vec!["new"], "new file delivered");
	h.engine.sweep();
	hold_for(|| h.delivered_ids("s1") == vec!["new"], Duration::from_millis(100), "old file stays out");
}

#[test]
fn test_filter_excludes_files() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 1);
	h.update(
		"s1",
		SubscriberUpdate {
			filter_plugin: Some("file_id".to_string()),
			filter_plugin_params: Some("^MCT".to_string()),
			..Default::default()
		},
	);
	h.archive("MCT.1", "2020-01-02");
	h.archive("XYZ.1", "2020-01-03");
	h.archive("MCT.2", "2020-01-04");

	wait_for(|| h.delivered_ids("s1") == vec!["MCT.1", "MCT.2"], "matching files delivered");
	h.engine.sweep();
	assert_eq!(h.pending("s1"), 0);
	assert_eq!(h.delivered_ids("s1"), vec!["MCT.1", "MCT.2"]);
}

#[test]
fn test_reference_count_reaches_zero_once() {
	let h = Harness::new();
	for id in ["a", "b", "c"] {
		h.subscribe(id, "2020-01-01", 1);
		h.suspend(id, true);
	}
	// let any worker already past the gate go back to waiting on it
	thread::sleep(Duration::from_millis(100));

	let file = h.archive("shared", "2020-01-02");
	wait_for(|| h.count(&file) == 3, "three obligations for the file");
	assert!(h.drain_evictions().is_empty());

	for id in ["a", "b", "c"] {
		h.suspend(id, false);
	}
	wait_for(|| h.transport.delivered_count() == 3, "all three deliveries");
	wait_for(|| h.count(&file) == 0, "references released");

	let event = h.evictions.recv_timeout(Duration::from_secs(5)).unwrap();
	assert_eq!(event.file, file);
	thread::sleep(Duration::from_millis(50));
	assert!(h.drain_evictions().is_empty(), "eviction must be signalled exactly once");
}

#[test]
fn test_watermark_holds_behind_failed_file() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 2);
	h.transport.fail_always("T1", Error::DeliveryTransient("503".to_string()));
	let t1 = h.archive("T1", "2020-01-02");
	h.archive("T2", "2020-01-03");

	wait_for(|| h.delivered_ids("s1") == vec!["T2"], "T2 delivered");
	wait_for(
		|| h.store.list_pending(&SubscriberId::new("s1")).unwrap().first().map(|o| o.attempts).unwrap_or(0) >= 3,
		"T1 attempts recorded",
	);
	h.engine.sweep();
	assert_eq!(h.subscriber("s1").last_file_ingestion_date, None);
	assert_eq!(h.count(&t1), 1);
	let status = h.status("s1");
	assert_eq!(status.pending, 1);
	assert_eq!(status.last_error.as_deref(), Some("transient delivery failure: 503"));

	h.transport.heal("T1");
	wait_for(
		|| {
			h.engine.sweep();
			h.delivered_ids("s1") == vec!["T1", "T2"]
		},
		"T1 delivered after healing",
	);
	wait_for(|| h.subscriber("s1").last_file_ingestion_date == Some(ts("2020-01-03")), "watermark passes T2");
	assert_eq!(h.count(&t1), 0);
}

#[test]
fn test_permanent_failure_is_not_retried_within_a_pass() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 1);
	h.suspend("s1", true);
	h.transport.fail_always("bad", Error::DeliveryPermanent("415 unsupported media type".to_string()));
	h.archive("bad", "2020-01-02");
	wait_for(|| h.pending("s1") == 1, "obligation created");
	// let queued dispatch passes drain while the file sits in the queue
	thread::sleep(Duration::from_millis(100));
	h.suspend("s1", false);

	wait_for(
		|| h.store.list_pending(&SubscriberId::new("s1")).unwrap().first().map(|o| o.attempts).unwrap_or(0) == 1,
		"one failed attempt",
	);
	hold_for(|| h.transport.attempts() == 1, Duration::from_millis(100), "no retry with backoff");
	assert_eq!(h.pending("s1"), 1);
}

#[test]
fn test_suspended_subscriber_receives_nothing_until_resumed() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 2);
	h.suspend("s1", true);
	thread::sleep(Duration::from_millis(100));

	h.archive("F1", "2020-01-02");
	h.archive("F2", "2020-01-03");
	wait_for(|| h.pending("s1") == 2, "obligations created while suspended");
	hold_for(|| h.transport.delivered_count() == 0, Duration::from_millis(150), "nothing delivered");
	assert!(h.engine.registry().pool(&SubscriberId::new("s1")).unwrap().is_suspended());

	h.suspend("s1", false);
	wait_for(|| h.delivered_ids("s1") == vec!["F1", "F2"], "delivered after resume");
}

#[test]
fn test_unsubscribe_releases_references() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 1);
	h.transport.disconnect(&SubscriberId::new("s1"));
	let f1 = h.archive("F1", "2020-01-02");
	let f2 = h.archive("F2", "2020-01-03");
	wait_for(|| h.count(&f1) == 1 && h.count(&f2) == 1, "references taken");

	h.engine.service().unsubscribe(SubscriberTarget::Id(SubscriberId::new("s1"))).unwrap();

	assert_eq!(h.count(&f1), 0);
	assert_eq!(h.count(&f2), 0);
	assert_eq!(h.pending("s1"), 0);
	let mut evicted = h.drain_evictions();
	evicted.sort();
	assert_eq!(evicted, vec![f1, f2]);
	assert!(h.engine.registry().get(&SubscriberId::new("s1")).is_none());
}

#[test]
fn test_earlier_start_date_backfills() {
	let h = Harness::new();
	h.archive("old", "2020-01-02");
	h.subscribe("s1", "2020-01-05", 1);
	h.archive("new", "2020-01-06");
	wait_for(|| h.subscriber("s1").last_file_ingestion_date == Some(ts("2020-01-06")), "watermark at new");

	h.update(
		"s1",
		SubscriberUpdate {
			start_date: Some(ts("2020-01-01")),
			..Default::default()
		},
	);
	wait_for(|| h.delivered_ids("s1").contains(&"old".to_string()), "old file backfilled");
}

#[test]
fn test_transient_failures_are_retried_until_delivered() {
	let h = Harness::new();
	h.transport.fail_next("F1", 2);
	h.subscribe("s1", "2020-01-01", 1);
	h.archive("F1", "2020-01-02");

	wait_for(|| h.delivered_ids("s1") == vec!["F1"], "delivered on the third attempt");
	wait_for(|| h.status("s1").delivered == 1, "delivery recorded");
	assert_eq!(h.transport.attempts(), 3);
	assert_eq!(h.pending("s1"), 0);
	assert_eq!(h.status("s1").failed_attempts, 2);
}

#[test]
fn test_resubscribe_during_push_keeps_the_new_obligation() {
	let h = Harness::new();
	let service = h.engine.service();
	h.transport.set_latency(Duration::from_millis(300));
	h.subscribe("s1", "2020-01-01", 1);
	let f1 = h.archive("F1", "2020-01-02");
	wait_for(|| h.transport.attempts() == 1, "push to the first endpoint in flight");

	service.unsubscribe(SubscriberTarget::Id(SubscriberId::new("s1"))).unwrap();
	assert_eq!(h.drain_evictions(), vec![f1.clone()]);

	h.transport.disconnect_url("http://other/s1");
	let request = SubscribeRequest::new("http://other/s1").subscriber_id("s1").start_date(ts("2020-01-01"));
	assert!(service.subscribe(request).unwrap().is_created());
	wait_for(|| h.pending("s1") == 1 && h.count(&f1) == 1, "obligation for the new endpoint");

	wait_for(|| h.transport.delivered_to_url("http://mirror/s1") == vec![f1.clone()], "first push finished");
	hold_for(
		|| h.pending("s1") == 1 && h.count(&f1) == 1,
		Duration::from_millis(200),
		"the finished push does not settle the new obligation",
	);
	assert!(h.drain_evictions().is_empty());

	h.transport.reconnect_url("http://other/s1");
	wait_for(
		|| {
			h.engine.sweep();
			h.transport.delivered_to_url("http://other/s1") == vec![f1.clone()]
		},
		"delivered to the new endpoint",
	);
	wait_for(|| h.count(&f1) == 0, "reference released");
	assert_eq!(h.pending("s1"), 0);
	assert_eq!(h.drain_evictions(), vec![f1]);
}

#[test]
fn test_slow_filter_does_not_hold_back_other_subscribers() {
	let mut filters = FilterRegistry::with_builtins();
	filters.register(Arc::new(SlowFilter));
	let h = Harness::with_filters(filters);
	let slow = SubscribeRequest::new("http://mirror/slow")
		.subscriber_id("slow")
		.start_date(ts("2020-01-01"))
		.filter("slow", "");
	h.engine.service().subscribe(slow).unwrap();
	h.subscribe("fast", "2020-01-01", 1);

	h.archive("F1", "2020-01-02");
	wait_for(|| h.delivered_ids("fast") == vec!["F1"], "fast subscriber served");

	// the slow filter is still busy with F1
	h.archive("F2", "2020-01-03");
	wait_for_condition(
		|| h.delivered_ids("fast") == vec!["F1", "F2"],
		Duration::from_millis(750),
		DEFAULT_POLL_INTERVAL,
		"fast subscriber served while the slow filter runs",
	);
}
