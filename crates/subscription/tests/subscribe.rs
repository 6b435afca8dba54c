// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Control surface: subscribe, update, unsubscribe and their validation.

mod common;

use std::{thread, time::Duration};

use arkiv_subscription::{Registration, SubscribeRequest, SubscriberTarget};
use arkiv_testing::{ts, wait::hold_for, wait_for};
use arkiv_type::{Error, SubscriberId, SubscriberUpdate};
use common::Harness;

#[test]
fn test_resubscribe_with_same_configuration_is_idempotent() {
	let h = Harness::new();
	let service = h.engine.service();
	let request = SubscribeRequest::new("http://mirror.example.org:8080/ingest/")
		.priority(5)
		.start_date(ts("2020-01-01"))
		.concurrent_threads(2);

	let first = service.subscribe(request.clone()).unwrap();
	assert!(first.is_created());
	assert_eq!(first.subscriber().id, SubscriberId::new("mirror.example.org:8080/ingest"));

	let second = service.subscribe(request).unwrap();
	assert!(matches!(second, Registration::AlreadyExists(_)));
	assert_eq!(second.subscriber(), first.subscriber());
	assert_eq!(h.store.load_subscribers().unwrap().len(), 1);
}

#[test]
fn test_resubscribe_does_not_duplicate_obligations() {
	let h = Harness::new();
	let service = h.engine.service();
	let request =
		SubscribeRequest::new("http://mirror/s1").subscriber_id("s1").start_date(ts("2020-01-01")).concurrent_threads(2);
	assert!(service.subscribe(request.clone()).unwrap().is_created());
	h.suspend("s1", true);
	// let any worker already past the gate go back to waiting on it
	thread::sleep(Duration::from_millis(100));

	let f1 = h.archive("F1", "2020-01-02");
	let f2 = h.archive("F2", "2020-01-03");
	wait_for(|| h.pending("s1") == 2, "two obligations");

	let again = service.subscribe(request).unwrap();
	assert!(matches!(again, Registration::AlreadyExists(_)));
	h.engine.sweep();
	assert_eq!(h.pending("s1"), 2);
	assert_eq!(h.count(&f1), 1);
	assert_eq!(h.count(&f2), 1);

	h.suspend("s1", false);
	wait_for(|| h.delivered_ids("s1") == vec!["F1", "F2"], "both files delivered");
	wait_for(|| h.subscriber("s1").last_file_ingestion_date == Some(ts("2020-01-03")), "watermark reaches F2");
	hold_for(|| h.transport.delivered_count() == 2, Duration::from_millis(100), "each file delivered once");
	assert_eq!(h.count(&f1), 0);
	assert_eq!(h.count(&f2), 0);
}

#[test]
fn test_concurrent_subscribes_create_once() {
	let h = Harness::new();
	let request = SubscribeRequest::new("http://mirror/s1").start_date(ts("2020-01-01")).concurrent_threads(2);
	let handles: Vec<_> = (0..8)
		.map(|_| {
			let service = h.engine.service().clone();
			let request = request.clone();
			thread::spawn(move || service.subscribe(request).unwrap())
		})
		.collect();

	let created = handles.into_iter().map(|handle| handle.join().unwrap()).filter(|r| r.is_created()).count();
	assert_eq!(created, 1);
	assert_eq!(h.store.load_subscribers().unwrap().len(), 1);
	assert_eq!(h.engine.registry().len(), 1);
	assert_eq!(h.status("mirror:80/s1").workers, 2);
}

#[test]
fn test_resubscribe_without_start_date_matches_existing() {
	let h = Harness::new();
	let service = h.engine.service();
	let request = SubscribeRequest::new("http://mirror/ingest").start_date(ts("2020-01-01"));
	service.subscribe(request).unwrap();

	let again = service.subscribe(SubscribeRequest::new("http://mirror/ingest")).unwrap();
	assert!(!again.is_created());
	assert_eq!(again.subscriber().start_date, ts("2020-01-01"));
}

#[test]
fn test_resubscribe_with_different_configuration_conflicts() {
	let h = Harness::new();
	let service = h.engine.service();
	service.subscribe(SubscribeRequest::new("http://mirror/ingest").priority(5)).unwrap();

	let err = service.subscribe(SubscribeRequest::new("http://mirror/ingest").priority(1)).unwrap_err();
	assert!(matches!(err, Error::Conflict { .. }));
	assert_eq!(h.store.load_subscribers().unwrap()[0].priority, 5);
}

#[test]
fn test_invalid_requests_are_rejected_without_side_effects() {
	let h = Harness::new();
	let service = h.engine.service();

	let cases = vec![
		SubscribeRequest::new("not a url"),
		SubscribeRequest::new("ftp://mirror/ingest"),
		SubscribeRequest::new("http://mirror/ingest").concurrent_threads(0),
		SubscribeRequest::new("http://mirror/ingest").filter("no-such-plugin", ""),
		SubscribeRequest::new("http://mirror/ingest").filter("file_id", "("),
		SubscribeRequest::new("http://mirror/ingest").subscriber_id("  "),
	];
	for request in cases {
		let err = service.subscribe(request.clone()).unwrap_err();
		assert!(matches!(err, Error::Validation(_)), "{:?} gave {:?}", request, err);
	}

	assert!(h.store.load_subscribers().unwrap().is_empty());
	assert!(h.engine.registry().is_empty());
}

#[test]
fn test_list_orders_by_priority() {
	let h = Harness::new();
	let service = h.engine.service();
	service.subscribe(SubscribeRequest::new("http://c/x").priority(30)).unwrap();
	service.subscribe(SubscribeRequest::new("http://a/x").priority(10)).unwrap();
	service.subscribe(SubscribeRequest::new("http://b/x").priority(20)).unwrap();
	h.update(
		"b:80/x",
		SubscriberUpdate {
			active: Some(false),
			..Default::default()
		},
	);

	let all: Vec<_> = service.list(false).into_iter().map(|s| s.priority).collect();
	assert_eq!(all, vec![10, 20, 30]);
	let active: Vec<_> = service.list(true).into_iter().map(|s| s.priority).collect();
	assert_eq!(active, vec![10, 30]);
}

#[test]
fn test_update_is_written_through() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 1);

	let updated = h.update(
		"s1",
		SubscriberUpdate {
			priority: Some(1),
			url: Some("https://backup:8443/s1".to_string()),
			concurrent_threads: Some(3),
			..Default::default()
		},
	);
	assert_eq!(updated.port, 8443);
	assert_eq!(h.status("s1").workers, 3);

	let stored = h.store.load_subscribers().unwrap();
	assert_eq!(stored[0].priority, 1);
	assert_eq!(stored[0].url, "https://backup:8443/s1");
	assert_eq!(stored[0].concurrent_threads, 3);
}

#[test]
fn test_update_validation() {
	let h = Harness::new();
	h.subscribe("s1", "2020-01-01", 1);
	let service = h.engine.service();
	let id = SubscriberId::new("s1");

	assert!(matches!(service.update(&id, SubscriberUpdate::default()), Err(Error::Validation(_))));
	let zero = SubscriberUpdate {
		concurrent_threads: Some(0),
		..Default::default()
	};
	assert!(matches!(service.update(&id, zero), Err(Error::Validation(_))));
	let bad_filter = SubscriberUpdate {
		filter_plugin: Some("min_version".to_string()),
		filter_plugin_params: Some("latest".to_string()),
		..Default::default()
	};
	assert!(matches!(service.update(&id, bad_filter), Err(Error::Validation(_))));

	let missing = SubscriberUpdate {
		priority: Some(1),
		..Default::default()
	};
	assert!(matches!(service.update(&SubscriberId::new("nope"), missing), Err(Error::NotFound(_))));
	assert_eq!(h.subscriber("s1").concurrent_threads, 1);
}

#[test]
fn test_unsubscribe_by_url_and_id() {
	let h = Harness::new();
	let service = h.engine.service();
	service.subscribe(SubscribeRequest::new("http://mirror/one")).unwrap();
	h.subscribe("two", "2020-01-01", 1);

	let removed = service.unsubscribe(SubscriberTarget::Url("http://mirror/one".to_string())).unwrap();
	assert_eq!(removed.id, SubscriberId::new("mirror:80/one"));
	service.unsubscribe(SubscriberTarget::Id(SubscriberId::new("two"))).unwrap();

	assert!(h.store.load_subscribers().unwrap().is_empty());
	let err = service.unsubscribe(SubscriberTarget::Id(SubscriberId::new("two"))).unwrap_err();
	assert!(matches!(err, Error::NotFound(_)));
}
