// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Behaviour shared by every backend, checked against memory and SQLite alike.

use arkiv_store::{Backend, FileCursor, MemoryStore, SqliteStore};
use arkiv_type::{Error, FileMeta, FileRef, Subscriber, SubscriberId, Timestamp};

fn ts(value: &str) -> Timestamp {
	Timestamp::parse(value).unwrap()
}

fn file(id: &str, date: &str) -> FileMeta {
	FileMeta::new(FileRef::new(id, 1, "disk-1"), ts(date), "application/fits")
}

fn subscriber(id: &str) -> Subscriber {
	Subscriber {
		id: SubscriberId::new(id),
		host_id: "mirror".to_string(),
		port: 8080,
		priority: 10,
		url: format!("http://mirror:8080/{}", id),
		start_date: ts("2020-01-01"),
		filter_plugin: String::new(),
		filter_plugin_params: String::new(),
		concurrent_threads: 2,
		active: true,
		suspended: false,
		last_file_ingestion_date: None,
	}
}

fn backends() -> Vec<(&'static str, Box<dyn Backend>)> {
	vec![("memory", Box::new(MemoryStore::new())), ("sqlite", Box::new(SqliteStore::tmpfs().unwrap()))]
}

#[test]
fn test_subscriber_crud() {
	for (name, store) in backends() {
		let mut s = subscriber("s1");
		store.insert_subscriber(&s).unwrap();
		assert!(store.insert_subscriber(&s).is_err(), "{name}: double insert must fail");

		s.priority = 3;
		s.suspended = true;
		store.update_subscriber(&s).unwrap();
		store.set_watermark(&s.id, Some(ts("2020-01-05"))).unwrap();

		let loaded = store.load_subscribers().unwrap();
		assert_eq!(loaded.len(), 1, "{name}");
		assert_eq!(loaded[0].priority, 3, "{name}");
		assert!(loaded[0].suspended, "{name}");
		assert_eq!(loaded[0].last_file_ingestion_date, Some(ts("2020-01-05")), "{name}");

		assert!(store.delete_subscriber(&s.id).unwrap(), "{name}");
		assert!(!store.delete_subscriber(&s.id).unwrap(), "{name}");
		assert!(matches!(store.update_subscriber(&s), Err(Error::NotFound(_))), "{name}");
	}
}

#[test]
fn test_dequeue_reports_remaining_across_subscribers() {
	for (name, store) in backends() {
		let a = SubscriberId::new("a");
		let b = SubscriberId::new("b");
		let f = file("obs-1", "2020-01-02");

		store.enqueue(&a, &f).unwrap();
		store.enqueue(&b, &f).unwrap();
		assert_eq!(store.list_pending_for_file(&f.file).unwrap().len(), 2, "{name}");

		assert_eq!(store.dequeue(&a, &f.file).unwrap(), 1, "{name}");
		assert_eq!(store.dequeue(&b, &f.file).unwrap(), 0, "{name}");
		assert!(matches!(store.dequeue(&b, &f.file), Err(Error::NotFound(_))), "{name}");
	}
}

#[test]
fn test_duplicate_obligation() {
	for (name, store) in backends() {
		let a = SubscriberId::new("a");
		let f = file("obs-1", "2020-01-02");
		store.enqueue(&a, &f).unwrap();
		assert!(store.enqueue(&a, &f).unwrap_err().is_duplicate(), "{name}");
		assert_eq!(store.pending_counts().unwrap(), vec![(f.file.clone(), 1)], "{name}");
	}
}

#[test]
fn test_pending_order_and_minimum() {
	for (name, store) in backends() {
		let a = SubscriberId::new("a");
		store.enqueue(&a, &file("late", "2020-01-03")).unwrap();
		store.enqueue(&a, &file("early", "2020-01-02")).unwrap();

		let pending = store.list_pending(&a).unwrap();
		let ids: Vec<_> = pending.iter().map(|o| o.file.file_id.as_str()).collect();
		assert_eq!(ids, vec!["early", "late"], "{name}");
		assert_eq!(store.min_pending_ingestion(&a).unwrap(), Some(ts("2020-01-02")), "{name}");
		assert_eq!(store.min_pending_ingestion(&SubscriberId::new("x")).unwrap(), None, "{name}");
	}
}

#[test]
fn test_record_failure() {
	for (name, store) in backends() {
		let a = SubscriberId::new("a");
		let f = file("obs-1", "2020-01-02");
		store.enqueue(&a, &f).unwrap();
		store.record_failure(&a, &f.file, "connection refused").unwrap();
		store.record_failure(&a, &f.file, "503 service unavailable").unwrap();

		let pending = store.list_pending(&a).unwrap();
		assert_eq!(pending[0].attempts, 2, "{name}");
		assert_eq!(pending[0].last_error.as_deref(), Some("503 service unavailable"), "{name}");
	}
}

#[test]
fn test_clear_subscriber_releases_rows() {
	for (name, store) in backends() {
		let a = SubscriberId::new("a");
		let b = SubscriberId::new("b");
		store.enqueue(&a, &file("one", "2020-01-02")).unwrap();
		store.enqueue(&a, &file("two", "2020-01-03")).unwrap();
		store.enqueue(&b, &file("one", "2020-01-02")).unwrap();

		let mut released = store.clear_subscriber(&a).unwrap();
		released.sort();
		assert_eq!(released, vec![FileRef::new("one", 1, "disk-1"), FileRef::new("two", 1, "disk-1")], "{name}");
		assert!(store.list_pending(&a).unwrap().is_empty(), "{name}");
		assert_eq!(store.list_pending(&b).unwrap().len(), 1, "{name}");
	}
}

#[test]
fn test_remove_subscriber_takes_its_rows_along() {
	for (name, store) in backends() {
		let a = subscriber("a");
		store.insert_subscriber(&a).unwrap();
		store.insert_subscriber(&subscriber("b")).unwrap();
		store.enqueue(&a.id, &file("one", "2020-01-02")).unwrap();
		store.enqueue(&a.id, &file("two", "2020-01-03")).unwrap();
		store.enqueue(&SubscriberId::new("b"), &file("one", "2020-01-02")).unwrap();

		let mut released = store.remove_subscriber(&a.id).unwrap();
		released.sort();
		assert_eq!(released, vec![FileRef::new("one", 1, "disk-1"), FileRef::new("two", 1, "disk-1")], "{name}");

		let remaining: Vec<_> = store.load_subscribers().unwrap().into_iter().map(|s| s.id).collect();
		assert_eq!(remaining, vec![SubscriberId::new("b")], "{name}");
		let counts = store.pending_counts().unwrap();
		assert_eq!(counts, vec![(FileRef::new("one", 1, "disk-1"), 1)], "{name}");

		assert!(store.remove_subscriber(&a.id).unwrap().is_empty(), "{name}");
	}
}

#[test]
fn test_files_ingested_after_pages_in_order() {
	for (name, store) in backends() {
		store.register_file(&file("c", "2020-01-03")).unwrap();
		store.register_file(&file("a", "2020-01-02")).unwrap();
		store.register_file(&file("b", "2020-01-02")).unwrap();

		let all = store.files_ingested_after(None, 10).unwrap();
		let ids: Vec<_> = all.iter().map(|m| m.file.file_id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b", "c"], "{name}");

		let first = store.files_ingested_after(None, 1).unwrap();
		let rest = store.files_ingested_after(Some(&FileCursor::after_file(&first[0])), 10).unwrap();
		let ids: Vec<_> = rest.iter().map(|m| m.file.file_id.as_str()).collect();
		assert_eq!(ids, vec!["b", "c"], "{name}");

		let after = store.files_ingested_after(Some(&FileCursor::after_date(ts("2020-01-02"))), 10).unwrap();
		assert_eq!(after.len(), 1, "{name}");
		assert_eq!(after[0].file.file_id, "c", "{name}");
	}
}
