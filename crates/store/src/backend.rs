// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Storage traits for subscribers, the durable delivery queue and the archive file catalog.

use std::cmp::Ordering;

use arkiv_type::{FileMeta, FileRef, Result, Subscriber, SubscriberId, Timestamp};
use serde::{Deserialize, Serialize};

/// A durable record that `file` must still be delivered to `subscriber`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
	pub subscriber: SubscriberId,
	pub file: FileRef,
	pub ingestion_date: Timestamp,
	pub enqueued_at: Timestamp,
	pub attempts: u32,
	pub last_error: Option<String>,
}

/// Position in the archive's ingestion order.
///
/// With `file` unset the cursor means "strictly after every file ingested at
/// `ingestion_date`", which is how a watermark is turned into a scan position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCursor {
	pub ingestion_date: Timestamp,
	pub file: Option<FileRef>,
}

impl FileCursor {
	pub fn after_date(ingestion_date: Timestamp) -> Self {
		Self {
			ingestion_date,
			file: None,
		}
	}

	pub fn after_file(meta: &FileMeta) -> Self {
		Self {
			ingestion_date: meta.ingestion_date,
			file: Some(meta.file.clone()),
		}
	}

	/// True when `meta` lies strictly after this cursor.
	pub fn precedes(&self, meta: &FileMeta) -> bool {
		match meta.ingestion_date.cmp(&self.ingestion_date) {
			Ordering::Greater => true,
			Ordering::Less => false,
			Ordering::Equal => match &self.file {
				None => false,
				Some(file) => &meta.file > file,
			},
		}
	}
}

pub trait SubscriberStore: Send + Sync {
	/// Fails with `Persistence` if the id is already stored.
	fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<()>;

	/// Fails with `NotFound` if the id is not stored.
	fn update_subscriber(&self, subscriber: &Subscriber) -> Result<()>;

	/// Returns false when nothing was deleted.
	fn delete_subscriber(&self, id: &SubscriberId) -> Result<bool>;

	/// Deletes the subscriber together with all of its queue rows, atomically,
	/// and returns the released file references.
	fn remove_subscriber(&self, id: &SubscriberId) -> Result<Vec<FileRef>>;

	fn load_subscribers(&self) -> Result<Vec<Subscriber>>;

	fn set_watermark(&self, id: &SubscriberId, watermark: Option<Timestamp>) -> Result<()>;
}

pub trait DeliveryStore: Send + Sync {
	/// Fails with `DuplicateObligation` if the row already exists.
	fn enqueue(&self, subscriber: &SubscriberId, file: &FileMeta) -> Result<()>;

	/// Removes the row and returns how many obligations for `file` remain across
	/// all subscribers. Fails with `NotFound` if there was no such row.
	fn dequeue(&self, subscriber: &SubscriberId, file: &FileRef) -> Result<u64>;

	/// Pending obligations of one subscriber, oldest ingestion first.
	fn list_pending(&self, subscriber: &SubscriberId) -> Result<Vec<Obligation>>;

	fn list_pending_for_file(&self, file: &FileRef) -> Result<Vec<Obligation>>;

	/// Bumps the attempt counter and remembers the last error.
	fn record_failure(&self, subscriber: &SubscriberId, file: &FileRef, error: &str) -> Result<()>;

	/// Outstanding obligation count per file, across all subscribers.
	fn pending_counts(&self) -> Result<Vec<(FileRef, u64)>>;

	fn min_pending_ingestion(&self, subscriber: &SubscriberId) -> Result<Option<Timestamp>>;

	/// Drops every row of the subscriber and returns the released file references.
	fn clear_subscriber(&self, subscriber: &SubscriberId) -> Result<Vec<FileRef>>;
}

/// The archive's own record of stored files. Owned by the archive; the
/// subscription subsystem only reads it, apart from `register_file`.
pub trait FileCatalog: Send + Sync {
	fn register_file(&self, file: &FileMeta) -> Result<()>;

	fn get_file(&self, file: &FileRef) -> Result<Option<FileMeta>>;

	/// Files strictly after `after` in `(ingestion_date, file)` order, at most `limit`.
	fn files_ingested_after(&self, after: Option<&FileCursor>, limit: usize) -> Result<Vec<FileMeta>>;
}

/// Everything the delivery engine needs from durable storage.
pub trait Backend: SubscriberStore + DeliveryStore + FileCatalog {}

impl<T> Backend for T where T: SubscriberStore + DeliveryStore + FileCatalog {}

#[cfg(test)]
mod tests {
	use super::*;

	fn meta(id: &str, date: &str) -> FileMeta {
		FileMeta::new(FileRef::new(id, 1, "d1"), Timestamp::parse(date).unwrap(), "application/fits")
	}

	#[test]
	fn test_cursor_after_date_excludes_same_date() {
		let cursor = FileCursor::after_date(Timestamp::parse("2020-01-02").unwrap());
		assert!(!cursor.precedes(&meta("a", "2020-01-02")));
		assert!(!cursor.precedes(&meta("a", "2020-01-01")));
		assert!(cursor.precedes(&meta("a", "2020-01-03")));
	}

	#[test]
	fn test_cursor_after_file_breaks_ties_by_ref() {
		let cursor = FileCursor::after_file(&meta("b", "2020-01-02"));
		assert!(!cursor.precedes(&meta("a", "2020-01-02")));
		assert!(!cursor.precedes(&meta("b", "2020-01-02")));
		assert!(cursor.precedes(&meta("c", "2020-01-02")));
	}
}
