// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! In-memory backend. Same contract as the SQLite backend, without durability.

use std::{
	collections::{BTreeMap, HashMap},
	sync::Arc,
};

use arkiv_type::{Error, FileMeta, FileRef, Result, Subscriber, SubscriberId, Timestamp};
use parking_lot::RwLock;

use crate::backend::{DeliveryStore, FileCatalog, FileCursor, Obligation, SubscriberStore};

#[derive(Clone, Default)]
pub struct MemoryStore {
	inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
	subscribers: RwLock<BTreeMap<SubscriberId, Subscriber>>,
	queue: RwLock<BTreeMap<(SubscriberId, FileRef), Obligation>>,
	files: RwLock<BTreeMap<(Timestamp, FileRef), FileMeta>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SubscriberStore for MemoryStore {
	fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
		let mut subscribers = self.inner.subscribers.write();
		if subscribers.contains_key(&subscriber.id) {
			return Err(Error::persistence(format!("subscriber {} already stored", subscriber.id)));
		}
		subscribers.insert(subscriber.id.clone(), subscriber.clone());
		Ok(())
	}

	fn update_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
		let mut subscribers = self.inner.subscribers.write();
		match subscribers.get_mut(&subscriber.id) {
			Some(stored) => {
				*stored = subscriber.clone();
				Ok(())
			}
			None => Err(Error::not_found(format!("subscriber {}", subscriber.id))),
		}
	}

	fn delete_subscriber(&self, id: &SubscriberId) -> Result<bool> {
		Ok(self.inner.subscribers.write().remove(id).is_some())
	}

	fn remove_subscriber(&self, id: &SubscriberId) -> Result<Vec<FileRef>> {
		let mut subscribers = self.inner.subscribers.write();
		let mut queue = self.inner.queue.write();
		subscribers.remove(id);
		let keys: Vec<_> = queue.keys().filter(|(s, _)| s == id).cloned().collect();
		Ok(keys.into_iter().filter_map(|key| queue.remove(&key)).map(|o| o.file).collect())
	}

	fn load_subscribers(&self) -> Result<Vec<Subscriber>> {
		Ok(self.inner.subscribers.read().values().cloned().collect())
	}

	fn set_watermark(&self, id: &SubscriberId, watermark: Option<Timestamp>) -> Result<()> {
		let mut subscribers = self.inner.subscribers.write();
		let subscriber = subscribers.get_mut(id).ok_or_else(|| Error::not_found(format!("subscriber {}", id)))?;
		subscriber.last_file_ingestion_date = watermark;
		Ok(())
	}
}

impl DeliveryStore for MemoryStore {
	fn enqueue(&self, subscriber: &SubscriberId, file: &FileMeta) -> Result<()> {
		let mut queue = self.inner.queue.write();
		let key = (subscriber.clone(), file.file.clone());
		if queue.contains_key(&key) {
			return Err(Error::DuplicateObligation {
				subscriber: subscriber.clone(),
				file: file.file.clone(),
			});
		}
		queue.insert(
			key,
			Obligation {
				subscriber: subscriber.clone(),
				file: file.file.clone(),
				ingestion_date: file.ingestion_date,
				enqueued_at: Timestamp::now(),
				attempts: 0,
				last_error: None,
			},
		);
		Ok(())
	}

	fn dequeue(&self, subscriber: &SubscriberId, file: &FileRef) -> Result<u64> {
		let mut queue = self.inner.queue.write();
		if queue.remove(&(subscriber.clone(), file.clone())).is_none() {
			return Err(Error::not_found(format!("obligation {} for {}", file, subscriber)));
		}
		Ok(queue.keys().filter(|(_, f)| f == file).count() as u64)
	}

	fn list_pending(&self, subscriber: &SubscriberId) -> Result<Vec<Obligation>> {
		let queue = self.inner.queue.read();
		let mut pending: Vec<Obligation> =
			queue.values().filter(|o| &o.subscriber == subscriber).cloned().collect();
		pending.sort_by(|a, b| (a.ingestion_date, &a.file).cmp(&(b.ingestion_date, &b.file)));
		Ok(pending)
	}

	fn list_pending_for_file(&self, file: &FileRef) -> Result<Vec<Obligation>> {
		Ok(self.inner.queue.read().values().filter(|o| &o.file == file).cloned().collect())
	}

	fn record_failure(&self, subscriber: &SubscriberId, file: &FileRef, error: &str) -> Result<()> {
		let mut queue = self.inner.queue.write();
		let obligation = queue
			.get_mut(&(subscriber.clone(), file.clone()))
			.ok_or_else(|| Error::not_found(format!("obligation {} for {}", file, subscriber)))?;
		obligation.attempts += 1;
		obligation.last_error = Some(error.to_string());
		Ok(())
	}

	fn pending_counts(&self) -> Result<Vec<(FileRef, u64)>> {
		let mut counts: HashMap<FileRef, u64> = HashMap::new();
		for (_, file) in self.inner.queue.read().keys() {
			*counts.entry(file.clone()).or_default() += 1;
		}
		Ok(counts.into_iter().collect())
	}

	fn min_pending_ingestion(&self, subscriber: &SubscriberId) -> Result<Option<Timestamp>> {
		Ok(self.inner.queue.read().values().filter(|o| &o.subscriber == subscriber).map(|o| o.ingestion_date).min())
	}

	fn clear_subscriber(&self, subscriber: &SubscriberId) -> Result<Vec<FileRef>> {
		let mut queue = self.inner.queue.write();
		let keys: Vec<_> = queue.keys().filter(|(s, _)| s == subscriber).cloned().collect();
		Ok(keys.into_iter().filter_map(|key| queue.remove(&key)).map(|o| o.file).collect())
	}
}

impl FileCatalog for MemoryStore {
	fn register_file(&self, file: &FileMeta) -> Result<()> {
		let mut files = self.inner.files.write();
		files.retain(|(_, f), _| f != &file.file);
		files.insert((file.ingestion_date, file.file.clone()), file.clone());
		Ok(())
	}

	fn get_file(&self, file: &FileRef) -> Result<Option<FileMeta>> {
		Ok(self.inner.files.read().values().find(|m| &m.file == file).cloned())
	}

	fn files_ingested_after(&self, after: Option<&FileCursor>, limit: usize) -> Result<Vec<FileMeta>> {
		let files = self.inner.files.read();
		Ok(files.values().filter(|meta| after.map(|c| c.precedes(meta)).unwrap_or(true)).take(limit).cloned().collect())
	}
}
