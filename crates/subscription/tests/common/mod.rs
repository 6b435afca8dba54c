// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

#![allow(dead_code)]

use std::sync::Arc;

use arkiv_store::{Backend, MemoryStore};
use arkiv_subscription::{
	ChannelEvictionListener, DeliveryEngine, EvictionEligible, FilterRegistry, SubscribeRequest, SubscriberStatus,
};
use arkiv_testing::{MemoryContent, RecordingTransport, fast_config};
use arkiv_type::{FileRef, Subscriber, SubscriberId, SubscriberUpdate};
use crossbeam_channel::Receiver;

pub struct Harness {
	pub engine: DeliveryEngine,
	pub store: Arc<dyn Backend>,
	pub transport: Arc<RecordingTransport>,
	pub content: Arc<MemoryContent>,
	pub evictions: Receiver<EvictionEligible>,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_store(Arc::new(MemoryStore::new()))
	}

	pub fn with_store(store: Arc<dyn Backend>) -> Self {
		Self::with_parts(store, Arc::new(RecordingTransport::new()))
	}

	pub fn with_parts(store: Arc<dyn Backend>, transport: Arc<RecordingTransport>) -> Self {
		Self::build(store, transport, FilterRegistry::with_builtins())
	}

	pub fn with_filters(filters: FilterRegistry) -> Self {
		Self::build(Arc::new(MemoryStore::new()), Arc::new(RecordingTransport::new()), filters)
	}

	fn build(store: Arc<dyn Backend>, transport: Arc<RecordingTransport>, filters: FilterRegistry) -> Self {
		let content = Arc::new(MemoryContent::new());
		let (listener, evictions) = ChannelEvictionListener::new();
		let engine = DeliveryEngine::builder(store.clone())
			.transport(transport.clone())
			.content(content.clone())
			.filters(filters)
			.config(fast_config())
			.eviction_listener(listener)
			.build()
			.unwrap();
		engine.start().unwrap();
		Self {
			engine,
			store,
			transport,
			content,
			evictions,
		}
	}

	/// Subscribes `http://mirror/{id}` under the identifier `id`.
	pub fn subscribe(&self, id: &str, start_date: &str, threads: u32) -> Subscriber {
		let request = SubscribeRequest::new(format!("http://mirror/{}", id))
			.subscriber_id(id)
			.start_date(arkiv_testing::ts(start_date))
			.concurrent_threads(threads);
		self.engine.service().subscribe(request).unwrap().subscriber().clone()
	}

	pub fn update(&self, id: &str, update: SubscriberUpdate) -> Subscriber {
		self.engine.service().update(&SubscriberId::new(id), update).unwrap()
	}

	pub fn suspend(&self, id: &str, suspend: bool) {
		self.update(
			id,
			SubscriberUpdate {
				suspend: Some(suspend),
				..Default::default()
			},
		);
	}

	pub fn archive(&self, id: &str, date: &str) -> FileRef {
		let meta = arkiv_testing::file(id, date);
		self.engine.archive(&meta).unwrap();
		meta.file
	}

	pub fn status(&self, id: &str) -> SubscriberStatus {
		self.engine.service().status(&SubscriberId::new(id)).unwrap()
	}

	pub fn subscriber(&self, id: &str) -> Subscriber {
		self.engine.service().get(&SubscriberId::new(id)).unwrap()
	}

	pub fn pending(&self, id: &str) -> usize {
		self.store.list_pending(&SubscriberId::new(id)).unwrap().len()
	}

	pub fn delivered_ids(&self, id: &str) -> Vec<String> {
		self.transport.delivered_ids(&SubscriberId::new(id))
	}

	pub fn count(&self, file: &FileRef) -> u64 {
		self.engine.coordinator().count(file)
	}

	pub fn drain_evictions(&self) -> Vec<FileRef> {
		self.evictions.try_iter().map(|e| e.file).collect()
	}
}
