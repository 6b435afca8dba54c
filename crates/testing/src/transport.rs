// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! A transport that records deliveries instead of sending them.

use std::{
	collections::{HashMap, HashSet},
	sync::atomic::{AtomicUsize, Ordering},
	thread,
	time::Duration,
};

use arkiv_subscription::{Delivery, Transport};
use arkiv_type::{Error, FileRef, Result, Subscriber, SubscriberId, Timestamp};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
	pub subscriber: SubscriberId,
	pub url: String,
	pub file: FileRef,
	pub ingestion_date: Timestamp,
	pub body: Vec<u8>,
}

#[derive(Default)]
pub struct RecordingTransport {
	delivered: Mutex<Vec<Recorded>>,
	/// Failures still to be returned per file id, consumed one per attempt.
	scripted: Mutex<HashMap<String, Vec<Error>>>,
	broken: Mutex<HashMap<String, Error>>,
	unreachable: Mutex<HashSet<SubscriberId>>,
	unreachable_urls: Mutex<HashSet<String>>,
	latency: Mutex<Duration>,
	attempts: AtomicUsize,
	active: AtomicUsize,
	max_active: AtomicUsize,
}

impl RecordingTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// The next `times` attempts for `file_id` fail with a transient error.
	pub fn fail_next(&self, file_id: &str, times: usize) {
		let errors = (0..times).map(|i| Error::DeliveryTransient(format!("scripted failure {}", i + 1))).collect();
		self.scripted.lock().insert(file_id.to_string(), errors);
	}

	/// Every attempt for `file_id` fails with `error` until [`Self::heal`] is called.
	pub fn fail_always(&self, file_id: &str, error: Error) {
		self.broken.lock().insert(file_id.to_string(), error);
	}

	pub fn heal(&self, file_id: &str) {
		self.broken.lock().remove(file_id);
		self.scripted.lock().remove(file_id);
	}

	/// Every attempt towards `subscriber` fails transiently until [`Self::reconnect`].
	pub fn disconnect(&self, subscriber: &SubscriberId) {
		self.unreachable.lock().insert(subscriber.clone());
	}

	pub fn reconnect(&self, subscriber: &SubscriberId) {
		self.unreachable.lock().remove(subscriber);
	}

	/// Like [`Self::disconnect`], but for one endpoint url whatever subscriber uses it.
	pub fn disconnect_url(&self, url: &str) {
		self.unreachable_urls.lock().insert(url.to_string());
	}

	pub fn reconnect_url(&self, url: &str) {
		self.unreachable_urls.lock().remove(url);
	}

	/// Every push blocks for `latency` before it is recorded.
	pub fn set_latency(&self, latency: Duration) {
		*self.latency.lock() = latency;
	}

	pub fn deliveries(&self) -> Vec<Recorded> {
		self.delivered.lock().clone()
	}

	pub fn delivered_count(&self) -> usize {
		self.delivered.lock().len()
	}

	pub fn delivered_to_url(&self, url: &str) -> Vec<FileRef> {
		self.delivered.lock().iter().filter(|r| r.url == url).map(|r| r.file.clone()).collect()
	}

	pub fn delivered_to(&self, subscriber: &SubscriberId) -> Vec<FileRef> {
		self.delivered.lock().iter().filter(|r| &r.subscriber == subscriber).map(|r| r.file.clone()).collect()
	}

	pub fn delivered_ids(&self, subscriber: &SubscriberId) -> Vec<String> {
		let mut ids: Vec<_> = self.delivered_to(subscriber).into_iter().map(|f| f.file_id).collect();
		ids.sort();
		ids
	}

	/// Total push attempts, successful or not.
	pub fn attempts(&self) -> usize {
		self.attempts.load(Ordering::SeqCst)
	}

	/// Highest number of pushes observed running at the same time.
	pub fn max_concurrency(&self) -> usize {
		self.max_active.load(Ordering::SeqCst)
	}

	fn scripted_failure(&self, subscriber: &Subscriber, file_id: &str) -> Option<Error> {
		if self.unreachable.lock().contains(&subscriber.id) {
			return Some(Error::DeliveryTransient(format!("{} unreachable", subscriber.id)));
		}
		if self.unreachable_urls.lock().contains(&subscriber.url) {
			return Some(Error::DeliveryTransient(format!("{} unreachable", subscriber.url)));
		}
		if let Some(error) = self.broken.lock().get(file_id) {
			return Some(error.clone());
		}
		let mut scripted = self.scripted.lock();
		let errors = scripted.get_mut(file_id)?;
		let error = errors.pop();
		if errors.is_empty() {
			scripted.remove(file_id);
		}
		error
	}
}

impl Transport for RecordingTransport {
	fn push(&self, subscriber: &Subscriber, delivery: Delivery<'_>) -> Result<()> {
		self.attempts.fetch_add(1, Ordering::SeqCst);
		let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_active.fetch_max(active, Ordering::SeqCst);

		let latency = *self.latency.lock();
		if !latency.is_zero() {
			thread::sleep(latency);
		}

		let result = match self.scripted_failure(subscriber, &delivery.file.file.file_id) {
			Some(error) => Err(error),
			None => {
				self.delivered.lock().push(Recorded {
					subscriber: subscriber.id.clone(),
					url: subscriber.url.clone(),
					file: delivery.file.file.clone(),
					ingestion_date: delivery.file.ingestion_date,
					body: delivery.body,
				});
				Ok(())
			}
		};

		self.active.fetch_sub(1, Ordering::SeqCst);
		result
	}
}
