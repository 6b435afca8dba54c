// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! In-memory queue feeding one subscriber's workers.
//!
//! Mirrors the durable queue: every item here has a pending obligation in
//! storage. A file is tracked from the moment it is pushed until a worker
//! completes or releases it, so the same file is never handed to two workers.

use std::{
	collections::{BTreeMap, HashSet},
	time::{Duration, Instant},
};

use arkiv_type::{FileMeta, FileRef, Timestamp};
use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct QueueState {
	ready: BTreeMap<(Timestamp, FileRef), FileMeta>,
	in_flight: HashSet<FileRef>,
	/// Files completed since the current resync began.
	resync: Option<HashSet<FileRef>>,
	closed: bool,
}

impl QueueState {
	fn tracks(&self, meta: &FileMeta) -> bool {
		self.in_flight.contains(&meta.file) || self.ready.contains_key(&(meta.ingestion_date, meta.file.clone()))
	}
}

#[derive(Default)]
pub struct PendingQueue {
	state: Mutex<QueueState>,
	available: Condvar,
}

impl PendingQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a file unless it is already queued or in flight. Returns true when added.
	pub fn push(&self, meta: FileMeta) -> bool {
		let mut state = self.state.lock();
		if state.closed || state.tracks(&meta) {
			return false;
		}
		state.ready.insert((meta.ingestion_date, meta.file.clone()), meta);
		drop(state);
		self.available.notify_one();
		true
	}

	/// Takes the oldest queued file, waiting up to `timeout` for one to arrive.
	pub fn take(&self, timeout: Duration) -> Option<FileMeta> {
		let deadline = Instant::now() + timeout;
		let mut state = self.state.lock();
		loop {
			if state.closed {
				return None;
			}
			if let Some((_, meta)) = state.ready.pop_first() {
				state.in_flight.insert(meta.file.clone());
				return Some(meta);
			}
			if self.available.wait_until(&mut state, deadline).timed_out() {
				return None;
			}
		}
	}

	/// Marks an in-flight file as delivered and removed from durable storage.
	pub fn complete(&self, file: &FileRef) {
		let mut state = self.state.lock();
		state.in_flight.remove(file);
		if let Some(done) = state.resync.as_mut() {
			done.insert(file.clone());
		}
	}

	/// Stops tracking an in-flight file that is still pending durably, so a
	/// later resync may queue it again.
	pub fn release(&self, file: &FileRef) {
		self.state.lock().in_flight.remove(file);
	}

	/// Puts an in-flight file back at its place in the queue, for another worker to take.
	pub fn requeue(&self, meta: FileMeta) {
		let mut state = self.state.lock();
		state.in_flight.remove(&meta.file);
		if state.closed {
			return;
		}
		state.ready.insert((meta.ingestion_date, meta.file.clone()), meta);
		drop(state);
		self.available.notify_one();
	}

	/// Starts a resync against durable storage. Must be called before the
	/// pending obligations are read.
	pub fn begin_resync(&self) {
		self.state.lock().resync = Some(HashSet::new());
	}

	/// Queues every durable pending file that is neither tracked nor completed
	/// since [`Self::begin_resync`]. Returns how many were added.
	pub fn finish_resync(&self, pending: Vec<FileMeta>) -> usize {
		let mut state = self.state.lock();
		let done = state.resync.take().unwrap_or_default();
		if state.closed {
			return 0;
		}
		let mut added = 0;
		for meta in pending {
			if done.contains(&meta.file) || state.tracks(&meta) {
				continue;
			}
			state.ready.insert((meta.ingestion_date, meta.file.clone()), meta);
			added += 1;
		}
		drop(state);
		if added > 0 {
			self.available.notify_all();
		}
		added
	}

	/// Drops every queued file and wakes all waiting workers. Later pushes are ignored.
	pub fn close(&self) {
		let mut state = self.state.lock();
		state.closed = true;
		state.ready.clear();
		drop(state);
		self.available.notify_all();
	}

	pub fn queued(&self) -> usize {
		self.state.lock().ready.len()
	}

	pub fn in_flight(&self) -> usize {
		self.state.lock().in_flight.len()
	}

	pub fn contains(&self, file: &FileRef) -> bool {
		let state = self.state.lock();
		state.in_flight.contains(file) || state.ready.values().any(|m| &m.file == file)
	}
}
