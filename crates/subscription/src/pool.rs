// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Per-subscriber worker pool.
//!
//! Each subscriber owns a pool of delivery threads sharing one in-memory
//! queue, one suspend gate and one sentinel set. Resizing is cooperative:
//! growing admits fresh workers, shrinking withdraws the highest identifiers
//! and the affected workers exit after their current item.
//!
//! Every pool also has its own dispatch thread, so a slow filter on one
//! subscriber never holds back dispatch for another.

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	thread::{self, JoinHandle},
};

use arkiv_store::FileCursor;
use arkiv_type::{Error, FileMeta, Result, Subscriber, SubscriberId};
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::{
	context::DeliveryContext,
	dispatch,
	queue::PendingQueue,
	sentinel::{SentinelSet, SuspendGate},
	watermark::WatermarkTracker,
	worker,
};

/// Progress of dispatch for one subscriber. Guarded by the pool's dispatch lock,
/// which also serializes dispatch passes for the subscriber.
#[derive(Debug, Default)]
pub(crate) struct DispatchState {
	/// Last catalog position considered. `None` restarts from the watermark.
	pub cursor: Option<FileCursor>,
}

#[derive(Debug, Default)]
pub(crate) struct PoolStats {
	pub delivered: AtomicU64,
	pub failed_attempts: AtomicU64,
}

pub struct SubscriberPool {
	id: SubscriberId,
	subscriber: RwLock<Subscriber>,
	control: Mutex<()>,
	pub(crate) dispatch: Mutex<DispatchState>,
	pub(crate) watermark: Mutex<WatermarkTracker>,
	pub(crate) queue: PendingQueue,
	pub(crate) gate: SuspendGate,
	pub(crate) stats: PoolStats,
	pub(crate) ctx: Arc<DeliveryContext>,
	sentinels: Arc<SentinelSet>,
	workers: Mutex<Vec<JoinHandle<()>>>,
	/// Holds at most one wake-up, so requests made during a pass coalesce.
	wake: (Sender<()>, Receiver<()>),
	dispatcher: Mutex<Option<JoinHandle<()>>>,
	retired: AtomicBool,
	removed: AtomicBool,
}

impl SubscriberPool {
	pub(crate) fn new(subscriber: Subscriber, ctx: Arc<DeliveryContext>) -> Arc<Self> {
		Arc::new(Self {
			id: subscriber.id.clone(),
			gate: SuspendGate::new(!subscriber.suspended),
			subscriber: RwLock::new(subscriber),
			control: Mutex::new(()),
			dispatch: Mutex::new(DispatchState::default()),
			watermark: Mutex::new(WatermarkTracker::new()),
			queue: PendingQueue::new(),
			stats: PoolStats::default(),
			ctx,
			sentinels: Arc::new(SentinelSet::new()),
			workers: Mutex::new(Vec::new()),
			wake: bounded(1),
			dispatcher: Mutex::new(None),
			retired: AtomicBool::new(false),
			removed: AtomicBool::new(false),
		})
	}

	pub fn id(&self) -> &SubscriberId {
		&self.id
	}

	pub fn subscriber(&self) -> Subscriber {
		self.subscriber.read().clone()
	}

	pub(crate) fn set_subscriber(&self, subscriber: Subscriber) {
		*self.subscriber.write() = subscriber;
	}

	/// Serializes control-surface writes for this subscriber.
	pub(crate) fn control(&self) -> MutexGuard<'_, ()> {
		self.control.lock()
	}

	/// Spawns the dispatch thread and workers up to the configured thread count.
	pub(crate) fn start(self: &Arc<Self>) -> Result<()> {
		self.spawn_dispatcher()?;
		let threads = self.subscriber.read().concurrent_threads;
		self.resize(threads)
	}

	fn spawn_dispatcher(self: &Arc<Self>) -> Result<()> {
		let mut dispatcher = self.dispatcher.lock();
		if dispatcher.is_some() {
			return Ok(());
		}
		let pool = self.clone();
		let wake = self.wake.1.clone();
		let handle = thread::Builder::new()
			.name(format!("dispatch-{}", self.id))
			.spawn(move || dispatch::run_pool(pool, wake))
			.map_err(|e| Error::internal(format!("failed to spawn dispatcher for {}: {}", self.id, e)))?;
		*dispatcher = Some(handle);
		Ok(())
	}

	/// Asks the pool's dispatch thread for a pass. Never blocks.
	pub fn request_dispatch(&self) {
		let _ = self.wake.0.try_send(());
	}

	/// Converges the number of authorized workers to `threads`.
	#[instrument(name = "subscription::pool::resize", level = "debug", skip(self), fields(subscriber = %self.id))]
	pub fn resize(self: &Arc<Self>, threads: u32) -> Result<()> {
		if self.is_retired() {
			return Ok(());
		}
		self.workers.lock().retain(|handle| !handle.is_finished());

		let target = threads as usize;
		let live = self.sentinels.len();
		if target < live {
			let revoked = self.sentinels.revoke_highest(live - target);
			debug!(revoked = ?revoked, "shrinking worker pool");
		}
		for _ in live..target {
			self.spawn_worker()?;
		}
		Ok(())
	}

	fn spawn_worker(self: &Arc<Self>) -> Result<()> {
		let token = self.sentinels.admit();
		let pool = self.clone();
		let worker_token = token.clone();
		let spawned = thread::Builder::new()
			.name(format!("deliver-{}-{}", self.id, token.id()))
			.spawn(move || worker::run(pool, worker_token));
		match spawned {
			Ok(handle) => {
				self.workers.lock().push(handle);
				Ok(())
			}
			Err(e) => {
				self.sentinels.revoke(token.id());
				Err(Error::internal(format!("failed to spawn worker for {}: {}", self.id, e)))
			}
		}
	}

	pub fn suspend(&self) {
		self.gate.suspend();
	}

	pub fn resume(&self) {
		self.gate.resume();
	}

	pub fn is_suspended(&self) -> bool {
		!self.gate.is_running()
	}

	/// Number of workers currently authorized to run.
	pub fn worker_count(&self) -> usize {
		self.sentinels.len()
	}

	/// Number of worker threads that have not exited yet, including revoked
	/// workers still finishing their current item.
	pub fn live_threads(&self) -> usize {
		self.workers.lock().iter().filter(|handle| !handle.is_finished()).count()
	}

	pub fn is_retired(&self) -> bool {
		self.retired.load(Ordering::SeqCst)
	}

	/// Stops the pool for good: withdraws every worker, wakes suspended ones,
	/// stops the dispatch thread and drops the in-memory queue. Durable
	/// obligations are untouched.
	pub(crate) fn retire(&self) {
		self.retired.store(true, Ordering::SeqCst);
		self.sentinels.revoke_all();
		self.gate.resume();
		self.queue.close();
		self.request_dispatch();
	}

	/// Retires the pool because its subscriber was removed. From here on no
	/// worker of this pool records anything in storage.
	pub(crate) fn remove(&self) {
		self.removed.store(true, Ordering::SeqCst);
		self.retire();
	}

	fn is_removed(&self) -> bool {
		self.removed.load(Ordering::SeqCst)
	}

	/// Waits for the dispatch thread and every worker thread to exit.
	/// Must not be called from a pool thread.
	pub(crate) fn join(&self) {
		if let Some(handle) = self.dispatcher.lock().take() {
			if handle.join().is_err() {
				error!(subscriber = %self.id, "dispatch thread panicked");
			}
		}
		let handles: Vec<_> = self.workers.lock().drain(..).collect();
		for handle in handles {
			if handle.join().is_err() {
				error!(subscriber = %self.id, "delivery worker panicked");
			}
		}
	}

	/// Queues every durable obligation of this subscriber that is not already
	/// queued or in flight. Returns how many files were added.
	pub(crate) fn resync(&self) -> Result<usize> {
		self.queue.begin_resync();
		let pending = self.pending_files();
		let pending = match pending {
			Ok(pending) => pending,
			Err(e) => {
				self.queue.finish_resync(Vec::new());
				return Err(e);
			}
		};
		let added = self.queue.finish_resync(pending);
		if added > 0 {
			debug!(subscriber = %self.id, added, "requeued pending obligations");
		}
		Ok(added)
	}

	fn pending_files(&self) -> Result<Vec<FileMeta>> {
		let store = &self.ctx.store;
		let mut files = Vec::new();
		for obligation in store.list_pending(&self.id)? {
			if self.queue.contains(&obligation.file) {
				continue;
			}
			match store.get_file(&obligation.file)? {
				Some(meta) => files.push(meta),
				None => warn!(subscriber = %self.id, file = %obligation.file, "pending file missing from catalog"),
			}
		}
		Ok(files)
	}

	/// Bookkeeping after a successful push: remove the durable obligation,
	/// release the file reference and try to move the watermark.
	///
	/// Runs under the watermark lock, which an unsubscribe holds while it
	/// removes the pool. A removed pool never touches storage again, so a
	/// late completion cannot remove an obligation that belongs to a new
	/// subscription under the same id.
	pub(crate) fn complete_delivery(&self, meta: &FileMeta) {
		let mut tracker = self.watermark.lock();
		if self.is_removed() {
			debug!(subscriber = %self.id, file = %meta.file, "subscriber removed, delivery not recorded");
			self.queue.complete(&meta.file);
			return;
		}

		match self.ctx.store.dequeue(&self.id, &meta.file) {
			Ok(remaining) => {
				let left = self.ctx.coordinator.decrement(&meta.file);
				if left != remaining {
					warn!(file = %meta.file, memory = left, durable = remaining, "reference count diverged from storage");
				}
			}
			Err(Error::NotFound(_)) => {
				debug!(subscriber = %self.id, file = %meta.file, "obligation already released");
				self.queue.complete(&meta.file);
				return;
			}
			Err(e) => {
				error!(subscriber = %self.id, file = %meta.file, err = %e, "failed to remove delivered obligation");
				self.queue.release(&meta.file);
				return;
			}
		}

		self.queue.complete(&meta.file);
		self.stats.delivered.fetch_add(1, Ordering::Relaxed);

		tracker.record_delivered(meta.ingestion_date);
		self.advance_watermark(&mut tracker);
	}

	pub(crate) fn record_failure(&self, meta: &FileMeta, err: &Error) {
		self.stats.failed_attempts.fetch_add(1, Ordering::Relaxed);
		let _tracker = self.watermark.lock();
		if self.is_removed() {
			return;
		}
		match self.ctx.store.record_failure(&self.id, &meta.file, &err.to_string()) {
			Ok(()) | Err(Error::NotFound(_)) => {}
			Err(e) => warn!(subscriber = %self.id, file = %meta.file, err = %e, "failed to record delivery failure"),
		}
	}

	/// Persists a new watermark if the tracker allows one. The caller holds the tracker lock.
	pub(crate) fn advance_watermark(&self, tracker: &mut WatermarkTracker) {
		if self.is_retired() {
			return;
		}
		let oldest_pending = match self.ctx.store.min_pending_ingestion(&self.id) {
			Ok(oldest) => oldest,
			Err(e) => {
				warn!(subscriber = %self.id, err = %e, "cannot read oldest pending obligation");
				return;
			}
		};
		let current = self.subscriber.read().last_file_ingestion_date;
		let Some(next) = tracker.advance(current, oldest_pending) else {
			return;
		};

		match self.ctx.store.set_watermark(&self.id, Some(next)) {
			Ok(()) => {
				self.subscriber.write().last_file_ingestion_date = Some(next);
				debug!(subscriber = %self.id, watermark = %next, "advanced watermark");
			}
			Err(e) => warn!(subscriber = %self.id, err = %e, "failed to persist watermark"),
		}
	}

	pub(crate) fn log_started(&self) {
		let subscriber = self.subscriber.read();
		info!(
			subscriber = %self.id,
			url = %subscriber.url,
			threads = subscriber.concurrent_threads,
			suspended = subscriber.suspended,
			"subscriber pool started"
		);
	}
}
