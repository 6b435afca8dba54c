// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Cooperative cancellation and suspension for worker threads.
//!
//! Workers are never interrupted. A worker keeps running only while its
//! identifier is in the [`SentinelSet`], and checks that between items.
//! The [`SuspendGate`] holds workers before they take new work.

use std::{
	collections::BTreeSet,
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
	time::Duration,
};

use arkiv_type::WorkerId;
use parking_lot::{Condvar, Mutex};

#[derive(Default)]
pub struct SentinelSet {
	live: Mutex<BTreeSet<WorkerId>>,
	next: AtomicU32,
}

impl SentinelSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Authorizes a new worker under an identifier never handed out before.
	pub fn admit(self: &Arc<Self>) -> CancellationToken {
		let id = WorkerId(self.next.fetch_add(1, Ordering::SeqCst));
		self.live.lock().insert(id);
		CancellationToken {
			id,
			sentinels: self.clone(),
		}
	}

	/// Withdraws the `count` highest identifiers. Returns the ones withdrawn.
	pub fn revoke_highest(&self, count: usize) -> Vec<WorkerId> {
		let mut live = self.live.lock();
		let mut revoked = Vec::with_capacity(count);
		for _ in 0..count {
			match live.pop_last() {
				Some(id) => revoked.push(id),
				None => break,
			}
		}
		revoked
	}

	pub fn revoke_all(&self) {
		self.live.lock().clear();
	}

	pub fn revoke(&self, id: WorkerId) {
		self.live.lock().remove(&id);
	}

	pub fn is_live(&self, id: WorkerId) -> bool {
		self.live.lock().contains(&id)
	}

	pub fn len(&self) -> usize {
		self.live.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.live.lock().is_empty()
	}

	pub fn ids(&self) -> Vec<WorkerId> {
		self.live.lock().iter().copied().collect()
	}
}

/// Handle a worker uses to learn whether it should keep running.
#[derive(Clone)]
pub struct CancellationToken {
	id: WorkerId,
	sentinels: Arc<SentinelSet>,
}

impl CancellationToken {
	pub fn id(&self) -> WorkerId {
		self.id
	}

	pub fn is_cancelled(&self) -> bool {
		!self.sentinels.is_live(self.id)
	}

	/// Sleeps for `duration`, returning early with false once cancelled.
	pub fn sleep(&self, duration: Duration) -> bool {
		const STEP: Duration = Duration::from_millis(50);
		let mut remaining = duration;
		while !remaining.is_zero() {
			if self.is_cancelled() {
				return false;
			}
			let step = remaining.min(STEP);
			std::thread::sleep(step);
			remaining -= step;
		}
		!self.is_cancelled()
	}
}

/// Shared running/suspended switch for all workers of one subscriber.
pub struct SuspendGate {
	running: Mutex<bool>,
	changed: Condvar,
}

impl SuspendGate {
	pub fn new(running: bool) -> Self {
		Self {
			running: Mutex::new(running),
			changed: Condvar::new(),
		}
	}

	pub fn suspend(&self) {
		*self.running.lock() = false;
	}

	pub fn resume(&self) {
		*self.running.lock() = true;
		self.changed.notify_all();
	}

	pub fn is_running(&self) -> bool {
		*self.running.lock()
	}

	/// Blocks while suspended, at most `timeout`. Returns whether the gate is open.
	pub fn wait(&self, timeout: Duration) -> bool {
		let mut running = self.running.lock();
		if !*running {
			self.changed.wait_for(&mut running, timeout);
		}
		*running
	}
}
