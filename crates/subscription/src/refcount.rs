// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Reference counting of outstanding delivery obligations per file.
//!
//! A file with a positive count must not be evicted from local storage. When
//! the count drops to zero an [`EvictionEligible`] event is published to every
//! registered listener, exactly once per transition.

use std::sync::Arc;

use arkiv_type::FileRef;
use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionEligible {
	pub file: FileRef,
}

pub trait EvictionListener: Send + Sync {
	fn on_eviction_eligible(&self, event: &EvictionEligible);
}

/// Forwards eviction events into a channel, for consumers living on another thread.
pub struct ChannelEvictionListener {
	sender: Sender<EvictionEligible>,
}

impl ChannelEvictionListener {
	pub fn new() -> (Arc<Self>, Receiver<EvictionEligible>) {
		let (sender, receiver) = unbounded();
		(
			Arc::new(Self {
				sender,
			}),
			receiver,
		)
	}
}

impl EvictionListener for ChannelEvictionListener {
	fn on_eviction_eligible(&self, event: &EvictionEligible) {
		let _ = self.sender.send(event.clone());
	}
}

#[derive(Default)]
pub struct ReferenceCoordinator {
	counts: DashMap<FileRef, u64>,
	listeners: RwLock<Vec<Arc<dyn EvictionListener>>>,
}

impl ReferenceCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, listener: Arc<dyn EvictionListener>) {
		self.listeners.write().push(listener);
	}

	/// Replaces all counts, typically with the pending counts read from storage at startup.
	pub fn rebuild(&self, counts: impl IntoIterator<Item = (FileRef, u64)>) {
		self.counts.clear();
		for (file, count) in counts {
			if count > 0 {
				self.counts.insert(file, count);
			}
		}
		debug!(files = self.counts.len(), "rebuilt file reference counts");
	}

	pub fn increment(&self, file: &FileRef) -> u64 {
		let mut count = self.counts.entry(file.clone()).or_insert(0);
		*count += 1;
		*count
	}

	/// Releases one reference and returns the remaining count.
	pub fn decrement(&self, file: &FileRef) -> u64 {
		let remaining = match self.counts.get_mut(file) {
			Some(mut count) => {
				*count = count.saturating_sub(1);
				*count
			}
			None => {
				warn!(file = %file, "decrement of a file without outstanding references");
				return 0;
			}
		};
		if remaining > 0 {
			return remaining;
		}

		// an increment racing in between keeps the entry alive
		if self.counts.remove_if(file, |_, count| *count == 0).is_some() {
			self.publish(EvictionEligible {
				file: file.clone(),
			});
		}
		0
	}

	pub fn count(&self, file: &FileRef) -> u64 {
		self.counts.get(file).map(|c| *c).unwrap_or(0)
	}

	/// Files that currently hold at least one reference.
	pub fn snapshot(&self) -> Vec<(FileRef, u64)> {
		let mut out: Vec<_> = self.counts.iter().map(|e| (e.key().clone(), *e.value())).collect();
		out.sort();
		out
	}

	fn publish(&self, event: EvictionEligible) {
		debug!(file = %event.file, "file eligible for eviction");
		for listener in self.listeners.read().iter() {
			listener.on_eviction_eligible(&event);
		}
	}
}
