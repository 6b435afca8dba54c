// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Turns newly archived files into delivery obligations.
//!
//! The dispatcher runs on its own thread and wakes either on a trigger (a
//! file was archived, a subscriber was added or changed) or after the sweep
//! interval. It never runs a pass itself: it hands each affected pool a
//! wake-up, and the pool's own dispatch thread runs the pass. Passes for one
//! subscriber are serialized by the pool's dispatch lock.

use std::{
	collections::BTreeSet,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
};

use arkiv_store::FileCursor;
use arkiv_type::{Error, FileMeta, Result, Subscriber, SubscriberId, Timestamp};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::{pool::SubscriberPool, registry::Registry};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Trigger {
	All,
	Subscriber(SubscriberId),
	Stop,
}

/// Cheap handle for waking the dispatcher.
#[derive(Clone)]
pub struct DispatchHandle {
	sender: Sender<Trigger>,
}

impl DispatchHandle {
	/// Requests a pass over every subscriber.
	pub fn wake(&self) {
		let _ = self.sender.send(Trigger::All);
	}

	pub fn wake_subscriber(&self, id: &SubscriberId) {
		let _ = self.sender.send(Trigger::Subscriber(id.clone()));
	}
}

/// Outcome of one dispatch pass for one subscriber.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
	/// Durable obligations put back into the in-memory queue.
	pub requeued: usize,
	pub scanned: usize,
	pub enqueued: usize,
}

pub struct Dispatcher {
	handle: DispatchHandle,
	receiver: Receiver<Trigger>,
	running: Arc<AtomicBool>,
	thread: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
	pub fn new() -> Self {
		let (sender, receiver) = unbounded();
		Self {
			handle: DispatchHandle {
				sender,
			},
			receiver,
			running: Arc::new(AtomicBool::new(false)),
			thread: Mutex::new(None),
		}
	}

	pub fn handle(&self) -> DispatchHandle {
		self.handle.clone()
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	pub(crate) fn start(&self, registry: Arc<Registry>) -> Result<()> {
		if self.running.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		let receiver = self.receiver.clone();
		let running = self.running.clone();
		let interval = registry.sweep_interval();

		let spawned = thread::Builder::new().name("dispatcher".to_string()).spawn(move || {
			info!(interval = ?interval, "dispatcher started");
			while running.load(Ordering::SeqCst) {
				let first = match receiver.recv_timeout(interval) {
					Ok(Trigger::Stop) => break,
					Ok(trigger) => trigger,
					Err(RecvTimeoutError::Timeout) => Trigger::All,
					Err(RecvTimeoutError::Disconnected) => break,
				};

				// coalesce whatever piled up meanwhile
				let mut triggers = vec![first];
				triggers.extend(receiver.try_iter());
				if triggers.contains(&Trigger::Stop) {
					break;
				}

				if triggers.contains(&Trigger::All) {
					fan_out(&registry, None);
				} else {
					let ids: BTreeSet<SubscriberId> = triggers
						.into_iter()
						.filter_map(|t| match t {
							Trigger::Subscriber(id) => Some(id),
							_ => None,
						})
						.collect();
					fan_out(&registry, Some(&ids));
				}
			}
			info!("dispatcher stopped");
		});

		match spawned {
			Ok(handle) => {
				*self.thread.lock() = Some(handle);
				Ok(())
			}
			Err(e) => {
				self.running.store(false, Ordering::SeqCst);
				Err(Error::internal(format!("failed to spawn dispatcher: {}", e)))
			}
		}
	}

	pub(crate) fn stop(&self) {
		if !self.running.swap(false, Ordering::SeqCst) {
			return;
		}
		let _ = self.handle.sender.send(Trigger::Stop);
		if let Some(handle) = self.thread.lock().take() {
			let _ = handle.join();
		}
	}
}

impl Default for Dispatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		self.stop();
	}
}

fn selected(registry: &Registry, only: Option<&BTreeSet<SubscriberId>>) -> Vec<Arc<SubscriberPool>> {
	registry.pools().into_iter().filter(|pool| only.map(|ids| ids.contains(pool.id())).unwrap_or(true)).collect()
}

/// Wakes the dispatch thread of the given subscribers, or of all of them,
/// lowest priority value first.
fn fan_out(registry: &Registry, only: Option<&BTreeSet<SubscriberId>>) {
	for pool in selected(registry, only) {
		pool.request_dispatch();
	}
}

/// Runs one pass for the given subscribers, or all of them, on the calling
/// thread and returns once every pass finished.
pub(crate) fn sweep(registry: &Registry, only: Option<&BTreeSet<SubscriberId>>) {
	selected(registry, only).par_iter().for_each(|pool| run_pass(pool));
}

/// Body of a pool's dispatch thread: one pass per wake-up until the pool retires.
pub(crate) fn run_pool(pool: Arc<SubscriberPool>, wake: Receiver<()>) {
	debug!(subscriber = %pool.id(), "dispatch thread started");
	while wake.recv().is_ok() {
		if pool.is_retired() {
			break;
		}
		run_pass(&pool);
	}
	debug!(subscriber = %pool.id(), "dispatch thread stopped");
}

fn run_pass(pool: &SubscriberPool) {
	match dispatch_subscriber(pool) {
		Ok(report) if report.enqueued > 0 || report.requeued > 0 => {
			debug!(subscriber = %pool.id(), ?report, "dispatch pass finished");
		}
		Ok(_) => {}
		Err(e) => warn!(subscriber = %pool.id(), err = %e, "dispatch pass stopped early"),
	}
}

/// Creates obligations for every matching file archived since the last pass.
///
/// The catalog is read in pages of `dispatch_batch_size`. The cursor only moves
/// past a file once its obligation exists, so a failed pass resumes at the
/// file that failed.
#[instrument(name = "subscription::dispatch", level = "debug", skip_all, fields(subscriber = %pool.id()))]
pub(crate) fn dispatch_subscriber(pool: &SubscriberPool) -> Result<DispatchReport> {
	let mut state = pool.dispatch.lock();
	let mut report = DispatchReport::default();
	if pool.is_retired() {
		return Ok(report);
	}

	let subscriber = pool.subscriber();
	if !subscriber.active {
		return Ok(report);
	}

	report.requeued = pool.resync()?;

	let ctx = &pool.ctx;
	let filter = ctx.filters.get(&subscriber.filter_plugin)?;
	let batch = ctx.config.dispatch_batch_size;
	let mut cursor = state.cursor.clone().unwrap_or_else(|| initial_cursor(&subscriber));

	loop {
		let page = ctx.store.files_ingested_after(Some(&cursor), batch)?;
		let exhausted = page.len() < batch;

		for meta in page {
			report.scanned += 1;
			if meta.ingestion_date >= subscriber.start_date {
				let matched = filter.matches(&meta, &subscriber.filter_plugin_params);
				let created = matched.and_then(|matched| match matched {
					true => create_obligation(pool, &meta),
					false => Ok(false),
				});
				match created {
					Ok(true) => report.enqueued += 1,
					Ok(false) => {}
					Err(e) => {
						state.cursor = Some(cursor);
						return Err(e);
					}
				}
			}
			cursor = FileCursor::after_file(&meta);
		}

		state.cursor = Some(cursor.clone());
		if exhausted {
			break;
		}
	}

	let mut tracker = pool.watermark.lock();
	tracker.set_horizon(cursor.ingestion_date);
	pool.advance_watermark(&mut tracker);

	Ok(report)
}

fn initial_cursor(subscriber: &Subscriber) -> FileCursor {
	match subscriber.scan_floor() {
		Some(watermark) => FileCursor::after_date(watermark),
		None => FileCursor::after_date(Timestamp::from_millis(subscriber.start_date.as_millis() - 1)),
	}
}

/// Enqueue durably, take a file reference, then hand the file to the workers.
/// Returns false when the obligation already existed.
fn create_obligation(pool: &SubscriberPool, meta: &FileMeta) -> Result<bool> {
	let ctx = &pool.ctx;
	match ctx.store.enqueue(pool.id(), meta) {
		Ok(()) => {}
		Err(e) if e.is_duplicate() => return Ok(false),
		Err(e) => return Err(e),
	}
	ctx.coordinator.increment(&meta.file);
	pool.queue.push(meta.clone());
	Ok(true)
}
