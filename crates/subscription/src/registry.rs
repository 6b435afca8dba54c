// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Live set of subscribers and their worker pools.
//!
//! Every mutation is written through to storage before memory changes, and
//! a failed write leaves memory as it was. Writes to one subscriber are
//! serialized by its pool's control lock. Registrations are serialized by a
//! lock of their own, so the map lock is only ever held for lookups and
//! inserts.

use std::{collections::HashMap, sync::Arc, time::Duration};

use arkiv_type::{Error, Result, Subscriber, SubscriberId, SubscriberUpdate, id::parse_endpoint};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::{context::DeliveryContext, dispatch::DispatchHandle, pool::SubscriberPool};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
	Created(Subscriber),
	AlreadyExists(Subscriber),
}

impl Registration {
	pub fn subscriber(&self) -> &Subscriber {
		match self {
			Registration::Created(s) | Registration::AlreadyExists(s) => s,
		}
	}

	pub fn is_created(&self) -> bool {
		matches!(self, Registration::Created(_))
	}
}

pub struct Registry {
	pools: RwLock<HashMap<SubscriberId, Arc<SubscriberPool>>>,
	registration: Mutex<()>,
	ctx: Arc<DeliveryContext>,
	dispatch: DispatchHandle,
}

impl Registry {
	pub(crate) fn new(ctx: Arc<DeliveryContext>, dispatch: DispatchHandle) -> Self {
		Self {
			pools: RwLock::new(HashMap::new()),
			registration: Mutex::new(()),
			ctx,
			dispatch,
		}
	}

	pub(crate) fn sweep_interval(&self) -> Duration {
		self.ctx.config.sweep_interval
	}

	/// Brings back a subscriber loaded from storage: its pending obligations
	/// are queued again before the workers start.
	pub(crate) fn restore(&self, subscriber: Subscriber) -> Result<()> {
		let pool = SubscriberPool::new(subscriber, self.ctx.clone());
		match pool.resync() {
			Ok(requeued) => debug!(subscriber = %pool.id(), requeued, "restored pending obligations"),
			Err(e) => warn!(subscriber = %pool.id(), err = %e, "cannot restore pending obligations yet"),
		}
		pool.start()?;
		pool.log_started();
		self.pools.write().insert(pool.id().clone(), pool);
		Ok(())
	}

	#[instrument(name = "subscription::registry::register", level = "debug", skip_all, fields(subscriber = %subscriber.id))]
	pub fn register(&self, subscriber: Subscriber) -> Result<Registration> {
		let _registration = self.registration.lock();
		// a retired pool is an unsubscribe that has not left the map yet
		if let Some(existing) = self.pool(&subscriber.id).filter(|pool| !pool.is_retired()) {
			let existing = existing.subscriber();
			if existing.same_configuration(&subscriber) {
				return Ok(Registration::AlreadyExists(existing));
			}
			return Err(Error::Conflict {
				subscriber: subscriber.id,
			});
		}

		self.ctx.store.insert_subscriber(&subscriber)?;
		let pool = SubscriberPool::new(subscriber.clone(), self.ctx.clone());
		if let Err(e) = pool.start() {
			pool.remove();
			if let Err(rollback) = self.ctx.store.delete_subscriber(&subscriber.id) {
				warn!(err = %rollback, "failed to roll back subscriber insert");
			}
			return Err(e);
		}
		pool.log_started();
		self.pools.write().insert(subscriber.id.clone(), pool);

		self.dispatch.wake_subscriber(&subscriber.id);
		Ok(Registration::Created(subscriber))
	}

	#[instrument(name = "subscription::registry::update", level = "debug", skip(self, update))]
	pub fn update(&self, id: &SubscriberId, update: &SubscriberUpdate) -> Result<Subscriber> {
		let pool = self.pool(id).ok_or_else(|| Error::not_found(format!("subscriber {}", id)))?;
		let _control = pool.control();
		let mut dispatch = pool.dispatch.lock();
		let mut tracker = pool.watermark.lock();

		let current = pool.subscriber();
		let mut next = current.clone();
		let rescan = apply(&mut next, update)?;
		if next == current {
			return Ok(current);
		}

		self.ctx.store.update_subscriber(&next)?;

		if rescan {
			// obligations already created stay. The catalog is looked at again from the watermark
			dispatch.cursor = None;
			tracker.reset();
		}
		pool.set_subscriber(next.clone());
		drop(tracker);
		drop(dispatch);

		if next.concurrent_threads != current.concurrent_threads {
			pool.resize(next.concurrent_threads)?;
		}
		match (current.suspended, next.suspended) {
			(false, true) => pool.suspend(),
			(true, false) => pool.resume(),
			_ => {}
		}

		info!(subscriber = %id, "subscriber updated");
		self.dispatch.wake_subscriber(id);
		Ok(next)
	}

	/// Removes a subscriber and releases every obligation it still holds.
	///
	/// The pool is removed under its watermark lock, so no worker of the old
	/// pool records a delivery once its rows are gone.
	#[instrument(name = "subscription::registry::deregister", level = "debug", skip(self))]
	pub fn deregister(&self, id: &SubscriberId) -> Result<Subscriber> {
		let pool = self.pool(id).ok_or_else(|| Error::not_found(format!("subscriber {}", id)))?;
		let _control = pool.control();
		let _dispatch = pool.dispatch.lock();
		let tracker = pool.watermark.lock();
		if pool.is_retired() {
			return Err(Error::not_found(format!("subscriber {}", id)));
		}
		let subscriber = pool.subscriber();

		let released = self.ctx.store.remove_subscriber(id)?;
		pool.remove();
		drop(tracker);
		{
			let mut pools = self.pools.write();
			if pools.get(id).is_some_and(|current| Arc::ptr_eq(current, &pool)) {
				pools.remove(id);
			}
		}
		for file in &released {
			self.ctx.coordinator.decrement(file);
		}

		info!(subscriber = %id, released = released.len(), "subscriber removed");
		Ok(subscriber)
	}

	pub fn get(&self, id: &SubscriberId) -> Option<Subscriber> {
		self.pool(id).map(|pool| pool.subscriber())
	}

	pub fn pool(&self, id: &SubscriberId) -> Option<Arc<SubscriberPool>> {
		self.pools.read().get(id).cloned()
	}

	/// Subscribers ordered by priority, lowest value first.
	pub fn list(&self, active_only: bool) -> Vec<Subscriber> {
		self.pools()
			.into_iter()
			.map(|pool| pool.subscriber())
			.filter(|subscriber| !active_only || subscriber.active)
			.collect()
	}

	pub(crate) fn pools(&self) -> Vec<Arc<SubscriberPool>> {
		let mut pools: Vec<_> = self.pools.read().values().cloned().collect();
		pools.sort_by_cached_key(|pool| {
			let subscriber = pool.subscriber();
			(subscriber.priority, subscriber.id)
		});
		pools
	}

	pub fn len(&self) -> usize {
		self.pools.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.pools.read().is_empty()
	}

	/// Stops every pool and waits for its workers. Storage is left as is.
	pub(crate) fn shutdown(&self) {
		let pools: Vec<_> = self.pools.write().drain().map(|(_, pool)| pool).collect();
		for pool in &pools {
			pool.retire();
		}
		for pool in &pools {
			pool.join();
		}
		debug!(pools = pools.len(), "all subscriber pools stopped");
	}
}

/// Applies an update in place. Returns true when dispatch must look at the
/// catalog again from the watermark.
fn apply(subscriber: &mut Subscriber, update: &SubscriberUpdate) -> Result<bool> {
	let mut rescan = false;
	if let Some(priority) = update.priority {
		subscriber.priority = priority;
	}
	if let Some(url) = &update.url {
		let endpoint = parse_endpoint(url)?;
		subscriber.host_id = endpoint.host_str().unwrap_or_default().to_string();
		subscriber.port = endpoint.port_or_known_default().unwrap_or_default();
		subscriber.url = url.clone();
	}
	if let Some(start_date) = update.start_date {
		rescan |= subscriber.set_start_date(start_date);
	}
	if let Some(plugin) = &update.filter_plugin {
		rescan |= *plugin != subscriber.filter_plugin;
		subscriber.filter_plugin = plugin.clone();
	}
	if let Some(params) = &update.filter_plugin_params {
		rescan |= *params != subscriber.filter_plugin_params;
		subscriber.filter_plugin_params = params.clone();
	}
	if let Some(threads) = update.concurrent_threads {
		subscriber.concurrent_threads = threads;
	}
	if let Some(suspend) = update.suspend {
		subscriber.suspended = suspend;
	}
	if let Some(active) = update.active {
		rescan |= active && !subscriber.active;
		subscriber.active = active;
	}
	Ok(rescan)
}
