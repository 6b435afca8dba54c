// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Control surface used by operators and the HTTP server.

use std::sync::{Arc, atomic::Ordering};

use arkiv_store::Obligation;
use arkiv_type::{Error, FileMeta, Result, Subscriber, SubscriberId, SubscriberUpdate, Timestamp, id::parse_endpoint};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
	context::DeliveryContext,
	dispatch::DispatchHandle,
	registry::{Registration, Registry},
};

pub const DEFAULT_PRIORITY: i32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
	pub url: String,
	#[serde(default)]
	pub priority: Option<i32>,
	/// Defaults to now for a new subscriber. When re-subscribing, an absent
	/// start date matches whatever the existing subscriber has.
	#[serde(default)]
	pub start_date: Option<Timestamp>,
	#[serde(default)]
	pub filter_plugin: Option<String>,
	#[serde(default)]
	pub filter_plugin_params: Option<String>,
	/// Derived from the url when absent.
	#[serde(default)]
	pub subscriber_id: Option<String>,
	#[serde(default)]
	pub concurrent_threads: Option<u32>,
}

impl SubscribeRequest {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			..Default::default()
		}
	}

	pub fn priority(mut self, priority: i32) -> Self {
		self.priority = Some(priority);
		self
	}

	pub fn start_date(mut self, start_date: Timestamp) -> Self {
		self.start_date = Some(start_date);
		self
	}

	pub fn filter(mut self, plugin: impl Into<String>, params: impl Into<String>) -> Self {
		self.filter_plugin = Some(plugin.into());
		self.filter_plugin_params = Some(params.into());
		self
	}

	pub fn subscriber_id(mut self, id: impl Into<String>) -> Self {
		self.subscriber_id = Some(id.into());
		self
	}

	pub fn concurrent_threads(mut self, threads: u32) -> Self {
		self.concurrent_threads = Some(threads);
		self
	}
}

/// Names a subscriber either by identifier or by the url it was registered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberTarget {
	Id(SubscriberId),
	Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberStatus {
	#[serde(flatten)]
	pub subscriber: Subscriber,
	/// Durable obligations not yet delivered.
	pub pending: usize,
	pub queued: usize,
	pub in_flight: usize,
	pub workers: usize,
	pub delivered: u64,
	pub failed_attempts: u64,
	pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct SubscriptionService {
	registry: Arc<Registry>,
	ctx: Arc<DeliveryContext>,
	dispatch: DispatchHandle,
}

impl SubscriptionService {
	pub(crate) fn new(registry: Arc<Registry>, ctx: Arc<DeliveryContext>, dispatch: DispatchHandle) -> Self {
		Self {
			registry,
			ctx,
			dispatch,
		}
	}

	#[instrument(name = "subscription::subscribe", level = "info", skip_all, fields(url = %request.url))]
	pub fn subscribe(&self, request: SubscribeRequest) -> Result<Registration> {
		let endpoint = parse_endpoint(&request.url)?;
		let id = match request.subscriber_id.as_deref().map(str::trim) {
			Some("") => return Err(Error::validation("subscriber_id must not be empty")),
			Some(id) => SubscriberId::new(id),
			None => SubscriberId::from_url(&request.url)?,
		};
		let filter_plugin = request.filter_plugin.unwrap_or_default();
		let filter_plugin_params = request.filter_plugin_params.unwrap_or_default();
		self.ctx.filters.validate(&filter_plugin, &filter_plugin_params)?;
		let concurrent_threads = request.concurrent_threads.unwrap_or(1);
		self.validate_threads(concurrent_threads)?;

		let start_date = match (request.start_date, self.registry.get(&id)) {
			(Some(start_date), _) => start_date,
			(None, Some(existing)) => existing.start_date,
			(None, None) => Timestamp::now(),
		};

		let subscriber = Subscriber {
			id,
			host_id: endpoint.host_str().unwrap_or_default().to_string(),
			port: endpoint.port_or_known_default().unwrap_or_default(),
			priority: request.priority.unwrap_or(DEFAULT_PRIORITY),
			url: request.url,
			start_date,
			filter_plugin,
			filter_plugin_params,
			concurrent_threads,
			active: true,
			suspended: false,
			last_file_ingestion_date: None,
		};

		let registration = self.registry.register(subscriber)?;
		if registration.is_created() {
			info!(subscriber = %registration.subscriber().id, "subscriber created");
		}
		Ok(registration)
	}

	#[instrument(name = "subscription::unsubscribe", level = "info", skip(self))]
	pub fn unsubscribe(&self, target: SubscriberTarget) -> Result<Subscriber> {
		let id = self.resolve(target)?;
		self.registry.deregister(&id)
	}

	#[instrument(name = "subscription::update", level = "info", skip(self, update))]
	pub fn update(&self, id: &SubscriberId, update: SubscriberUpdate) -> Result<Subscriber> {
		if update.is_empty() {
			return Err(Error::validation("update contains no fields"));
		}
		if let Some(threads) = update.concurrent_threads {
			self.validate_threads(threads)?;
		}
		if update.filter_plugin.is_some() || update.filter_plugin_params.is_some() {
			let current = self.registry.get(id).ok_or_else(|| Error::not_found(format!("subscriber {}", id)))?;
			let plugin = update.filter_plugin.as_deref().unwrap_or(&current.filter_plugin);
			let params = update.filter_plugin_params.as_deref().unwrap_or(&current.filter_plugin_params);
			self.ctx.filters.validate(plugin, params)?;
		}
		self.registry.update(id, &update)
	}

	pub fn list(&self, active_only: bool) -> Vec<Subscriber> {
		self.registry.list(active_only)
	}

	pub fn get(&self, id: &SubscriberId) -> Result<Subscriber> {
		self.registry.get(id).ok_or_else(|| Error::not_found(format!("subscriber {}", id)))
	}

	pub fn status(&self, id: &SubscriberId) -> Result<SubscriberStatus> {
		let pool = self.registry.pool(id).ok_or_else(|| Error::not_found(format!("subscriber {}", id)))?;
		let pending = self.ctx.store.list_pending(id)?;
		let last_error = pending.iter().filter(|o| o.last_error.is_some()).max_by_key(|o| o.attempts).and_then(|o| o.last_error.clone());

		Ok(SubscriberStatus {
			subscriber: pool.subscriber(),
			pending: pending.len(),
			queued: pool.queue.queued(),
			in_flight: pool.queue.in_flight(),
			workers: pool.worker_count(),
			delivered: pool.stats.delivered.load(Ordering::Relaxed),
			failed_attempts: pool.stats.failed_attempts.load(Ordering::Relaxed),
			last_error,
		})
	}

	/// Pending obligations of one subscriber, oldest ingestion first.
	pub fn pending(&self, id: &SubscriberId) -> Result<Vec<Obligation>> {
		if self.registry.get(id).is_none() {
			return Err(Error::not_found(format!("subscriber {}", id)));
		}
		self.ctx.store.list_pending(id)
	}

	/// Records a newly archived file, if given, and wakes the dispatcher.
	pub fn notify_archived(&self, file: Option<&FileMeta>) -> Result<()> {
		if let Some(file) = file {
			self.ctx.store.register_file(file)?;
		}
		self.dispatch.wake();
		Ok(())
	}

	fn resolve(&self, target: SubscriberTarget) -> Result<SubscriberId> {
		match target {
			SubscriberTarget::Id(id) => Ok(id),
			SubscriberTarget::Url(url) => {
				if let Some(subscriber) = self.registry.list(false).into_iter().find(|s| s.url == url) {
					return Ok(subscriber.id);
				}
				SubscriberId::from_url(&url)
			}
		}
	}

	fn validate_threads(&self, threads: u32) -> Result<()> {
		let max = self.ctx.config.max_concurrent_threads;
		if threads == 0 || threads > max {
			return Err(Error::validation(format!("concurrent_threads must be between 1 and {}, got {}", max, threads)));
		}
		Ok(())
	}
}
