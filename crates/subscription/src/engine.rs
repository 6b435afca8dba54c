// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use arkiv_store::Backend;
use arkiv_type::{FileMeta, Result};
use parking_lot::Mutex;
use tracing::{info, instrument};

use crate::{
	config::DeliveryConfig,
	content::{ContentSource, FsContent},
	context::DeliveryContext,
	dispatch::{self, DispatchHandle, Dispatcher},
	filter::FilterRegistry,
	refcount::{EvictionListener, ReferenceCoordinator},
	registry::Registry,
	service::SubscriptionService,
	transport::{HttpTransport, HttpTransportConfig, Transport},
};

pub struct DeliveryEngineBuilder {
	store: Arc<dyn Backend>,
	transport: Option<Arc<dyn Transport>>,
	content: Arc<dyn ContentSource>,
	filters: FilterRegistry,
	config: DeliveryConfig,
	http: HttpTransportConfig,
	listeners: Vec<Arc<dyn EvictionListener>>,
}

impl DeliveryEngineBuilder {
	pub fn new(store: Arc<dyn Backend>) -> Self {
		Self {
			store,
			transport: None,
			content: Arc::new(FsContent),
			filters: FilterRegistry::with_builtins(),
			config: DeliveryConfig::default(),
			http: HttpTransportConfig::default(),
			listeners: Vec::new(),
		}
	}

	/// Replaces the default HTTP transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn content(mut self, content: Arc<dyn ContentSource>) -> Self {
		self.content = content;
		self
	}

	pub fn filters(mut self, filters: FilterRegistry) -> Self {
		self.filters = filters;
		self
	}

	pub fn config(mut self, config: DeliveryConfig) -> Self {
		self.config = config;
		self
	}

	pub fn http(mut self, http: HttpTransportConfig) -> Self {
		self.http = http;
		self
	}

	pub fn eviction_listener(mut self, listener: Arc<dyn EvictionListener>) -> Self {
		self.listeners.push(listener);
		self
	}

	pub fn build(self) -> Result<DeliveryEngine> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(self.http)?),
		};

		let coordinator = Arc::new(ReferenceCoordinator::new());
		for listener in self.listeners {
			coordinator.subscribe(listener);
		}

		let ctx = Arc::new(DeliveryContext {
			store: self.store,
			coordinator,
			transport,
			content: self.content,
			filters: Arc::new(self.filters),
			config: self.config,
		});

		let dispatcher = Dispatcher::new();
		let registry = Arc::new(Registry::new(ctx.clone(), dispatcher.handle()));
		let service = SubscriptionService::new(registry.clone(), ctx.clone(), dispatcher.handle());

		Ok(DeliveryEngine {
			ctx,
			registry,
			dispatcher,
			service,
			running: AtomicBool::new(false),
			lifecycle: Mutex::new(()),
		})
	}
}

/// Owns the registry, the dispatcher and all worker pools.
pub struct DeliveryEngine {
	ctx: Arc<DeliveryContext>,
	registry: Arc<Registry>,
	dispatcher: Dispatcher,
	service: SubscriptionService,
	running: AtomicBool,
	lifecycle: Mutex<()>,
}

impl DeliveryEngine {
	pub fn builder(store: Arc<dyn Backend>) -> DeliveryEngineBuilder {
		DeliveryEngineBuilder::new(store)
	}

	/// Loads subscribers, rebuilds reference counts from the durable queue,
	/// requeues pending obligations and starts workers and the dispatcher.
	#[instrument(name = "subscription::engine::start", level = "info", skip(self))]
	pub fn start(&self) -> Result<()> {
		let _lifecycle = self.lifecycle.lock();
		if self.running.load(Ordering::SeqCst) {
			return Ok(());
		}

		let store = &self.ctx.store;
		self.ctx.coordinator.rebuild(store.pending_counts()?);

		let subscribers = store.load_subscribers()?;
		let count = subscribers.len();
		for subscriber in subscribers {
			self.registry.restore(subscriber)?;
		}

		self.dispatcher.start(self.registry.clone())?;
		self.dispatcher.handle().wake();
		self.running.store(true, Ordering::SeqCst);
		info!(subscribers = count, "delivery engine started");
		Ok(())
	}

	/// Stops the dispatcher and every worker. Pending obligations stay durable.
	pub fn shutdown(&self) {
		let _lifecycle = self.lifecycle.lock();
		let was_running = self.running.swap(false, Ordering::SeqCst);
		self.dispatcher.stop();
		self.registry.shutdown();
		if was_running {
			info!("delivery engine stopped");
		}
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	pub fn service(&self) -> &SubscriptionService {
		&self.service
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	pub fn coordinator(&self) -> &Arc<ReferenceCoordinator> {
		&self.ctx.coordinator
	}

	pub fn store(&self) -> &Arc<dyn Backend> {
		&self.ctx.store
	}

	pub fn dispatch_handle(&self) -> DispatchHandle {
		self.dispatcher.handle()
	}

	/// Wakes the dispatcher after the archive stored a new file.
	pub fn notify_archived(&self) {
		self.dispatcher.handle().wake();
	}

	/// Registers a file in the catalog and wakes the dispatcher.
	pub fn archive(&self, file: &FileMeta) -> Result<()> {
		self.service.notify_archived(Some(file))
	}

	/// Runs a dispatch pass for every subscriber on the calling thread.
	pub fn sweep(&self) {
		dispatch::sweep(&self.registry, None);
	}
}

impl Drop for DeliveryEngine {
	fn drop(&mut self) {
		self.shutdown();
	}
}
