// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! HTTP server subsystem implementing the arkiv Subsystem trait.

use std::{
	any::Any,
	net::SocketAddr,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use arkiv_sub_api::{ComponentType, HasVersion, HealthStatus, Subsystem, SystemVersion};
use arkiv_type::{Error, Result};
use parking_lot::RwLock;
use tokio::{
	net::TcpListener,
	runtime::{self, Runtime},
	sync::oneshot,
};

use crate::{config::HttpConfig, routes::router, state::AppState};

/// Serves the control surface on a dedicated tokio runtime.
///
/// `start` binds synchronously, so a bad address fails the call instead of
/// the background task.
pub struct HttpSubsystem {
	config: HttpConfig,
	/// Actual bound address (available after start).
	actual_addr: RwLock<Option<SocketAddr>>,
	state: AppState,
	running: Arc<AtomicBool>,
	shutdown_tx: Option<oneshot::Sender<()>>,
	shutdown_complete_rx: Option<oneshot::Receiver<()>>,
	runtime: Option<Runtime>,
}

impl HttpSubsystem {
	pub fn new(config: HttpConfig, state: AppState) -> Self {
		Self {
			config,
			actual_addr: RwLock::new(None),
			state,
			running: Arc::new(AtomicBool::new(false)),
			shutdown_tx: None,
			shutdown_complete_rx: None,
			runtime: None,
		}
	}

	pub fn bind_addr(&self) -> &str {
		&self.config.bind_addr
	}

	/// Get the actual bound address (available after start).
	pub fn local_addr(&self) -> Option<SocketAddr> {
		*self.actual_addr.read()
	}

	pub fn port(&self) -> Option<u16> {
		self.local_addr().map(|a| a.port())
	}

	fn build_runtime(&self) -> Result<Runtime> {
		runtime::Builder::new_multi_thread()
			.worker_threads(self.config.worker_threads)
			.thread_name("arkiv-http")
			.enable_all()
			.build()
			.map_err(|e| Error::internal(format!("failed to build http runtime: {}", e)))
	}
}

impl HasVersion for HttpSubsystem {
	fn version(&self) -> SystemVersion {
		SystemVersion {
			name: env!("CARGO_PKG_NAME").strip_prefix("arkiv-").unwrap_or(env!("CARGO_PKG_NAME")).to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			description: "HTTP control surface for subscriptions".to_string(),
			r#type: ComponentType::Subsystem,
		}
	}
}

impl Subsystem for HttpSubsystem {
	fn name(&self) -> &'static str {
		"Http"
	}

	fn start(&mut self) -> Result<()> {
		if self.shutdown_tx.is_some() {
			return Ok(());
		}

		let runtime = match self.runtime.take() {
			Some(runtime) => runtime,
			None => self.build_runtime()?,
		};

		let addr = self.config.bind_addr.clone();
		let listener = match runtime.block_on(TcpListener::bind(&addr)) {
			Ok(listener) => listener,
			Err(e) => {
				self.runtime = Some(runtime);
				return Err(Error::internal(format!("failed to bind {}: {}", addr, e)));
			}
		};
		let actual_addr = listener.local_addr().map_err(|e| Error::internal(format!("address unavailable: {}", e)))?;
		*self.actual_addr.write() = Some(actual_addr);
		tracing::info!("HTTP server bound to {}", actual_addr);

		let (shutdown_tx, shutdown_rx) = oneshot::channel();
		let (complete_tx, complete_rx) = oneshot::channel();

		let app = router(self.state.clone());
		let running = self.running.clone();
		running.store(true, Ordering::SeqCst);

		runtime.spawn(async move {
			let server = axum::serve(listener, app).with_graceful_shutdown(async {
				shutdown_rx.await.ok();
				tracing::info!("HTTP server received shutdown signal");
			});

			if let Err(e) = server.await {
				tracing::error!("HTTP server error: {}", e);
			}

			running.store(false, Ordering::SeqCst);
			let _ = complete_tx.send(());
			tracing::info!("HTTP server stopped");
		});

		self.runtime = Some(runtime);
		self.shutdown_tx = Some(shutdown_tx);
		self.shutdown_complete_rx = Some(complete_rx);
		Ok(())
	}

	fn shutdown(&mut self) -> Result<()> {
		if let Some(tx) = self.shutdown_tx.take() {
			let _ = tx.send(());
		}
		if let Some(runtime) = self.runtime.take() {
			if let Some(rx) = self.shutdown_complete_rx.take() {
				let _ = runtime.block_on(rx);
			}
			runtime.shutdown_timeout(Duration::from_secs(5));
		}
		self.running.store(false, Ordering::SeqCst);
		Ok(())
	}

	fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	fn health_status(&self) -> HealthStatus {
		if self.running.load(Ordering::SeqCst) {
			HealthStatus::Healthy
		} else if self.shutdown_tx.is_some() {
			HealthStatus::Warning {
				description: "Starting up".to_string(),
			}
		} else {
			HealthStatus::Failed {
				description: "Not running".to_string(),
			}
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

impl Drop for HttpSubsystem {
	fn drop(&mut self) {
		let _ = self.shutdown();
	}
}
