// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod config;

use std::{process::ExitCode, sync::Arc};

use arkiv_store::{SqliteConfig, SqliteStore};
use arkiv_sub_api::{HasVersion, Subsystem};
use arkiv_sub_server_http::{AppState, HttpSubsystem};
use arkiv_sub_tracing::TracingBuilder;
use arkiv_subscription::{DeliveryEngine, DeliverySubsystem};
use arkiv_type::{Error, Result};
use tracing::{error, info};

use crate::config::ServerConfig;

fn main() -> ExitCode {
	let config = match ServerConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			eprintln!("arkiv-server: {}", e);
			return ExitCode::FAILURE;
		}
	};

	let mut tracing = TracingBuilder::new().level(config.log_level);
	if config.log_json {
		tracing = tracing.json();
	}
	let mut tracing = tracing.build();
	if let Err(e) = tracing.start() {
		eprintln!("arkiv-server: {}", e);
		return ExitCode::FAILURE;
	}

	match run(config) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!(err = %e, "server failed");
			ExitCode::FAILURE
		}
	}
}

fn run(config: ServerConfig) -> Result<()> {
	info!(db = %config.db_path.display(), "opening subscription store");
	let store = Arc::new(SqliteStore::new(SqliteConfig::new(&config.db_path))?);
	let engine = Arc::new(DeliveryEngine::builder(store).config(config.delivery.clone()).build()?);

	let mut subsystems: Vec<Box<dyn Subsystem>> = vec![
		Box::new(DeliverySubsystem::new(engine.clone())),
		Box::new(HttpSubsystem::new(config.http.clone(), AppState::new(engine.service().clone()))),
	];

	for subsystem in subsystems.iter_mut() {
		if let Err(e) = subsystem.start() {
			error!(subsystem = subsystem.name(), err = %e, "failed to start");
			stop_all(&mut subsystems);
			return Err(e);
		}
		info!(subsystem = subsystem.name(), version = %subsystem.version().version, "started");
	}

	wait_for_signal()?;
	info!("shutting down");
	stop_all(&mut subsystems);
	Ok(())
}

/// Stops subsystems in reverse start order.
fn stop_all(subsystems: &mut [Box<dyn Subsystem>]) {
	for subsystem in subsystems.iter_mut().rev() {
		if let Err(e) = subsystem.shutdown() {
			error!(subsystem = subsystem.name(), err = %e, "failed to stop cleanly");
		}
	}
}

fn wait_for_signal() -> Result<()> {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.map_err(|e| Error::internal(format!("failed to build signal runtime: {}", e)))?;
	runtime.block_on(tokio::signal::ctrl_c()).map_err(|e| Error::internal(format!("failed to wait for ctrl-c: {}", e)))
}
