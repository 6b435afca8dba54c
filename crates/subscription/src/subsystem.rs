// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{any::Any, sync::Arc};

use arkiv_sub_api::{ComponentType, HasVersion, HealthStatus, Subsystem, SystemVersion};
use arkiv_type::Result;

use crate::engine::DeliveryEngine;

/// Runs the [`DeliveryEngine`] as part of the server lifecycle.
pub struct DeliverySubsystem {
	engine: Arc<DeliveryEngine>,
}

impl DeliverySubsystem {
	pub fn new(engine: Arc<DeliveryEngine>) -> Self {
		Self {
			engine,
		}
	}

	pub fn engine(&self) -> &Arc<DeliveryEngine> {
		&self.engine
	}
}

impl HasVersion for DeliverySubsystem {
	fn version(&self) -> SystemVersion {
		SystemVersion {
			name: env!("CARGO_PKG_NAME").strip_prefix("arkiv-").unwrap_or(env!("CARGO_PKG_NAME")).to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			description: "Subscription registry and file delivery".to_string(),
			r#type: ComponentType::Subsystem,
		}
	}
}

impl Subsystem for DeliverySubsystem {
	fn name(&self) -> &'static str {
		"Delivery"
	}

	fn start(&mut self) -> Result<()> {
		self.engine.start()
	}

	fn shutdown(&mut self) -> Result<()> {
		self.engine.shutdown();
		Ok(())
	}

	fn is_running(&self) -> bool {
		self.engine.is_running()
	}

	fn health_status(&self) -> HealthStatus {
		if self.engine.is_running() {
			HealthStatus::Healthy
		} else {
			HealthStatus::Unknown
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}
