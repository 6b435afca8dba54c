// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::any::Any;

use arkiv_sub_api::{ComponentType, HasVersion, HealthStatus, Subsystem, SystemVersion};
use arkiv_type::{Error, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::builder::{LogFormat, TracingBuilder};

/// Installs the global subscriber on start.
///
/// A process has one global subscriber. If another one is already installed
/// (a test harness, an embedding application) it is left in place and this
/// subsystem reports a warning instead of failing.
pub struct TracingSubsystem {
	config: TracingBuilder,
	running: bool,
	installed: bool,
}

impl TracingSubsystem {
	pub fn new(config: TracingBuilder) -> Self {
		Self {
			config,
			running: false,
			installed: false,
		}
	}

	/// Whether this subsystem's subscriber is the global one.
	pub fn is_installed(&self) -> bool {
		self.installed
	}

	fn env_filter(&self) -> Result<EnvFilter> {
		if let Ok(filter) = EnvFilter::try_from_default_env() {
			return Ok(filter);
		}
		EnvFilter::try_new(self.config.filter())
			.map_err(|e| Error::validation(format!("invalid log filter '{}': {}", self.config.filter(), e)))
	}
}

impl HasVersion for TracingSubsystem {
	fn version(&self) -> SystemVersion {
		SystemVersion {
			name: env!("CARGO_PKG_NAME").strip_prefix("arkiv-").unwrap_or(env!("CARGO_PKG_NAME")).to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
			description: "Structured logging through tracing".to_string(),
			r#type: ComponentType::Subsystem,
		}
	}
}

impl Subsystem for TracingSubsystem {
	fn name(&self) -> &'static str {
		"Tracing"
	}

	fn start(&mut self) -> Result<()> {
		if self.running {
			return Ok(());
		}

		let filter = self.env_filter()?;
		let registry = tracing_subscriber::registry().with(filter);
		let thread_names = self.config.thread_names;
		let result = match self.config.format {
			LogFormat::Text => registry
				.with(fmt::layer().with_ansi(self.config.ansi).with_thread_names(thread_names))
				.try_init(),
			LogFormat::Json => registry.with(fmt::layer().json().with_thread_names(thread_names)).try_init(),
		};

		self.installed = result.is_ok();
		self.running = true;
		if self.installed {
			tracing::debug!(filter = %self.config.filter(), "tracing subscriber installed");
		}
		Ok(())
	}

	fn shutdown(&mut self) -> Result<()> {
		// the global subscriber cannot be removed once set
		self.running = false;
		Ok(())
	}

	fn is_running(&self) -> bool {
		self.running
	}

	fn health_status(&self) -> HealthStatus {
		match (self.running, self.installed) {
			(true, true) => HealthStatus::Healthy,
			(true, false) => HealthStatus::Warning {
				description: "another global subscriber is installed".to_string(),
			},
			(false, _) => HealthStatus::Unknown,
		}
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_start_is_idempotent() {
		let mut first = TracingBuilder::new().ansi(false).build();
		first.start().unwrap();
		first.start().unwrap();
		assert!(first.is_running());

		// the global slot is taken by now
		let mut second = TracingBuilder::new().json().build();
		second.start().unwrap();
		assert!(!second.is_installed());
		assert!(matches!(second.health_status(), HealthStatus::Warning { .. }));

		second.shutdown().unwrap();
		assert!(!second.is_running());
		assert_eq!(second.health_status(), HealthStatus::Unknown);
	}

	#[test]
	fn test_bad_directive_is_rejected() {
		if std::env::var_os("RUST_LOG").is_some() {
			return;
		}
		let mut subsystem = TracingBuilder::new().directive("arkiv=loudest").build();
		assert!(matches!(subsystem.start(), Err(Error::Validation(_))));
		assert!(!subsystem.is_running());
	}
}
