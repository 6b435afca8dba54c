// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Lifecycle interface shared by every arkiv subsystem.

use std::any::Any;

use arkiv_type::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
	Healthy,
	Warning {
		description: String,
	},
	Degraded {
		description: String,
	},
	Failed {
		description: String,
	},
	Unknown,
}

impl HealthStatus {
	pub fn is_healthy(&self) -> bool {
		matches!(self, HealthStatus::Healthy)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
	Module,
	Subsystem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemVersion {
	pub name: String,
	pub version: String,
	pub description: String,
	pub r#type: ComponentType,
}

pub trait HasVersion {
	fn version(&self) -> SystemVersion;
}

/// A long-running component with an explicit start/shutdown lifecycle.
///
/// `start` and `shutdown` must be idempotent.
pub trait Subsystem: Send + Sync + Any + HasVersion {
	fn name(&self) -> &'static str;

	fn start(&mut self) -> Result<()>;

	fn shutdown(&mut self) -> Result<()>;

	fn is_running(&self) -> bool;

	fn health_status(&self) -> HealthStatus;

	fn as_any(&self) -> &dyn Any;

	fn as_any_mut(&mut self) -> &mut dyn Any;
}
