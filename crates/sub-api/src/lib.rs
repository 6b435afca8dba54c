// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod subsystem;

pub use subsystem::{ComponentType, HasVersion, HealthStatus, Subsystem, SystemVersion};
