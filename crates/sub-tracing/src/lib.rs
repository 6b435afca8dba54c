// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Process-wide `tracing` subscriber for arkiv binaries.
//!
//! `RUST_LOG` takes precedence over the configured level and directives.

mod builder;
mod subsystem;

pub use builder::{LogFormat, TracingBuilder};
pub use subsystem::TracingSubsystem;
