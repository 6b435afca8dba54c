// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Test doubles and fixtures shared by arkiv test suites.

pub mod content;
pub mod fixture;
pub mod network;
pub mod tempdir;
pub mod transport;
pub mod wait;

pub use content::MemoryContent;
pub use fixture::{fast_config, file, ts};
pub use network::free_local_socket;
pub use transport::{Recorded, RecordingTransport};
pub use wait::{wait_for, wait_for_condition};
