// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:7777";

/// Configuration for the HTTP control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
	/// Address and port to bind to.
	pub bind_addr: String,
	/// Tokio worker threads serving requests.
	pub worker_threads: usize,
}

impl Default for HttpConfig {
	fn default() -> Self {
		Self {
			bind_addr: DEFAULT_BIND_ADDR.to_string(),
			worker_threads: 2,
		}
	}
}

impl HttpConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
		self.bind_addr = addr.into();
		self
	}

	pub fn worker_threads(mut self, threads: usize) -> Self {
		self.worker_threads = threads.max(1);
		self
	}
}
