// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use tracing::Level;

use crate::subsystem::TracingSubsystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
	/// Human readable, one line per event.
	Text,
	/// One JSON object per event.
	Json,
}

#[derive(Debug, Clone)]
pub struct TracingBuilder {
	pub(crate) level: Level,
	pub(crate) format: LogFormat,
	pub(crate) ansi: bool,
	pub(crate) thread_names: bool,
	pub(crate) directives: Vec<String>,
}

impl Default for TracingBuilder {
	fn default() -> Self {
		Self {
			level: Level::INFO,
			format: LogFormat::Text,
			ansi: true,
			thread_names: true,
			directives: Vec::new(),
		}
	}
}

impl TracingBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn level(mut self, level: Level) -> Self {
		self.level = level;
		self
	}

	pub fn format(mut self, format: LogFormat) -> Self {
		self.format = format;
		self
	}

	pub fn json(self) -> Self {
		self.format(LogFormat::Json)
	}

	pub fn ansi(mut self, ansi: bool) -> Self {
		self.ansi = ansi;
		self
	}

	pub fn thread_names(mut self, enabled: bool) -> Self {
		self.thread_names = enabled;
		self
	}

	/// Adds a per-target directive such as `arkiv_subscription=debug`.
	pub fn directive(mut self, directive: impl Into<String>) -> Self {
		self.directives.push(directive.into());
		self
	}

	/// Filter used when `RUST_LOG` is not set.
	pub fn filter(&self) -> String {
		let mut filter = self.level.to_string().to_lowercase();
		for directive in &self.directives {
			filter.push(',');
			filter.push_str(directive);
		}
		filter
	}

	pub fn build(self) -> TracingSubsystem {
		TracingSubsystem::new(self)
	}
}
