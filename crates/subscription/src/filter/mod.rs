// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Pluggable per-subscriber file filters.
//!
//! A subscriber names a filter plugin and passes it an opaque parameter
//! string. The plugin decides whether a file is delivered at all, and may
//! rewrite the body just before it is pushed.

mod builtin;

use std::{collections::HashMap, sync::Arc};

use arkiv_type::{Error, FileMeta, Result};
pub use builtin::{AcceptAll, FileIdFilter, FormatFilter, MinVersionFilter};

pub trait FilterPlugin: Send + Sync {
	fn name(&self) -> &str;

	/// Rejects parameter strings the plugin can never evaluate.
	fn validate(&self, _params: &str) -> Result<()> {
		Ok(())
	}

	fn matches(&self, file: &FileMeta, params: &str) -> Result<bool>;

	/// Produces the body that is actually sent. Identity unless overridden.
	fn prepare(&self, _file: &FileMeta, body: Vec<u8>, _params: &str) -> Result<Vec<u8>> {
		Ok(body)
	}
}

pub struct FilterRegistry {
	plugins: HashMap<String, Arc<dyn FilterPlugin>>,
}

impl FilterRegistry {
	/// A registry with no plugins besides the implicit accept-all under the empty name.
	pub fn empty() -> Self {
		let mut registry = Self {
			plugins: HashMap::new(),
		};
		registry.register(Arc::new(AcceptAll));
		registry
	}

	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();
		registry.register(Arc::new(FormatFilter));
		registry.register(Arc::new(FileIdFilter::new()));
		registry.register(Arc::new(MinVersionFilter));
		registry
	}

	pub fn register(&mut self, plugin: Arc<dyn FilterPlugin>) {
		self.plugins.insert(plugin.name().to_string(), plugin);
	}

	pub fn get(&self, name: &str) -> Result<Arc<dyn FilterPlugin>> {
		let key = if name.is_empty() {
			AcceptAll::NAME
		} else {
			name
		};
		self.plugins.get(key).cloned().ok_or_else(|| Error::validation(format!("unknown filter plugin '{}'", name)))
	}

	pub fn validate(&self, name: &str, params: &str) -> Result<()> {
		self.get(name)?.validate(params)
	}

	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.plugins.keys().cloned().collect();
		names.sort();
		names
	}
}

impl Default for FilterRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}
