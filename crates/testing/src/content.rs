// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use arkiv_subscription::ContentSource;
use arkiv_type::{Error, FileMeta, FileRef, Result};
use parking_lot::RwLock;

/// Content held in memory. Files without explicit content read as their id.
#[derive(Default)]
pub struct MemoryContent {
	files: RwLock<HashMap<FileRef, Vec<u8>>>,
	missing: RwLock<Vec<FileRef>>,
}

impl MemoryContent {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, file: FileRef, content: impl Into<Vec<u8>>) {
		self.files.write().insert(file, content.into());
	}

	/// Reads of `file` fail until content is inserted for it.
	pub fn mark_missing(&self, file: FileRef) {
		self.missing.write().push(file);
	}
}

impl ContentSource for MemoryContent {
	fn read(&self, file: &FileMeta) -> Result<Vec<u8>> {
		if let Some(content) = self.files.read().get(&file.file) {
			return Ok(content.clone());
		}
		if self.missing.read().contains(&file.file) {
			return Err(Error::DeliveryTransient(format!("{} not readable", file.file)));
		}
		Ok(file.file.file_id.as_bytes().to_vec())
	}
}
