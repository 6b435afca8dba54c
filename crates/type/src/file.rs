// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{FileRef, Timestamp};

/// Metadata of an archived file version, as recorded by the archive at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
	pub file: FileRef,
	pub ingestion_date: Timestamp,
	/// Mime type of the stored content.
	pub format: String,
	pub checksum: Option<String>,
	pub size: u64,
	pub path: PathBuf,
}

impl FileMeta {
	pub fn new(file: FileRef, ingestion_date: Timestamp, format: impl Into<String>) -> Self {
		Self {
			file,
			ingestion_date,
			format: format.into(),
			checksum: None,
			size: 0,
			path: PathBuf::new(),
		}
	}

	pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
		self.checksum = Some(checksum.into());
		self
	}

	pub fn with_size(mut self, size: u64) -> Self {
		self.size = size;
		self
	}

	pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path = path.into();
		self
	}

	/// File name presented to the remote end.
	pub fn file_name(&self) -> String {
		self.path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_else(|| self.file.file_id.clone())
	}
}
