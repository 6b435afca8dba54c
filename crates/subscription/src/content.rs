// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fs;

use arkiv_type::{Error, FileMeta, Result};

/// Reads the stored content of an archived file.
pub trait ContentSource: Send + Sync {
	fn read(&self, file: &FileMeta) -> Result<Vec<u8>>;
}

/// Reads content from the path recorded in the file catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsContent;

impl ContentSource for FsContent {
	fn read(&self, file: &FileMeta) -> Result<Vec<u8>> {
		// a missing file may still be in the middle of being archived
		fs::read(&file.path)
			.map_err(|e| Error::DeliveryTransient(format!("cannot read {}: {}", file.path.display(), e)))
	}
}

#[cfg(test)]
mod tests {
	use arkiv_type::{FileRef, Timestamp};

	use super::*;

	#[test]
	fn test_reads_catalog_path() {
		let path = std::env::temp_dir().join(format!("arkiv-content-{}", std::process::id()));
		fs::write(&path, b"SIMPLE  = T").unwrap();
		let meta = FileMeta::new(FileRef::new("a", 1, "disk-1"), Timestamp::from_millis(0), "image/fits")
			.with_path(&path);
		assert_eq!(FsContent.read(&meta).unwrap(), b"SIMPLE  = T".to_vec());
		let _ = fs::remove_file(&path);
	}

	#[test]
	fn test_missing_file_is_transient() {
		let meta = FileMeta::new(FileRef::new("a", 1, "disk-1"), Timestamp::from_millis(0), "image/fits")
			.with_path("/nonexistent/arkiv/a.fits");
		assert!(matches!(FsContent.read(&meta), Err(Error::DeliveryTransient(_))));
	}
}
