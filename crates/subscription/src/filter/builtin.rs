// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::HashMap;

use arkiv_type::{Error, FileMeta, Result};
use parking_lot::Mutex;
use regex::Regex;

use super::FilterPlugin;

pub struct AcceptAll;

impl AcceptAll {
	pub const NAME: &'static str = "all";
}

impl FilterPlugin for AcceptAll {
	fn name(&self) -> &str {
		Self::NAME
	}

	fn matches(&self, _file: &FileMeta, _params: &str) -> Result<bool> {
		Ok(true)
	}
}

/// Accepts files whose mime type is in a comma separated list.
pub struct FormatFilter;

impl FilterPlugin for FormatFilter {
	fn name(&self) -> &str {
		"format"
	}

	fn validate(&self, params: &str) -> Result<()> {
		if formats(params).next().is_none() {
			return Err(Error::validation("format filter needs at least one mime type"));
		}
		Ok(())
	}

	fn matches(&self, file: &FileMeta, params: &str) -> Result<bool> {
		Ok(formats(params).any(|format| format.eq_ignore_ascii_case(&file.format)))
	}
}

fn formats(params: &str) -> impl Iterator<Item = &str> {
	params.split(',').map(str::trim).filter(|f| !f.is_empty())
}

/// Accepts files whose id matches a regular expression.
pub struct FileIdFilter {
	compiled: Mutex<HashMap<String, Regex>>,
}

impl FileIdFilter {
	pub fn new() -> Self {
		Self {
			compiled: Mutex::new(HashMap::new()),
		}
	}

	fn regex(&self, pattern: &str) -> Result<Regex> {
		let mut compiled = self.compiled.lock();
		if let Some(regex) = compiled.get(pattern) {
			return Ok(regex.clone());
		}
		let regex = Regex::new(pattern)
			.map_err(|e| Error::validation(format!("invalid file_id pattern '{}': {}", pattern, e)))?;
		compiled.insert(pattern.to_string(), regex.clone());
		Ok(regex)
	}
}

impl Default for FileIdFilter {
	fn default() -> Self {
		Self::new()
	}
}

impl FilterPlugin for FileIdFilter {
	fn name(&self) -> &str {
		"file_id"
	}

	fn validate(&self, params: &str) -> Result<()> {
		self.regex(params).map(|_| ())
	}

	fn matches(&self, file: &FileMeta, params: &str) -> Result<bool> {
		Ok(self.regex(params)?.is_match(&file.file.file_id))
	}
}

/// Accepts file versions greater than or equal to the given number.
pub struct MinVersionFilter;

impl MinVersionFilter {
	fn threshold(params: &str) -> Result<u32> {
		params
			.trim()
			.parse()
			.map_err(|_| Error::validation(format!("min_version expects an integer, got '{}'", params)))
	}
}

impl FilterPlugin for MinVersionFilter {
	fn name(&self) -> &str {
		"min_version"
	}

	fn validate(&self, params: &str) -> Result<()> {
		Self::threshold(params).map(|_| ())
	}

	fn matches(&self, file: &FileMeta, params: &str) -> Result<bool> {
		Ok(file.file.file_version >= Self::threshold(params)?)
	}
}

#[cfg(test)]
mod tests {
	use arkiv_type::{FileRef, Timestamp};

	use super::*;

	fn meta(id: &str, version: u32, format: &str) -> FileMeta {
		FileMeta::new(FileRef::new(id, version, "disk-1"), Timestamp::from_millis(0), format)
	}

	#[test]
	fn test_format_filter() {
		let filter = FormatFilter;
		let params = "image/fits, application/x-cfitsio";
		assert!(filter.matches(&meta("a", 1, "image/fits"), params).unwrap());
		assert!(filter.matches(&meta("a", 1, "APPLICATION/X-CFITSIO"), params).unwrap());
		assert!(!filter.matches(&meta("a", 1, "text/plain"), params).unwrap());
		assert!(filter.validate(" , ").is_err());
	}

	#[test]
	fn test_file_id_filter() {
		let filter = FileIdFilter::new();
		assert!(filter.matches(&meta("MCT.2020-01-02", 1, "image/fits"), "^MCT\\.").unwrap());
		assert!(!filter.matches(&meta("XYZ.2020-01-02", 1, "image/fits"), "^MCT\\.").unwrap());
		assert!(matches!(filter.validate("("), Err(Error::Validation(_))));
	}

	#[test]
	fn test_min_version_filter() {
		let filter = MinVersionFilter;
		assert!(filter.matches(&meta("a", 2, "image/fits"), "2").unwrap());
		assert!(!filter.matches(&meta("a", 1, "image/fits"), "2").unwrap());
		assert!(filter.validate("two").is_err());
	}
}
