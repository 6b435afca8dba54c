// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	fmt::{self, Display, Formatter},
	ops::Deref,
};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Unique identifier of a subscriber.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	/// Derives an identifier from an endpoint URL: `host:port/path`, scheme stripped.
	pub fn from_url(url: &str) -> Result<Self> {
		let parsed = parse_endpoint(url)?;
		let host = parsed.host_str().unwrap_or_default();
		let port = parsed.port_or_known_default().unwrap_or_default();
		let path = parsed.path().trim_end_matches('/');
		Ok(Self(format!("{}:{}{}", host, port, path)))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Deref for SubscriberId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl Display for SubscriberId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for SubscriberId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl From<String> for SubscriberId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

/// Parses and validates a subscriber endpoint URL.
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn parse_endpoint(url: &str) -> Result<Url> {
	let parsed = Url::parse(url).map_err(|e| Error::validation(format!("malformed url '{}': {}", url, e)))?;
	match parsed.scheme() {
		"http" | "https" => {}
		other => return Err(Error::validation(format!("unsupported url scheme '{}'", other))),
	}
	if parsed.host_str().map(str::is_empty).unwrap_or(true) {
		return Err(Error::validation(format!("url '{}' has no host", url)));
	}
	Ok(parsed)
}

/// One stored version of an archived file on a specific disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileRef {
	pub file_id: String,
	pub file_version: u32,
	pub disk_id: String,
}

impl FileRef {
	pub fn new(file_id: impl Into<String>, file_version: u32, disk_id: impl Into<String>) -> Self {
		Self {
			file_id: file_id.into(),
			file_version,
			disk_id: disk_id.into(),
		}
	}
}

impl Display for FileRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}/v{}@{}", self.file_id, self.file_version, self.disk_id)
	}
}

/// Identifier of a delivery worker within one subscriber's pool.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(pub u32);

impl Display for WorkerId {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl Deref for WorkerId {
	type Target = u32;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<u32> for WorkerId {
	fn from(value: u32) -> Self {
		WorkerId(value)
	}
}
