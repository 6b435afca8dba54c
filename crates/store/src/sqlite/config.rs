// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::path::{Path, PathBuf};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbPath {
	File(PathBuf),
	/// Throwaway database file, removed when the store is dropped.
	Tmpfs(PathBuf),
}

impl DbPath {
	pub fn path(&self) -> &Path {
		match self {
			DbPath::File(path) | DbPath::Tmpfs(path) => path,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
	Delete,
	Truncate,
	Wal,
	Memory,
}

impl JournalMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			JournalMode::Delete => "DELETE",
			JournalMode::Truncate => "TRUNCATE",
			JournalMode::Wal => "WAL",
			JournalMode::Memory => "MEMORY",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynchronousMode {
	Off,
	Normal,
	Full,
}

impl SynchronousMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			SynchronousMode::Off => "OFF",
			SynchronousMode::Normal => "NORMAL",
			SynchronousMode::Full => "FULL",
		}
	}
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
	pub path: DbPath,
	pub journal_mode: JournalMode,
	pub synchronous_mode: SynchronousMode,
	/// How long a connection waits on a locked database.
	pub busy_timeout_ms: u64,
}

impl SqliteConfig {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: DbPath::File(path.into()),
			journal_mode: JournalMode::Wal,
			synchronous_mode: SynchronousMode::Full,
			busy_timeout_ms: 5_000,
		}
	}

	/// Uniquely named database in the temp directory, deleted on drop.
	pub fn tmpfs() -> Self {
		let name = format!("arkiv-{}.db", uuid::Uuid::new_v4());
		Self {
			path: DbPath::Tmpfs(std::env::temp_dir().join(name)),
			journal_mode: JournalMode::Wal,
			synchronous_mode: SynchronousMode::Off,
			busy_timeout_ms: 5_000,
		}
	}

	pub fn journal_mode(mut self, mode: JournalMode) -> Self {
		self.journal_mode = mode;
		self
	}

	pub fn synchronous_mode(mut self, mode: SynchronousMode) -> Self {
		self.synchronous_mode = mode;
		self
	}

	pub fn busy_timeout_ms(mut self, timeout: u64) -> Self {
		self.busy_timeout_ms = timeout;
		self
	}
}
