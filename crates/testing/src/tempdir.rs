// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	env, fs,
	path::{Path, PathBuf},
};

use uuid::Uuid;

/// A unique path for a database file, not created yet.
pub fn temp_db_path() -> PathBuf {
	env::temp_dir().join(format!("arkiv-{}.db", Uuid::new_v4()))
}

/// Removes a SQLite database together with its journal files.
pub fn remove_db(path: &Path) {
	let _ = fs::remove_file(path);
	let _ = fs::remove_file(format!("{}-wal", path.display()));
	let _ = fs::remove_file(format!("{}-shm", path.display()));
}
