// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Row <-> model conversion. Column order follows the constants in `tables`.

use std::path::PathBuf;

use arkiv_type::{FileMeta, FileRef, Subscriber, SubscriberId, Timestamp};
use rusqlite::{Row, types::Type};

use crate::backend::Obligation;

fn narrow<T: TryFrom<i64>>(row: &Row, idx: usize) -> rusqlite::Result<T> {
	let value: i64 = row.get(idx)?;
	T::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, value))
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<Timestamp> {
	Ok(Timestamp::from_millis(row.get(idx)?))
}

pub(super) fn subscriber(row: &Row) -> rusqlite::Result<Subscriber> {
	Ok(Subscriber {
		id: SubscriberId::new(row.get::<_, String>(0)?),
		host_id: row.get(1)?,
		port: narrow(row, 2)?,
		priority: narrow(row, 3)?,
		url: row.get(4)?,
		start_date: timestamp(row, 5)?,
		filter_plugin: row.get(6)?,
		filter_plugin_params: row.get(7)?,
		concurrent_threads: narrow(row, 8)?,
		active: row.get(9)?,
		suspended: row.get(10)?,
		last_file_ingestion_date: row.get::<_, Option<i64>>(11)?.map(Timestamp::from_millis),
	})
}

pub(super) fn file_ref(row: &Row, offset: usize) -> rusqlite::Result<FileRef> {
	Ok(FileRef {
		file_id: row.get(offset)?,
		file_version: narrow(row, offset + 1)?,
		disk_id: row.get(offset + 2)?,
	})
}

pub(super) fn obligation(row: &Row) -> rusqlite::Result<Obligation> {
	Ok(Obligation {
		subscriber: SubscriberId::new(row.get::<_, String>(0)?),
		file: file_ref(row, 1)?,
		ingestion_date: timestamp(row, 4)?,
		enqueued_at: timestamp(row, 5)?,
		attempts: narrow(row, 6)?,
		last_error: row.get(7)?,
	})
}

pub(super) fn file_meta(row: &Row) -> rusqlite::Result<FileMeta> {
	let size: i64 = row.get(6)?;
	let size = u64::try_from(size).map_err(|_| rusqlite::Error::InvalidColumnType(6, "size".into(), Type::Integer))?;
	Ok(FileMeta {
		file: file_ref(row, 0)?,
		ingestion_date: timestamp(row, 3)?,
		format: row.get(4)?,
		checksum: row.get(5)?,
		size,
		path: PathBuf::from(row.get::<_, String>(7)?),
	})
}
