// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Queries served by the reader connection.

use arkiv_type::{FileMeta, FileRef, Result, Subscriber, SubscriberId, Timestamp};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::instrument;

use super::{
	persistence, row,
	tables::{FILE_COLUMNS, QUEUE_COLUMNS, SUBSCRIBER_COLUMNS},
};
use crate::backend::{FileCursor, Obligation};

#[instrument(name = "store::sqlite::load_subscribers", level = "trace", skip(conn))]
pub(super) fn load_subscribers(conn: &Connection) -> Result<Vec<Subscriber>> {
	let mut stmt = conn
		.prepare_cached(&format!("SELECT {} FROM subscriber ORDER BY subscriber_id", SUBSCRIBER_COLUMNS))
		.map_err(|e| persistence("prepare load_subscribers", e))?;
	let rows = stmt.query_map([], row::subscriber).map_err(|e| persistence("load_subscribers", e))?;
	rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|e| persistence("load_subscribers", e))
}

#[instrument(name = "store::sqlite::list_pending", level = "trace", skip(conn), fields(subscriber = %subscriber))]
pub(super) fn list_pending(conn: &Connection, subscriber: &SubscriberId) -> Result<Vec<Obligation>> {
	let mut stmt = conn
		.prepare_cached(&format!(
			"SELECT {} FROM subscriber_queue WHERE subscriber_id = ?1 \
			 ORDER BY ingestion_date, file_id, file_version, disk_id",
			QUEUE_COLUMNS
		))
		.map_err(|e| persistence("prepare list_pending", e))?;
	let rows = stmt.query_map(params![subscriber.as_str()], row::obligation).map_err(|e| persistence("list_pending", e))?;
	rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|e| persistence("list_pending", e))
}

pub(super) fn list_pending_for_file(conn: &Connection, file: &FileRef) -> Result<Vec<Obligation>> {
	let mut stmt = conn
		.prepare_cached(&format!(
			"SELECT {} FROM subscriber_queue WHERE file_id = ?1 AND file_version = ?2 AND disk_id = ?3 \
			 ORDER BY subscriber_id",
			QUEUE_COLUMNS
		))
		.map_err(|e| persistence("prepare list_pending_for_file", e))?;
	let rows = stmt
		.query_map(params![file.file_id, i64::from(file.file_version), file.disk_id], row::obligation)
		.map_err(|e| persistence("list_pending_for_file", e))?;
	rows.collect::<rusqlite::Result<Vec<_>>>().map_err(|e| persistence("list_pending_for_file", e))
}

pub(super) fn pending_counts(conn: &Connection) -> Result<Vec<(FileRef, u64)>> {
	let mut stmt = conn
		.prepare_cached(
			"SELECT file_id, file_version, disk_id, COUNT(*) FROM subscriber_queue \
			 GROUP BY file_id, file_version, disk_id",
		)
		.map_err(|e| persistence("prepare pending_counts", e))?;
	let rows = stmt
		.query_map([], |r| Ok((row::file_ref(r, 0)?, r.get::<_, i64>(3)?)))
		.map_err(|e| persistence("pending_counts", e))?;
	let mut counts = Vec::new();
	for entry in rows {
		let (file, count) = entry.map_err(|e| persistence("pending_counts", e))?;
		counts.push((file, count.max(0) as u64));
	}
	Ok(counts)
}

pub(super) fn min_pending_ingestion(conn: &Connection, subscriber: &SubscriberId) -> Result<Option<Timestamp>> {
	conn.query_row(
		"SELECT MIN(ingestion_date) FROM subscriber_queue WHERE subscriber_id = ?1",
		params![subscriber.as_str()],
		|r| r.get::<_, Option<i64>>(0),
	)
	.map(|min| min.map(Timestamp::from_millis))
	.map_err(|e| persistence("min_pending_ingestion", e))
}

pub(super) fn get_file(conn: &Connection, file: &FileRef) -> Result<Option<FileMeta>> {
	conn.query_row(
		&format!("SELECT {} FROM file WHERE file_id = ?1 AND file_version = ?2 AND disk_id = ?3", FILE_COLUMNS),
		params![file.file_id, i64::from(file.file_version), file.disk_id],
		row::file_meta,
	)
	.optional()
	.map_err(|e| persistence("get_file", e))
}

#[instrument(name = "store::sqlite::files_ingested_after", level = "trace", skip(conn, after))]
pub(super) fn files_ingested_after(conn: &Connection, after: Option<&FileCursor>, limit: usize) -> Result<Vec<FileMeta>> {
	let limit = i64::try_from(limit).unwrap_or(i64::MAX);
	let files = match after {
		None => {
			let mut stmt = conn
				.prepare_cached(&format!(
					"SELECT {} FROM file ORDER BY ingestion_date, file_id, file_version, disk_id LIMIT ?1",
					FILE_COLUMNS
				))
				.map_err(|e| persistence("prepare files_ingested_after", e))?;
			stmt.query_map(params![limit], row::file_meta)
				.and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
		}
		Some(FileCursor {
			ingestion_date,
			file: None,
		}) => {
			let mut stmt = conn
				.prepare_cached(&format!(
					"SELECT {} FROM file WHERE ingestion_date > ?1 \
					 ORDER BY ingestion_date, file_id, file_version, disk_id LIMIT ?2",
					FILE_COLUMNS
				))
				.map_err(|e| persistence("prepare files_ingested_after", e))?;
			stmt.query_map(params![ingestion_date.as_millis(), limit], row::file_meta)
				.and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
		}
		Some(FileCursor {
			ingestion_date,
			file: Some(file),
		}) => {
			let mut stmt = conn
				.prepare_cached(&format!(
					"SELECT {} FROM file \
					 WHERE (ingestion_date, file_id, file_version, disk_id) > (?1, ?2, ?3, ?4) \
					 ORDER BY ingestion_date, file_id, file_version, disk_id LIMIT ?5",
					FILE_COLUMNS
				))
				.map_err(|e| persistence("prepare files_ingested_after", e))?;
			stmt.query_map(
				params![
					ingestion_date.as_millis(),
					file.file_id,
					i64::from(file.file_version),
					file.disk_id,
					limit
				],
				row::file_meta,
			)
			.and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
		}
	};
	files.map_err(|e| persistence("files_ingested_after", e))
}
