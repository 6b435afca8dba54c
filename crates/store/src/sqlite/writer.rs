// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Background writer thread for the SQLite backend.
//!
//! Every mutation is sent as a command and acknowledged only after its
//! transaction committed, so a successful return means the write is durable.

use std::sync::mpsc::{Receiver, Sender};

use arkiv_type::{Error, FileMeta, FileRef, Result, Subscriber, SubscriberId, Timestamp};
use rusqlite::{Connection, ErrorCode, Transaction, params};
use tracing::{debug, error, info, instrument};

use super::{persistence, row};

pub(super) enum WriteCommand {
	InsertSubscriber {
		subscriber: Subscriber,
		respond_to: Sender<Result<()>>,
	},
	UpdateSubscriber {
		subscriber: Subscriber,
		respond_to: Sender<Result<()>>,
	},
	DeleteSubscriber {
		id: SubscriberId,
		respond_to: Sender<Result<bool>>,
	},
	RemoveSubscriber {
		id: SubscriberId,
		respond_to: Sender<Result<Vec<FileRef>>>,
	},
	SetWatermark {
		id: SubscriberId,
		watermark: Option<Timestamp>,
		respond_to: Sender<Result<()>>,
	},
	Enqueue {
		subscriber: SubscriberId,
		file: FileMeta,
		respond_to: Sender<Result<()>>,
	},
	Dequeue {
		subscriber: SubscriberId,
		file: FileRef,
		respond_to: Sender<Result<u64>>,
	},
	RecordFailure {
		subscriber: SubscriberId,
		file: FileRef,
		error: String,
		respond_to: Sender<Result<()>>,
	},
	ClearSubscriber {
		subscriber: SubscriberId,
		respond_to: Sender<Result<Vec<FileRef>>>,
	},
	RegisterFile {
		file: FileMeta,
		respond_to: Sender<Result<()>>,
	},
	Shutdown,
}

pub(super) fn run_writer(receiver: Receiver<WriteCommand>, mut conn: Connection) {
	debug!(name: "sqlite_writer", "background writer thread started");

	while let Ok(cmd) = receiver.recv() {
		match cmd {
			WriteCommand::InsertSubscriber {
				subscriber,
				respond_to,
			} => {
				let _ = respond_to.send(report(insert_subscriber(&conn, &subscriber)));
			}
			WriteCommand::UpdateSubscriber {
				subscriber,
				respond_to,
			} => {
				let _ = respond_to.send(report(update_subscriber(&conn, &subscriber)));
			}
			WriteCommand::DeleteSubscriber {
				id,
				respond_to,
			} => {
				let result = conn
					.execute("DELETE FROM subscriber WHERE subscriber_id = ?1", params![id.as_str()])
					.map(|n| n > 0)
					.map_err(|e| persistence("delete_subscriber", e));
				let _ = respond_to.send(report(result));
			}
			WriteCommand::RemoveSubscriber {
				id,
				respond_to,
			} => {
				let _ = respond_to.send(report(remove_subscriber(&mut conn, &id)));
			}
			WriteCommand::SetWatermark {
				id,
				watermark,
				respond_to,
			} => {
				let _ = respond_to.send(report(set_watermark(&conn, &id, watermark)));
			}
			WriteCommand::Enqueue {
				subscriber,
				file,
				respond_to,
			} => {
				let _ = respond_to.send(enqueue(&conn, &subscriber, &file));
			}
			WriteCommand::Dequeue {
				subscriber,
				file,
				respond_to,
			} => {
				let _ = respond_to.send(report(dequeue(&mut conn, &subscriber, &file)));
			}
			WriteCommand::RecordFailure {
				subscriber,
				file,
				error,
				respond_to,
			} => {
				let _ = respond_to.send(report(record_failure(&conn, &subscriber, &file, &error)));
			}
			WriteCommand::ClearSubscriber {
				subscriber,
				respond_to,
			} => {
				let _ = respond_to.send(report(clear_subscriber(&mut conn, &subscriber)));
			}
			WriteCommand::RegisterFile {
				file,
				respond_to,
			} => {
				let _ = respond_to.send(report(register_file(&conn, &file)));
			}
			WriteCommand::Shutdown => {
				info!(name: "sqlite_writer", "background writer thread shutting down");
				break;
			}
		}
	}
}

fn report<T>(result: Result<T>) -> Result<T> {
	if let Err(ref e) = result {
		error!(err = %e, "sqlite write failed");
	}
	result
}

fn insert_subscriber(conn: &Connection, s: &Subscriber) -> Result<()> {
	conn.execute(
		"INSERT INTO subscriber (subscriber_id, host_id, port, priority, url, start_date, filter_plugin, \
		 filter_plugin_params, concurrent_threads, active, suspended, last_file_ingestion_date) \
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
		params![
			s.id.as_str(),
			s.host_id,
			i64::from(s.port),
			i64::from(s.priority),
			s.url,
			s.start_date.as_millis(),
			s.filter_plugin,
			s.filter_plugin_params,
			i64::from(s.concurrent_threads),
			s.active,
			s.suspended,
			s.last_file_ingestion_date.map(|t| t.as_millis()),
		],
	)
	.map(|_| ())
	.map_err(|e| persistence("insert_subscriber", e))
}

fn update_subscriber(conn: &Connection, s: &Subscriber) -> Result<()> {
	let changed = conn
		.execute(
			"UPDATE subscriber SET host_id = ?2, port = ?3, priority = ?4, url = ?5, start_date = ?6, \
			 filter_plugin = ?7, filter_plugin_params = ?8, concurrent_threads = ?9, active = ?10, \
			 suspended = ?11, last_file_ingestion_date = ?12 WHERE subscriber_id = ?1",
			params![
				s.id.as_str(),
				s.host_id,
				i64::from(s.port),
				i64::from(s.priority),
				s.url,
				s.start_date.as_millis(),
				s.filter_plugin,
				s.filter_plugin_params,
				i64::from(s.concurrent_threads),
				s.active,
				s.suspended,
				s.last_file_ingestion_date.map(|t| t.as_millis()),
			],
		)
		.map_err(|e| persistence("update_subscriber", e))?;
	if changed == 0 {
		return Err(Error::not_found(format!("subscriber {}", s.id)));
	}
	Ok(())
}

fn set_watermark(conn: &Connection, id: &SubscriberId, watermark: Option<Timestamp>) -> Result<()> {
	let changed = conn
		.execute(
			"UPDATE subscriber SET last_file_ingestion_date = ?2 WHERE subscriber_id = ?1",
			params![id.as_str(), watermark.map(|t| t.as_millis())],
		)
		.map_err(|e| persistence("set_watermark", e))?;
	if changed == 0 {
		return Err(Error::not_found(format!("subscriber {}", id)));
	}
	Ok(())
}

#[instrument(name = "store::sqlite::enqueue", level = "trace", skip(conn, file), fields(subscriber = %subscriber, file = %file.file))]
fn enqueue(conn: &Connection, subscriber: &SubscriberId, file: &FileMeta) -> Result<()> {
	let result = conn.execute(
		"INSERT INTO subscriber_queue (subscriber_id, file_id, file_version, disk_id, ingestion_date, enqueued_at) \
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
		params![
			subscriber.as_str(),
			file.file.file_id,
			i64::from(file.file.file_version),
			file.file.disk_id,
			file.ingestion_date.as_millis(),
			Timestamp::now().as_millis(),
		],
	);
	match result {
		Ok(_) => Ok(()),
		Err(rusqlite::Error::SqliteFailure(failure, _)) if failure.code == ErrorCode::ConstraintViolation => {
			Err(Error::DuplicateObligation {
				subscriber: subscriber.clone(),
				file: file.file.clone(),
			})
		}
		Err(e) => report(Err(persistence("enqueue", e))),
	}
}

#[instrument(name = "store::sqlite::dequeue", level = "trace", skip(conn), fields(subscriber = %subscriber, file = %file))]
fn dequeue(conn: &mut Connection, subscriber: &SubscriberId, file: &FileRef) -> Result<u64> {
	let tx = conn.transaction().map_err(|e| persistence("dequeue", e))?;
	let removed = tx
		.execute(
			"DELETE FROM subscriber_queue \
			 WHERE subscriber_id = ?1 AND file_id = ?2 AND file_version = ?3 AND disk_id = ?4",
			params![subscriber.as_str(), file.file_id, i64::from(file.file_version), file.disk_id],
		)
		.map_err(|e| persistence("dequeue", e))?;
	if removed == 0 {
		return Err(Error::not_found(format!("obligation {} for {}", file, subscriber)));
	}
	let remaining: i64 = tx
		.query_row(
			"SELECT COUNT(*) FROM subscriber_queue WHERE file_id = ?1 AND file_version = ?2 AND disk_id = ?3",
			params![file.file_id, i64::from(file.file_version), file.disk_id],
			|r| r.get(0),
		)
		.map_err(|e| persistence("dequeue", e))?;
	tx.commit().map_err(|e| persistence("dequeue", e))?;
	Ok(remaining.max(0) as u64)
}

fn record_failure(conn: &Connection, subscriber: &SubscriberId, file: &FileRef, error: &str) -> Result<()> {
	let changed = conn
		.execute(
			"UPDATE subscriber_queue SET attempts = attempts + 1, last_error = ?5 \
			 WHERE subscriber_id = ?1 AND file_id = ?2 AND file_version = ?3 AND disk_id = ?4",
			params![subscriber.as_str(), file.file_id, i64::from(file.file_version), file.disk_id, error],
		)
		.map_err(|e| persistence("record_failure", e))?;
	if changed == 0 {
		return Err(Error::not_found(format!("obligation {} for {}", file, subscriber)));
	}
	Ok(())
}

/// Selects and deletes the queue rows of `subscriber` inside `tx`.
fn drain_queue(tx: &Transaction<'_>, subscriber: &SubscriberId) -> rusqlite::Result<Vec<FileRef>> {
	let released = {
		let mut stmt =
			tx.prepare("SELECT file_id, file_version, disk_id FROM subscriber_queue WHERE subscriber_id = ?1")?;
		let rows = stmt.query_map(params![subscriber.as_str()], |r| row::file_ref(r, 0))?;
		rows.collect::<rusqlite::Result<Vec<_>>>()?
	};
	tx.execute("DELETE FROM subscriber_queue WHERE subscriber_id = ?1", params![subscriber.as_str()])?;
	Ok(released)
}

fn clear_subscriber(conn: &mut Connection, subscriber: &SubscriberId) -> Result<Vec<FileRef>> {
	let tx = conn.transaction().map_err(|e| persistence("clear_subscriber", e))?;
	let released = drain_queue(&tx, subscriber).map_err(|e| persistence("clear_subscriber", e))?;
	tx.commit().map_err(|e| persistence("clear_subscriber", e))?;
	debug!(subscriber = %subscriber, released = released.len(), "cleared queue rows");
	Ok(released)
}

#[instrument(name = "store::sqlite::remove_subscriber", level = "trace", skip(conn), fields(subscriber = %id))]
fn remove_subscriber(conn: &mut Connection, id: &SubscriberId) -> Result<Vec<FileRef>> {
	let tx = conn.transaction().map_err(|e| persistence("remove_subscriber", e))?;
	let released = drain_queue(&tx, id).map_err(|e| persistence("remove_subscriber", e))?;
	tx.execute("DELETE FROM subscriber WHERE subscriber_id = ?1", params![id.as_str()])
		.map_err(|e| persistence("remove_subscriber", e))?;
	tx.commit().map_err(|e| persistence("remove_subscriber", e))?;
	debug!(subscriber = %id, released = released.len(), "removed subscriber and its queue rows");
	Ok(released)
}

fn register_file(conn: &Connection, file: &FileMeta) -> Result<()> {
	conn.execute(
		"INSERT OR REPLACE INTO file (file_id, file_version, disk_id, ingestion_date, format, checksum, size, path) \
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
		params![
			file.file.file_id,
			i64::from(file.file.file_version),
			file.file.disk_id,
			file.ingestion_date.as_millis(),
			file.format,
			file.checksum,
			i64::try_from(file.size).unwrap_or(i64::MAX),
			file.path.to_string_lossy().into_owned(),
		],
	)
	.map(|_| ())
	.map_err(|e| persistence("register_file", e))
}
