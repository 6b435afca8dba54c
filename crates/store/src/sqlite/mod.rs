// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! SQLite backend.
//!
//! Uses a writer thread for all mutations and a separate reader connection
//! for queries.

mod config;
mod read;
mod row;
mod tables;
mod writer;

use std::{
	sync::{
		Arc,
		mpsc::{self, Sender},
	},
	thread,
	time::Duration,
};

use arkiv_type::{Error, FileMeta, FileRef, Result, Subscriber, SubscriberId, Timestamp};
pub use config::{DbPath, JournalMode, SqliteConfig, SynchronousMode};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::instrument;
use writer::{WriteCommand, run_writer};

use crate::backend::{DeliveryStore, FileCatalog, FileCursor, Obligation, SubscriberStore};

pub(crate) fn persistence(context: &str, err: rusqlite::Error) -> Error {
	Error::persistence(format!("{}: {}", context, err))
}

#[derive(Clone)]
pub struct SqliteStore {
	inner: Arc<SqliteStoreInner>,
}

struct SqliteStoreInner {
	writer: Sender<WriteCommand>,
	writer_thread: Mutex<Option<thread::JoinHandle<()>>>,
	reader: Mutex<Connection>,
	db_path: DbPath,
}

impl Drop for SqliteStoreInner {
	fn drop(&mut self) {
		let _ = self.writer.send(WriteCommand::Shutdown);

		if let Some(handle) = self.writer_thread.lock().take() {
			let _ = handle.join();
		}

		if let DbPath::Tmpfs(path) = &self.db_path {
			let _ = std::fs::remove_file(path);
			let _ = std::fs::remove_file(format!("{}-wal", path.display()));
			let _ = std::fs::remove_file(format!("{}-shm", path.display()));
		}
	}
}

fn connect(config: &SqliteConfig) -> Result<Connection> {
	let conn = Connection::open(config.path.path()).map_err(|e| persistence("open", e))?;
	conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(|e| persistence("busy_timeout", e))?;
	Ok(conn)
}

impl SqliteStore {
	#[instrument(name = "store::sqlite::new", level = "info", skip(config), fields(
		db_path = ?config.path,
		journal_mode = %config.journal_mode.as_str()
	))]
	pub fn new(config: SqliteConfig) -> Result<Self> {
		let conn = connect(&config)?;
		conn.pragma_update(None, "journal_mode", config.journal_mode.as_str())
			.map_err(|e| persistence("journal_mode", e))?;
		conn.pragma_update(None, "synchronous", config.synchronous_mode.as_str())
			.map_err(|e| persistence("synchronous", e))?;
		conn.execute_batch(tables::SCHEMA).map_err(|e| persistence("create schema", e))?;

		let (sender, receiver) = mpsc::channel();
		let writer_thread = thread::Builder::new()
			.name("sqlite-writer".to_string())
			.spawn(move || run_writer(receiver, conn))
			.map_err(|e| Error::internal(format!("failed to spawn sqlite writer: {}", e)))?;

		let reader = connect(&config)?;

		Ok(Self {
			inner: Arc::new(SqliteStoreInner {
				writer: sender,
				writer_thread: Mutex::new(Some(writer_thread)),
				reader: Mutex::new(reader),
				db_path: config.path,
			}),
		})
	}

	/// Throwaway store for tests.
	pub fn tmpfs() -> Result<Self> {
		Self::new(SqliteConfig::tmpfs())
	}

	fn write<T>(&self, command: impl FnOnce(Sender<Result<T>>) -> WriteCommand) -> Result<T> {
		let (respond_to, receiver) = mpsc::channel();
		self.inner.writer.send(command(respond_to)).map_err(|_| Error::persistence("writer thread died"))?;
		receiver.recv().map_err(|_| Error::persistence("writer thread died"))?
	}
}

impl SubscriberStore for SqliteStore {
	fn insert_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
		self.write(|respond_to| WriteCommand::InsertSubscriber {
			subscriber: subscriber.clone(),
			respond_to,
		})
	}

	fn update_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
		self.write(|respond_to| WriteCommand::UpdateSubscriber {
			subscriber: subscriber.clone(),
			respond_to,
		})
	}

	fn delete_subscriber(&self, id: &SubscriberId) -> Result<bool> {
		self.write(|respond_to| WriteCommand::DeleteSubscriber {
			id: id.clone(),
			respond_to,
		})
	}

	fn remove_subscriber(&self, id: &SubscriberId) -> Result<Vec<FileRef>> {
		self.write(|respond_to| WriteCommand::RemoveSubscriber {
			id: id.clone(),
			respond_to,
		})
	}

	fn load_subscribers(&self) -> Result<Vec<Subscriber>> {
		read::load_subscribers(&self.inner.reader.lock())
	}

	fn set_watermark(&self, id: &SubscriberId, watermark: Option<Timestamp>) -> Result<()> {
		self.write(|respond_to| WriteCommand::SetWatermark {
			id: id.clone(),
			watermark,
			respond_to,
		})
	}
}

impl DeliveryStore for SqliteStore {
	fn enqueue(&self, subscriber: &SubscriberId, file: &FileMeta) -> Result<()> {
		self.write(|respond_to| WriteCommand::Enqueue {
			subscriber: subscriber.clone(),
			file: file.clone(),
			respond_to,
		})
	}

	fn dequeue(&self, subscriber: &SubscriberId, file: &FileRef) -> Result<u64> {
		self.write(|respond_to| WriteCommand::Dequeue {
			subscriber: subscriber.clone(),
			file: file.clone(),
			respond_to,
		})
	}

	fn list_pending(&self, subscriber: &SubscriberId) -> Result<Vec<Obligation>> {
		read::list_pending(&self.inner.reader.lock(), subscriber)
	}

	fn list_pending_for_file(&self, file: &FileRef) -> Result<Vec<Obligation>> {
		read::list_pending_for_file(&self.inner.reader.lock(), file)
	}

	fn record_failure(&self, subscriber: &SubscriberId, file: &FileRef, error: &str) -> Result<()> {
		self.write(|respond_to| WriteCommand::RecordFailure {
			subscriber: subscriber.clone(),
			file: file.clone(),
			error: error.to_string(),
			respond_to,
		})
	}

	fn pending_counts(&self) -> Result<Vec<(FileRef, u64)>> {
		read::pending_counts(&self.inner.reader.lock())
	}

	fn min_pending_ingestion(&self, subscriber: &SubscriberId) -> Result<Option<Timestamp>> {
		read::min_pending_ingestion(&self.inner.reader.lock(), subscriber)
	}

	fn clear_subscriber(&self, subscriber: &SubscriberId) -> Result<Vec<FileRef>> {
		self.write(|respond_to| WriteCommand::ClearSubscriber {
			subscriber: subscriber.clone(),
			respond_to,
		})
	}
}

impl FileCatalog for SqliteStore {
	fn register_file(&self, file: &FileMeta) -> Result<()> {
		self.write(|respond_to| WriteCommand::RegisterFile {
			file: file.clone(),
			respond_to,
		})
	}

	fn get_file(&self, file: &FileRef) -> Result<Option<FileMeta>> {
		read::get_file(&self.inner.reader.lock(), file)
	}

	fn files_ingested_after(&self, after: Option<&FileCursor>, limit: usize) -> Result<Vec<FileMeta>> {
		read::files_ingested_after(&self.inner.reader.lock(), after, limit)
	}
}
