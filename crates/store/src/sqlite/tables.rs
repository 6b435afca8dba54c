// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Schema of the subscription tables and the archive file table.

pub(super) const SCHEMA: &str = "
BEGIN;
CREATE TABLE IF NOT EXISTS subscriber (
    subscriber_id            TEXT    NOT NULL PRIMARY KEY,
    host_id                  TEXT    NOT NULL,
    port                     INTEGER NOT NULL,
    priority                 INTEGER NOT NULL,
    url                      TEXT    NOT NULL,
    start_date               INTEGER NOT NULL,
    filter_plugin            TEXT    NOT NULL,
    filter_plugin_params     TEXT    NOT NULL,
    concurrent_threads       INTEGER NOT NULL,
    active                   INTEGER NOT NULL,
    suspended                INTEGER NOT NULL,
    last_file_ingestion_date INTEGER
);

CREATE TABLE IF NOT EXISTS subscriber_queue (
    subscriber_id  TEXT    NOT NULL,
    file_id        TEXT    NOT NULL,
    file_version   INTEGER NOT NULL,
    disk_id        TEXT    NOT NULL,
    ingestion_date INTEGER NOT NULL,
    enqueued_at    INTEGER NOT NULL,
    attempts       INTEGER NOT NULL DEFAULT 0,
    last_error     TEXT,
    PRIMARY KEY (subscriber_id, file_id, file_version, disk_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS subscriber_queue_by_file
    ON subscriber_queue (file_id, file_version, disk_id);

CREATE TABLE IF NOT EXISTS file (
    file_id        TEXT    NOT NULL,
    file_version   INTEGER NOT NULL,
    disk_id        TEXT    NOT NULL,
    ingestion_date INTEGER NOT NULL,
    format         TEXT    NOT NULL,
    checksum       TEXT,
    size           INTEGER NOT NULL,
    path           TEXT    NOT NULL,
    PRIMARY KEY (file_id, file_version, disk_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS file_by_ingestion
    ON file (ingestion_date, file_id, file_version, disk_id);
COMMIT;
";

pub(super) const SUBSCRIBER_COLUMNS: &str = "subscriber_id, host_id, port, priority, url, start_date, filter_plugin, \
	 filter_plugin_params, concurrent_threads, active, suspended, last_file_ingestion_date";

pub(super) const QUEUE_COLUMNS: &str =
	"subscriber_id, file_id, file_version, disk_id, ingestion_date, enqueued_at, attempts, last_error";

pub(super) const FILE_COLUMNS: &str =
	"file_id, file_version, disk_id, ingestion_date, format, checksum, size, path";
