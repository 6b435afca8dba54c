// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Durable storage for the subscription subsystem.
//!
//! The delivery queue stored here is the single source of truth for
//! outstanding obligations. In-memory queues are rebuilt from it on start-up.

pub mod backend;
pub mod memory;
pub mod sqlite;

pub use backend::{Backend, DeliveryStore, FileCatalog, FileCursor, Obligation, SubscriberStore};
pub use memory::MemoryStore;
pub use sqlite::{DbPath, JournalMode, SqliteConfig, SqliteStore, SynchronousMode};
