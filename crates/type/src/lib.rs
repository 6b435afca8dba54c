// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Shared types for the arkiv subscription and delivery subsystem.

pub mod error;
pub mod file;
pub mod id;
pub mod subscriber;
pub mod time;

pub use error::{Error, Result};
pub use file::FileMeta;
pub use id::{FileRef, SubscriberId, WorkerId};
pub use subscriber::{Subscriber, SubscriberUpdate};
pub use time::Timestamp;
