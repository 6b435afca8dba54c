// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::{Deserialize, Serialize};

use crate::{SubscriberId, Timestamp};

/// Configuration and progress of one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
	pub id: SubscriberId,
	pub host_id: String,
	pub port: u16,
	/// Lower values are dispatched first.
	pub priority: i32,
	pub url: String,
	/// Files ingested before this point are never delivered.
	pub start_date: Timestamp,
	pub filter_plugin: String,
	pub filter_plugin_params: String,
	pub concurrent_threads: u32,
	pub active: bool,
	pub suspended: bool,
	/// Watermark. Every matching file ingested at or before it has been delivered.
	pub last_file_ingestion_date: Option<Timestamp>,
}

impl Subscriber {
	/// True when both describe the same subscription, ignoring progress and run state.
	pub fn same_configuration(&self, other: &Subscriber) -> bool {
		self.id == other.id
			&& self.url == other.url
			&& self.priority == other.priority
			&& self.start_date == other.start_date
			&& self.filter_plugin == other.filter_plugin
			&& self.filter_plugin_params == other.filter_plugin_params
			&& self.concurrent_threads == other.concurrent_threads
	}

	/// Moves the start date, resetting the watermark when the window is widened
	/// backward past it. Returns true when the watermark was reset.
	pub fn set_start_date(&mut self, start_date: Timestamp) -> bool {
		self.start_date = start_date;
		match self.last_file_ingestion_date {
			Some(watermark) if start_date < watermark => {
				self.last_file_ingestion_date = None;
				true
			}
			_ => false,
		}
	}

	/// Lower bound for dispatch scans: files strictly after this point are candidates.
	pub fn scan_floor(&self) -> Option<Timestamp> {
		self.last_file_ingestion_date
	}
}

/// Partial update of a subscriber. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberUpdate {
	#[serde(default)]
	pub priority: Option<i32>,
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub start_date: Option<Timestamp>,
	#[serde(default)]
	pub filter_plugin: Option<String>,
	#[serde(default)]
	pub filter_plugin_params: Option<String>,
	#[serde(default)]
	pub concurrent_threads: Option<u32>,
	#[serde(default)]
	pub suspend: Option<bool>,
	#[serde(default)]
	pub active: Option<bool>,
}

impl SubscriberUpdate {
	pub fn is_empty(&self) -> bool {
		self.priority.is_none()
			&& self.url.is_none()
			&& self.start_date.is_none()
			&& self.filter_plugin.is_none()
			&& self.filter_plugin_params.is_none()
			&& self.concurrent_threads.is_none()
			&& self.suspend.is_none()
			&& self.active.is_none()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn subscriber() -> Subscriber {
		Subscriber {
			id: SubscriberId::new("mirror:80/archive"),
			host_id: "mirror".to_string(),
			port: 80,
			priority: 10,
			url: "http://mirror/archive".to_string(),
			start_date: Timestamp::parse("2020-01-01").unwrap(),
			filter_plugin: String::new(),
			filter_plugin_params: String::new(),
			concurrent_threads: 1,
			active: true,
			suspended: false,
			last_file_ingestion_date: Some(Timestamp::parse("2020-06-01").unwrap()),
		}
	}

	#[test]
	fn test_earlier_start_date_resets_watermark() {
		let mut s = subscriber();
		assert!(s.set_start_date(Timestamp::parse("2019-01-01").unwrap()));
		assert_eq!(s.last_file_ingestion_date, None);
	}

	#[test]
	fn test_later_start_date_keeps_watermark() {
		let mut s = subscriber();
		assert!(!s.set_start_date(Timestamp::parse("2020-06-01").unwrap()));
		assert!(!s.set_start_date(Timestamp::parse("2021-01-01").unwrap()));
		assert_eq!(s.last_file_ingestion_date, Some(Timestamp::parse("2020-06-01").unwrap()));
	}

	#[test]
	fn test_same_configuration_ignores_progress() {
		let a = subscriber();
		let mut b = subscriber();
		b.last_file_ingestion_date = None;
		b.suspended = true;
		assert!(a.same_configuration(&b));
		b.url = "http://other/archive".to_string();
		assert!(!a.same_configuration(&b));
	}

	#[test]
	fn test_update_is_empty() {
		assert!(SubscriberUpdate::default().is_empty());
		let update = SubscriberUpdate {
			suspend: Some(true),
			..Default::default()
		};
		assert!(!update.is_empty());
	}
}
