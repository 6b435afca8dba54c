// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::BTreeSet;

use arkiv_type::Timestamp;

/// Decides how far a subscriber's watermark may move.
///
/// The watermark may only reach `T` when every matching file ingested at or
/// before `T` has been delivered. Two facts bound it: the oldest obligation
/// still pending, and the horizon up to which dispatch has looked at the
/// catalog. Deliveries that completed out of order wait here until both
/// bounds have passed them.
#[derive(Debug, Default)]
pub struct WatermarkTracker {
	delivered: BTreeSet<Timestamp>,
	horizon: Option<Timestamp>,
}

impl WatermarkTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record_delivered(&mut self, ingestion_date: Timestamp) {
		self.delivered.insert(ingestion_date);
	}

	/// Every catalog file ingested at or before `horizon` has been considered by dispatch.
	pub fn set_horizon(&mut self, horizon: Timestamp) {
		if self.horizon.map(|h| horizon > h).unwrap_or(true) {
			self.horizon = Some(horizon);
		}
	}

	pub fn horizon(&self) -> Option<Timestamp> {
		self.horizon
	}

	/// Forgets all progress, used when the watermark itself was reset.
	pub fn reset(&mut self) {
		self.delivered.clear();
		self.horizon = None;
	}

	/// Returns the new watermark if it moves strictly past `current`.
	pub fn advance(&mut self, current: Option<Timestamp>, oldest_pending: Option<Timestamp>) -> Option<Timestamp> {
		let horizon = self.horizon?;
		let candidate = self
			.delivered
			.iter()
			.rev()
			.find(|&&t| t <= horizon && oldest_pending.map(|p| t < p).unwrap_or(true))
			.copied()?;

		self.delivered = self.delivered.split_off(&candidate);
		self.delivered.remove(&candidate);

		match current {
			Some(current) if candidate <= current => None,
			_ => Some(candidate),
		}
	}

	pub fn waiting(&self) -> usize {
		self.delivered.len()
	}
}
