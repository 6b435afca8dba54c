// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Error taxonomy for subscription control and delivery.

use crate::{FileRef, SubscriberId};

/// Result type for subscription and delivery operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// Rejected before any state was touched.
	#[error("invalid request: {0}")]
	Validation(String),

	#[error("subscriber {subscriber} already exists with a different configuration")]
	Conflict {
		subscriber: SubscriberId,
	},

	#[error("{0} not found")]
	NotFound(String),

	/// The durable queue already holds this obligation. Dispatch treats this as success.
	#[error("obligation for {file} to subscriber {subscriber} already exists")]
	DuplicateObligation {
		subscriber: SubscriberId,
		file: FileRef,
	},

	#[error("transient delivery failure: {0}")]
	DeliveryTransient(String),

	#[error("delivery rejected by endpoint: {0}")]
	DeliveryPermanent(String),

	#[error("persistence failure: {0}")]
	Persistence(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	pub fn validation(msg: impl Into<String>) -> Self {
		Error::Validation(msg.into())
	}

	pub fn not_found(what: impl Into<String>) -> Self {
		Error::NotFound(what.into())
	}

	pub fn persistence(msg: impl Into<String>) -> Self {
		Error::Persistence(msg.into())
	}

	pub fn internal(msg: impl Into<String>) -> Self {
		Error::Internal(msg.into())
	}

	/// Stable machine-readable code, surfaced by the control surface.
	pub fn code(&self) -> &'static str {
		match self {
			Error::Validation(_) => "SUB_001",
			Error::Conflict {
				..
			} => "SUB_002",
			Error::NotFound(_) => "SUB_003",
			Error::DuplicateObligation {
				..
			} => "SUB_004",
			Error::DeliveryTransient(_) => "SUB_005",
			Error::DeliveryPermanent(_) => "SUB_006",
			Error::Persistence(_) => "SUB_007",
			Error::Internal(_) => "SUB_008",
		}
	}

	pub fn is_duplicate(&self) -> bool {
		matches!(self, Error::DuplicateObligation { .. })
	}

	pub fn is_delivery(&self) -> bool {
		matches!(self, Error::DeliveryTransient(_) | Error::DeliveryPermanent(_))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_codes_are_distinct() {
		let errors = [
			Error::validation("x"),
			Error::Conflict {
				subscriber: SubscriberId::new("a"),
			},
			Error::not_found("x"),
			Error::DuplicateObligation {
				subscriber: SubscriberId::new("a"),
				file: FileRef::new("f", 1, "d"),
			},
			Error::DeliveryTransient("x".into()),
			Error::DeliveryPermanent("x".into()),
			Error::persistence("x"),
			Error::internal("x"),
		];
		let mut codes: Vec<_> = errors.iter().map(Error::code).collect();
		codes.sort();
		codes.dedup();
		assert_eq!(codes.len(), errors.len());
	}

	#[test]
	fn test_display() {
		let err = Error::Conflict {
			subscriber: SubscriberId::new("mirror:8080/archive"),
		};
		assert_eq!(
			err.to_string(),
			"subscriber mirror:8080/archive already exists with a different configuration"
		);
		assert!(Error::DuplicateObligation {
			subscriber: SubscriberId::new("a"),
			file: FileRef::new("f", 1, "d"),
		}
		.is_duplicate());
	}
}
