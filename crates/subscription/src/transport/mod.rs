// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod http;

use arkiv_type::{FileMeta, Result, Subscriber};
pub use http::{HttpTransport, HttpTransportConfig};

/// One file about to be pushed to a subscriber endpoint.
#[derive(Debug)]
pub struct Delivery<'a> {
	pub file: &'a FileMeta,
	pub body: Vec<u8>,
}

/// Pushes file content to subscriber endpoints.
///
/// Failures must be reported as [`arkiv_type::Error::DeliveryTransient`] when
/// a later attempt may succeed and [`arkiv_type::Error::DeliveryPermanent`]
/// when the endpoint rejected the content itself.
pub trait Transport: Send + Sync {
	fn push(&self, subscriber: &Subscriber, delivery: Delivery<'_>) -> Result<()>;
}
