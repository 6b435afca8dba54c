// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use arkiv_type::{Error, Result, Subscriber};
use reqwest::{
	StatusCode,
	blocking::Client,
	header::{CONTENT_DISPOSITION, CONTENT_TYPE},
};
use tracing::{debug, instrument};

use super::{Delivery, Transport};

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
	pub timeout: Duration,
	pub user_agent: String,
}

impl Default for HttpTransportConfig {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(60),
			user_agent: format!("arkiv/{}", env!("CARGO_PKG_VERSION")),
		}
	}
}

impl HttpTransportConfig {
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();
		self
	}
}

/// Pushes files as `POST` requests with the raw content as body.
pub struct HttpTransport {
	client: Client,
}

impl HttpTransport {
	pub fn new(config: HttpTransportConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(config.timeout)
			.user_agent(config.user_agent)
			.build()
			.map_err(|e| Error::internal(format!("failed to build http client: {}", e)))?;
		Ok(Self {
			client,
		})
	}
}

impl Transport for HttpTransport {
	#[instrument(name = "transport::http::push", level = "debug", skip_all, fields(
		subscriber = %subscriber.id,
		file = %delivery.file.file
	))]
	fn push(&self, subscriber: &Subscriber, delivery: Delivery<'_>) -> Result<()> {
		let file = delivery.file;
		let mut request = self
			.client
			.post(&subscriber.url)
			.header(CONTENT_TYPE, file.format.as_str())
			.header(CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file.file_name()))
			.header("X-Arkiv-File-Id", file.file.file_id.as_str())
			.header("X-Arkiv-File-Version", file.file.file_version.to_string())
			.header("X-Arkiv-Disk-Id", file.file.disk_id.as_str())
			.header("X-Arkiv-Ingestion-Date", file.ingestion_date.to_string());
		if let Some(checksum) = &file.checksum {
			request = request.header("X-Arkiv-Checksum", checksum.as_str());
		}

		// connect, timeout and body errors carry no status
		let response = request
			.body(delivery.body)
			.send()
			.map_err(|e| Error::DeliveryTransient(format!("{}: {}", subscriber.url, e)))?;

		let status = response.status();
		debug!(status = status.as_u16(), "endpoint answered");
		classify(status).map_err(|kind| {
			let reason = format!("{} answered {}", subscriber.url, status);
			match kind {
				Failure::Transient => Error::DeliveryTransient(reason),
				Failure::Permanent => Error::DeliveryPermanent(reason),
			}
		})
	}
}

#[derive(Debug, PartialEq, Eq)]
enum Failure {
	Transient,
	Permanent,
}

fn classify(status: StatusCode) -> std::result::Result<(), Failure> {
	if status.is_success() {
		return Ok(());
	}
	if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS {
		return Err(Failure::Transient);
	}
	Err(Failure::Permanent)
}
