// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{path::PathBuf, time::Duration};

use arkiv_sub_server_http::HttpConfig;
use arkiv_subscription::DeliveryConfig;
use arkiv_type::{Error, Result};
use tracing::Level;

/// Server settings read from `ARKIV_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub db_path: PathBuf,
	pub http: HttpConfig,
	pub delivery: DeliveryConfig,
	pub log_level: Level,
	pub log_json: bool,
}

impl ServerConfig {
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
		let db_path = lookup("ARKIV_DB_PATH").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("arkiv.db"));

		let mut http = HttpConfig::default();
		if let Some(bind) = lookup("ARKIV_BIND") {
			http = http.bind_addr(bind);
		}

		let mut delivery = DeliveryConfig::default();
		if let Some(secs) = lookup("ARKIV_SWEEP_SECS") {
			let secs: u64 = secs
				.parse()
				.map_err(|_| Error::validation(format!("ARKIV_SWEEP_SECS must be a number of seconds, got '{}'", secs)))?;
			delivery = delivery.sweep_interval(Duration::from_secs(secs.max(1)));
		}
		if let Some(max) = lookup("ARKIV_MAX_THREADS") {
			let max: u32 = max
				.parse()
				.map_err(|_| Error::validation(format!("ARKIV_MAX_THREADS must be a positive integer, got '{}'", max)))?;
			delivery = delivery.max_concurrent_threads(max.max(1));
		}

		let log_level = match lookup("ARKIV_LOG") {
			Some(level) => level
				.parse()
				.map_err(|_| Error::validation(format!("ARKIV_LOG is not a log level: '{}'", level)))?,
			None => Level::INFO,
		};
		let log_json = lookup("ARKIV_LOG_JSON").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

		Ok(Self {
			db_path,
			http,
			delivery,
			log_level,
			log_json,
		})
	}
}
