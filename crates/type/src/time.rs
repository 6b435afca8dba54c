// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Error, Result};

/// UTC point in time with millisecond precision.
///
/// Ingestion dates, start dates and watermarks all use this type. Precision is
/// fixed at milliseconds so values survive a round trip through storage unchanged.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
	pub fn now() -> Self {
		Self::from_millis(Utc::now().timestamp_millis())
	}

	pub fn from_millis(millis: i64) -> Self {
		Self(Utc.timestamp_millis_opt(millis).single().unwrap_or(DateTime::<Utc>::MIN_UTC))
	}

	pub fn as_millis(&self) -> i64 {
		self.0.timestamp_millis()
	}

	pub fn as_datetime(&self) -> DateTime<Utc> {
		self.0
	}

	/// Parses RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC) or a bare date.
	pub fn parse(value: &str) -> Result<Self> {
		let value = value.trim();
		if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
			return Ok(Self::from_millis(dt.timestamp_millis()));
		}
		for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
			if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
				return Ok(Self::from_millis(naive.and_utc().timestamp_millis()));
			}
		}
		if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
			if let Some(naive) = date.and_hms_opt(0, 0, 0) {
				return Ok(Self::from_millis(naive.and_utc().timestamp_millis()));
			}
		}
		Err(Error::validation(format!("unrecognised timestamp '{}'", value)))
	}
}

impl Display for Timestamp {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.3f"))
	}
}

impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.0.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Timestamp, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		Timestamp::parse(&raw).map_err(de::Error::custom)
	}
}

impl From<DateTime<Utc>> for Timestamp {
	fn from(value: DateTime<Utc>) -> Self {
		Self::from_millis(value.timestamp_millis())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_formats_agree() {
		let a = Timestamp::parse("2020-01-02").unwrap();
		let b = Timestamp::parse("2020-01-02T00:00:00").unwrap();
		let c = Timestamp::parse("2020-01-02T00:00:00Z").unwrap();
		assert_eq!(a, b);
		assert_eq!(b, c);
	}

	#[test]
	fn test_millis_round_trip_and_order() {
		let t1 = Timestamp::parse("2020-01-02T00:00:00.250").unwrap();
		let t2 = Timestamp::parse("2020-01-03").unwrap();
		assert_eq!(Timestamp::from_millis(t1.as_millis()), t1);
		assert!(t1 < t2);
		assert_eq!(t1.to_string(), "2020-01-02T00:00:00.250");
	}

	#[test]
	fn test_serde_accepts_bare_date() {
		let t: Timestamp = serde_json::from_str("\"2020-01-03\"").unwrap();
		assert_eq!(t, Timestamp::parse("2020-01-03T00:00:00").unwrap());
		assert_eq!(serde_json::to_string(&t).unwrap(), "\"2020-01-03T00:00:00.000Z\"");
	}

	#[test]
	fn test_parse_rejects_garbage() {
		assert!(matches!(Timestamp::parse("yesterday"), Err(Error::Validation(_))));
	}
}
