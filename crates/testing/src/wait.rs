// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Polling helpers for asserting on work done by background threads without
//! fixed sleeps.

use std::{
	thread::sleep,
	time::{Duration, Instant},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Polls `condition` until it holds.
///
/// # Panics
/// Panics with `message` if the condition does not hold within `timeout`.
pub fn wait_for_condition<F>(condition: F, timeout: Duration, poll_interval: Duration, message: &str)
where
	F: Fn() -> bool,
{
	let start = Instant::now();
	while !condition() {
		if start.elapsed() > timeout {
			panic!("Timeout after {:?}: {}", timeout, message);
		}
		sleep(poll_interval);
	}
}

pub fn wait_for<F>(condition: F, message: &str)
where
	F: Fn() -> bool,
{
	wait_for_condition(condition, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, message);
}

/// Asserts that `condition` keeps holding for the whole of `period`.
pub fn hold_for<F>(condition: F, period: Duration, message: &str)
where
	F: Fn() -> bool,
{
	let start = Instant::now();
	while start.elapsed() < period {
		assert!(condition(), "{}", message);
		sleep(DEFAULT_POLL_INTERVAL);
	}
}
