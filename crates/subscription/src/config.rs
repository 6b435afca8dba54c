// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

/// Retry schedule applied by a worker to a single obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Delivery attempts per obligation before the worker gives up on it
	/// until the next dispatch sweep or restart.
	pub max_attempts: u32,
	pub initial_backoff: Duration,
	pub max_backoff: Duration,
	pub multiplier: u32,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			initial_backoff: Duration::from_secs(1),
			max_backoff: Duration::from_secs(30),
			multiplier: 2,
		}
	}
}

impl RetryPolicy {
	/// Backoff to wait after the given failed attempt (1-based).
	pub fn backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1);
		let factor = self.multiplier.max(1).saturating_pow(exponent);
		self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
	}

	pub fn max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);
		self
	}

	pub fn initial_backoff(mut self, backoff: Duration) -> Self {
		self.initial_backoff = backoff;
		self
	}

	pub fn max_backoff(mut self, backoff: Duration) -> Self {
		self.max_backoff = backoff;
		self
	}
}

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
	/// Period of the dispatch sweep when nothing wakes the dispatcher earlier.
	pub sweep_interval: Duration,
	/// How long an idle worker blocks on its queue before rechecking its sentinel.
	pub queue_poll_timeout: Duration,
	/// How long a suspended worker blocks on the gate before rechecking its sentinel.
	pub suspend_poll_timeout: Duration,
	pub retry: RetryPolicy,
	/// Catalog page size used while scanning for new files.
	pub dispatch_batch_size: usize,
	pub max_concurrent_threads: u32,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			sweep_interval: Duration::from_secs(30),
			queue_poll_timeout: Duration::from_millis(500),
			suspend_poll_timeout: Duration::from_millis(500),
			retry: RetryPolicy::default(),
			dispatch_batch_size: 1000,
			max_concurrent_threads: 64,
		}
	}
}

impl DeliveryConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn sweep_interval(mut self, interval: Duration) -> Self {
		self.sweep_interval = interval;
		self
	}

	pub fn queue_poll_timeout(mut self, timeout: Duration) -> Self {
		self.queue_poll_timeout = timeout;
		self
	}

	pub fn suspend_poll_timeout(mut self, timeout: Duration) -> Self {
		self.suspend_poll_timeout = timeout;
		self
	}

	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn dispatch_batch_size(mut self, size: usize) -> Self {
		self.dispatch_batch_size = size.max(1);
		self
	}

	pub fn max_concurrent_threads(mut self, max: u32) -> Self {
		self.max_concurrent_threads = max.max(1);
		self
	}
}
