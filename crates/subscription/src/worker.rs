// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Delivery worker loop.
//!
//! A worker repeatedly:
//! 1. waits while its subscriber is suspended,
//! 2. exits once its identifier has been withdrawn,
//! 3. takes the oldest queued file and pushes it, retrying with backoff,
//! 4. on success removes the obligation and moves the watermark.
//!
//! Failures never remove the obligation. After the retry budget is spent the
//! file is released and picked up again by a later dispatch sweep or restart.

use std::sync::Arc;

use arkiv_type::{Error, FileMeta, Result, Subscriber};
use tracing::{debug, trace, warn};

use crate::{
	pool::SubscriberPool,
	sentinel::CancellationToken,
	transport::Delivery,
};

pub(crate) fn run(pool: Arc<SubscriberPool>, token: CancellationToken) {
	debug!(subscriber = %pool.id(), worker = %token.id(), "delivery worker started");
	let config = &pool.ctx.config;

	loop {
		if token.is_cancelled() {
			break;
		}
		if !pool.gate.wait(config.suspend_poll_timeout) {
			continue;
		}
		if token.is_cancelled() {
			break;
		}
		let Some(meta) = pool.queue.take(config.queue_poll_timeout) else {
			continue;
		};
		deliver(&pool, &token, meta);
	}

	debug!(subscriber = %pool.id(), worker = %token.id(), "delivery worker stopped");
}

fn deliver(pool: &SubscriberPool, token: &CancellationToken, meta: FileMeta) {
	let retry = &pool.ctx.config.retry;
	let mut attempt = 0;

	loop {
		attempt += 1;
		let subscriber = pool.subscriber();
		trace!(subscriber = %subscriber.id, file = %meta.file, attempt, "pushing file");

		let err = match push(pool, &subscriber, &meta) {
			Ok(()) => {
				debug!(subscriber = %subscriber.id, file = %meta.file, attempt, "delivered");
				pool.complete_delivery(&meta);
				return;
			}
			Err(err) => err,
		};

		pool.record_failure(&meta, &err);
		let permanent = matches!(err, Error::DeliveryPermanent(_));
		if permanent || attempt >= retry.max_attempts || pool.is_retired() {
			warn!(
				subscriber = %subscriber.id,
				file = %meta.file,
				attempt,
				err = %err,
				"delivery failed, obligation left pending"
			);
			pool.queue.release(&meta.file);
			return;
		}

		debug!(subscriber = %subscriber.id, file = %meta.file, attempt, err = %err, "delivery failed, retrying");
		if !token.sleep(retry.backoff(attempt)) {
			pool.queue.requeue(meta);
			return;
		}
	}
}

fn push(pool: &SubscriberPool, subscriber: &Subscriber, meta: &FileMeta) -> Result<()> {
	let ctx = &pool.ctx;
	let filter = ctx.filters.get(&subscriber.filter_plugin)?;
	let body = ctx.content.read(meta)?;
	let body = filter.prepare(meta, body, &subscriber.filter_plugin_params)?;
	ctx.transport.push(
		subscriber,
		Delivery {
			file: meta,
			body,
		},
	)
}
