// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use axum::{
	Router,
	routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Builds the control surface router.
///
/// Subscriber identifiers usually contain `/`, so clients percent-encode them
/// in path segments.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(handlers::health))
		.route("/v1/subscribe", post(handlers::subscribe))
		.route("/v1/unsubscribe", post(handlers::unsubscribe))
		.route("/v1/update", post(handlers::update))
		.route("/v1/subscribers", get(handlers::list))
		.route("/v1/subscribers/{id}", get(handlers::status))
		.route("/v1/subscribers/{id}/pending", get(handlers::pending))
		.route("/v1/archived", post(handlers::archived))
		.with_state(state)
}
