// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use arkiv_subscription::SubscriptionService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
	service: SubscriptionService,
}

impl AppState {
	pub fn new(service: SubscriptionService) -> Self {
		Self {
			service,
		}
	}

	pub fn service(&self) -> &SubscriptionService {
		&self.service
	}
}
