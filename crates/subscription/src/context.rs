// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::Arc;

use arkiv_store::Backend;

use crate::{
	config::DeliveryConfig, content::ContentSource, filter::FilterRegistry, refcount::ReferenceCoordinator,
	transport::Transport,
};

/// Collaborators shared by the registry, the dispatcher and every worker.
pub(crate) struct DeliveryContext {
	pub store: Arc<dyn Backend>,
	pub coordinator: Arc<ReferenceCoordinator>,
	pub transport: Arc<dyn Transport>,
	pub content: Arc<dyn ContentSource>,
	pub filters: Arc<FilterRegistry>,
	pub config: DeliveryConfig,
}
