// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Subscription and delivery engine.
//!
//! Subscribers register an endpoint and receive every archived file that
//! matches their filter, at least once, in ingestion order per worker.
//! Obligations are durable, so nothing is lost across restarts, and every
//! file keeps a reference count so it is not evicted while a delivery is
//! still owed.

pub mod config;
pub mod content;
mod context;
pub mod dispatch;
pub mod engine;
pub mod filter;
pub mod pool;
pub mod queue;
pub mod refcount;
pub mod registry;
pub mod sentinel;
pub mod service;
pub mod subsystem;
pub mod transport;
pub mod watermark;
mod worker;

pub use config::{DeliveryConfig, RetryPolicy};
pub use content::{ContentSource, FsContent};
pub use dispatch::{DispatchHandle, DispatchReport};
pub use engine::{DeliveryEngine, DeliveryEngineBuilder};
pub use filter::{FilterPlugin, FilterRegistry};
pub use refcount::{ChannelEvictionListener, EvictionEligible, EvictionListener, ReferenceCoordinator};
pub use registry::{Registration, Registry};
pub use service::{SubscribeRequest, SubscriberStatus, SubscriberTarget, SubscriptionService};
pub use subsystem::DeliverySubsystem;
pub use transport::{Delivery, HttpTransport, HttpTransportConfig, Transport};
