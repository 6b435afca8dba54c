// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! HTTP control surface for arkiv.
//!
//! An Axum server exposing subscribe, unsubscribe and update operations plus
//! read-only views of subscribers and their pending obligations. It runs on
//! its own tokio runtime and implements the [`Subsystem`](arkiv_sub_api::Subsystem)
//! lifecycle.
//!
//! # Example
//!
//! ```ignore
//! let engine = Arc::new(DeliveryEngine::builder(store).build()?);
//! let mut http = HttpSubsystem::new(HttpConfig::default(), AppState::new(engine.service().clone()));
//! http.start()?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod subsystem;

pub use config::HttpConfig;
pub use error::{AppError, ErrorResponse};
pub use handlers::{ArchivedRequest, HealthResponse, SubscribeResponse, UnsubscribeRequest, UpdateRequest};
pub use routes::router;
pub use state::AppState;
pub use subsystem::HttpSubsystem;
