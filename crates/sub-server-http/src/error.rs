// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! HTTP error handling and response formatting.

use std::fmt::{self, Display, Formatter};

use arkiv_type::Error;
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Human-readable error message.
	pub error: String,
	/// Machine-readable error code.
	pub code: String,
}

impl ErrorResponse {
	pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			error: error.into(),
		}
	}
}

/// Application error type that converts to HTTP responses.
#[derive(Debug)]
pub enum AppError {
	/// Error raised by the subscription engine.
	Subscription(Error),
	/// Request parsing error.
	BadRequest(String),
	/// Internal server error.
	Internal(String),
}

impl From<Error> for AppError {
	fn from(e: Error) -> Self {
		AppError::Subscription(e)
	}
}

impl Display for AppError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			AppError::Subscription(e) => write!(f, "{}", e),
			AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
			AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
		}
	}
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let (status, code, message) = match &self {
			AppError::Subscription(e) => {
				let status = match e {
					Error::Validation(_) => StatusCode::BAD_REQUEST,
					Error::Conflict {
						..
					}
					| Error::DuplicateObligation {
						..
					} => StatusCode::CONFLICT,
					Error::NotFound(_) => StatusCode::NOT_FOUND,
					Error::DeliveryTransient(_) | Error::DeliveryPermanent(_) => StatusCode::BAD_GATEWAY,
					Error::Persistence(_) | Error::Internal(_) => {
						tracing::error!("request failed: {}", e);
						StatusCode::INTERNAL_SERVER_ERROR
					}
				};
				(status, e.code(), e.to_string())
			}
			AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
			AppError::Internal(msg) => {
				tracing::error!("Internal error: {}", msg);
				(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal server error".to_string())
			}
		};

		let body = Json(ErrorResponse::new(code, message));
		(status, body).into_response()
	}
}
