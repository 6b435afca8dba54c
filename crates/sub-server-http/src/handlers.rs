// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! HTTP endpoint handlers for the subscription control surface.
//!
//! - `GET /health` - Health check endpoint
//! - `POST /v1/subscribe` - Register a subscriber
//! - `POST /v1/unsubscribe` - Remove a subscriber by id or url
//! - `POST /v1/update` - Change a subscriber in place
//! - `GET /v1/subscribers` - List subscribers
//! - `GET /v1/subscribers/{id}` - Status of one subscriber
//! - `GET /v1/subscribers/{id}/pending` - Outstanding obligations
//! - `POST /v1/archived` - Announce a newly archived file
//!
//! Engine calls block on storage, so every handler runs them on the blocking pool.

use arkiv_store::Obligation;
use arkiv_subscription::{Registration, SubscribeRequest, SubscriberStatus, SubscriberTarget};
use arkiv_type::{FileMeta, Subscriber, SubscriberId, SubscriberUpdate};
use axum::{
	Json,
	extract::{Path, Query, State},
	http::StatusCode,
	response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub subscribers: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
	/// `created` or `already_exists`.
	pub status: String,
	pub subscriber: Subscriber,
}

/// Names the subscriber to remove. Exactly one field must be set.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
	#[serde(default)]
	pub subscriber_id: Option<String>,
	#[serde(default)]
	pub url: Option<String>,
}

impl UnsubscribeRequest {
	fn target(self) -> Result<SubscriberTarget, AppError> {
		match (self.subscriber_id, self.url) {
			(Some(id), None) => Ok(SubscriberTarget::Id(SubscriberId::new(id))),
			(None, Some(url)) => Ok(SubscriberTarget::Url(url)),
			_ => Err(AppError::BadRequest("exactly one of subscriber_id or url is required".to_string())),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateRequest {
	pub subscriber_id: String,
	#[serde(flatten)]
	pub update: SubscriberUpdate,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
	#[serde(default)]
	pub active_only: bool,
}

/// Body of `/v1/archived`. Without a file the dispatcher is only woken.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ArchivedRequest {
	#[serde(default)]
	pub file: Option<FileMeta>,
}

async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
	F: FnOnce() -> arkiv_type::Result<T> + Send + 'static,
	T: Send + 'static,
{
	match tokio::task::spawn_blocking(f).await {
		Ok(result) => result.map_err(AppError::from),
		Err(e) => Err(AppError::Internal(format!("blocking task failed: {}", e))),
	}
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
	let service = state.service().clone();
	let subscribers = blocking(move || Ok(service.list(false).len())).await.unwrap_or_default();
	(
		StatusCode::OK,
		Json(HealthResponse {
			status: "ok".to_string(),
			subscribers,
		}),
	)
}

/// Registers a subscriber. Answers `201` for a new subscriber and `200` when
/// an identical one already exists.
///
/// ```json
/// {"url": "http://mirror:8080/ingest", "priority": 5, "start_date": "2020-01-01"}
/// ```
pub async fn subscribe(
	State(state): State<AppState>,
	Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), AppError> {
	let service = state.service().clone();
	let registration = blocking(move || service.subscribe(request)).await?;
	let (status, label) = match &registration {
		Registration::Created(_) => (StatusCode::CREATED, "created"),
		Registration::AlreadyExists(_) => (StatusCode::OK, "already_exists"),
	};
	Ok((
		status,
		Json(SubscribeResponse {
			status: label.to_string(),
			subscriber: registration.subscriber().clone(),
		}),
	))
}

pub async fn unsubscribe(
	State(state): State<AppState>,
	Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<Subscriber>, AppError> {
	let target = request.target()?;
	let service = state.service().clone();
	Ok(Json(blocking(move || service.unsubscribe(target)).await?))
}

pub async fn update(
	State(state): State<AppState>,
	Json(request): Json<UpdateRequest>,
) -> Result<Json<Subscriber>, AppError> {
	let service = state.service().clone();
	let id = SubscriberId::new(request.subscriber_id);
	Ok(Json(blocking(move || service.update(&id, request.update)).await?))
}

pub async fn list(State(state): State<AppState>, Query(params): Query<ListParams>) -> Json<Vec<Subscriber>> {
	let service = state.service().clone();
	Json(blocking(move || Ok(service.list(params.active_only))).await.unwrap_or_default())
}

pub async fn status(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<SubscriberStatus>, AppError> {
	let service = state.service().clone();
	let id = SubscriberId::new(id);
	Ok(Json(blocking(move || service.status(&id)).await?))
}

pub async fn pending(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Vec<Obligation>>, AppError> {
	let service = state.service().clone();
	let id = SubscriberId::new(id);
	Ok(Json(blocking(move || service.pending(&id)).await?))
}

pub async fn archived(
	State(state): State<AppState>,
	Json(request): Json<ArchivedRequest>,
) -> Result<StatusCode, AppError> {
	let service = state.service().clone();
	blocking(move || service.notify_archived(request.file.as_ref())).await?;
	Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unsubscribe_request_needs_exactly_one_target() {
		let by_id: UnsubscribeRequest = serde_json::from_str(r#"{"subscriber_id": "s1"}"#).unwrap();
		assert_eq!(by_id.target().unwrap(), SubscriberTarget::Id(SubscriberId::new("s1")));

		let by_url: UnsubscribeRequest = serde_json::from_str(r#"{"url": "http://mirror/x"}"#).unwrap();
		assert_eq!(by_url.target().unwrap(), SubscriberTarget::Url("http://mirror/x".to_string()));

		assert!(UnsubscribeRequest::default().target().is_err());
		let both = UnsubscribeRequest {
			subscriber_id: Some("s1".to_string()),
			url: Some("http://mirror/x".to_string()),
		};
		assert!(both.target().is_err());
	}

	#[test]
	fn test_update_request_flattens_fields() {
		let request: UpdateRequest =
			serde_json::from_str(r#"{"subscriber_id": "s1", "priority": 3, "suspend": true}"#).unwrap();
		assert_eq!(request.subscriber_id, "s1");
		assert_eq!(request.update.priority, Some(3));
		assert_eq!(request.update.suspend, Some(true));
		assert_eq!(request.update.url, None);
	}

	#[test]
	fn test_archived_request_file_is_optional() {
		let request: ArchivedRequest = serde_json::from_str("{}").unwrap();
		assert!(request.file.is_none());
	}
}
