// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stateless credential checks used before a session exists.

use axum::{
	extract::{Path, Query, State},
	http::HeaderMap,
	Json,
};
use serde_json::{json, Value};
use warden_migrate_core::SourceCredential;

use super::parse_tenant_id;
use crate::error::MigrateApiError;
use crate::state::MigrateState;
use crate::view::{ConnectionRequest, PreviewQuery, PreviewView};

/// Header carrying the source credential on GET requests.
pub const CREDENTIAL_HEADER: &str = "x-source-credential";

pub async fn validate_connection(
	State(state): State<MigrateState>,
	Path(tenant_id): Path<String>,
	Json(body): Json<ConnectionRequest>,
) -> Result<Json<Value>, MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	state
		.orchestrator
		.validate_connection(&body.url, &body.credential)
		.await?;

	tracing::info!(tenant_id = %tenant_id, source_url = %body.url, "source connection validated");
	Ok(Json(json!({ "ok": true })))
}

pub async fn preview(
	State(state): State<MigrateState>,
	Path(tenant_id): Path<String>,
	Query(query): Query<PreviewQuery>,
	headers: HeaderMap,
) -> Result<Json<PreviewView>, MigrateApiError> {
	parse_tenant_id(&tenant_id)?;
	let credential = headers
		.get(CREDENTIAL_HEADER)
		.and_then(|value| value.to_str().ok())
		.map(SourceCredential::new)
		.ok_or(MigrateApiError::InvalidCredential)?;

	let sample_size = query
		.sample_size
		.unwrap_or(state.defaults.preview_sample_size);
	let preview = state
		.orchestrator
		.preview(&query.url, &credential, sample_size)
		.await?;
	Ok(Json(PreviewView::from(preview)))
}
