// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Path, Query, State},
	http::{header, StatusCode},
	response::IntoResponse,
};
use warden_migrate_core::ErrorLedger;

use super::{parse_session_id, parse_tenant_id};
use crate::error::{MigrateApiError, SessionError};
use crate::state::MigrateState;
use crate::view::ExportQuery;

/// Skipped and failed records as a CSV attachment.
pub async fn export_errors(
	State(state): State<MigrateState>,
	Path(tenant_id): Path<String>,
	Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&query.session_id)?;

	let ledger = match state.registry.get(&tenant_id, &session_id).await {
		Ok(entry) => entry
			.snapshot()
			.result()
			.map(|result| ErrorLedger::from_outcomes(result.outcomes.iter().cloned()))
			.ok_or_else(|| {
				MigrateApiError::Conflict("import has not produced a result yet".to_string())
			})?,
		Err(SessionError::NotFound(_)) => state
			.archive
			.get_archived_session(&tenant_id, &session_id)
			.await?
			.map(|archived| ErrorLedger::from_outcomes(archived.result.outcomes))
			.ok_or_else(|| MigrateApiError::NotFound(format!("import session {session_id} not found")))?,
		Err(e) => return Err(e.into()),
	};

	let csv = ledger.export()?;
	tracing::debug!(session_id = %session_id, rows = ledger.len(), "error report exported");

	Ok((
		StatusCode::OK,
		[
			(header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
			(
				header::CONTENT_DISPOSITION,
				format!("attachment; filename=\"import-{session_id}-errors.csv\""),
			),
		],
		csv,
	))
}
