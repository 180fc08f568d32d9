// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wizard endpoints over a live import session.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use warden_migrate_core::{FailedPhase, ImportOptions, PreviewRow, SessionPhase};
use warden_server_db::ArchivedSessionSummary;

use super::{parse_session_id, parse_tenant_id};
use crate::driver::{spawn_driver, DriverJob};
use crate::error::{MigrateApiError, SessionError};
use crate::state::MigrateState;
use crate::view::{
	ConnectionRequest, CredentialsRequest, HistoryQuery, OptionsBody, RunImportRequest,
	SessionAccepted, SessionView, StartImportRequest,
};

fn checked_options(state: &MigrateState, body: OptionsBody) -> Result<ImportOptions, MigrateApiError> {
	let options = body.into_options(state.defaults.batch_size);
	options
		.validate(state.orchestrator.settings().max_batch_size)
		.map_err(|e| MigrateApiError::BadRequest(e.to_string()))?;
	Ok(options)
}

/// Create a session and check its credential in the background. A rejected
/// credential is a session state, not an HTTP error.
pub async fn create_session(
	State(state): State<MigrateState>,
	Path(tenant_id): Path<String>,
	Json(body): Json<ConnectionRequest>,
) -> Result<(StatusCode, Json<SessionAccepted>), MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let entry = state.registry.create(tenant_id).await;
	let session = entry.claim()?;

	let session_id = entry.id;
	spawn_driver(
		state.clone(),
		entry.clone(),
		session,
		DriverJob::Validate {
			url: body.url,
			credential: body.credential,
		},
	);
	Ok((
		StatusCode::CREATED,
		Json(SessionAccepted {
			session_id,
			phase: SessionPhase::CredentialsValidating,
		}),
	))
}

pub async fn submit_credentials(
	State(state): State<MigrateState>,
	Path((tenant_id, session_id)): Path<(String, String)>,
	Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionAccepted>), MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&session_id)?;
	let entry = state.registry.get(&tenant_id, &session_id).await?;
	let session = entry.claim()?;

	let url = body
		.url
		.or_else(|| session.source_url().map(str::to_string))
		.ok_or_else(|| MigrateApiError::BadRequest("url is required".to_string()))?;
	if !session.can_submit_credentials() {
		return Err(MigrateApiError::Conflict(format!(
			"cannot submit credentials while the session is {}",
			session.phase_kind()
		)));
	}

	spawn_driver(
		state.clone(),
		entry.clone(),
		session,
		DriverJob::Validate {
			url,
			credential: body.credential,
		},
	);
	Ok((
		StatusCode::ACCEPTED,
		Json(SessionAccepted {
			session_id,
			phase: SessionPhase::CredentialsValidating,
		}),
	))
}

/// Confirm the preview and import in the background.
pub async fn start_import(
	State(state): State<MigrateState>,
	Path((tenant_id, session_id)): Path<(String, String)>,
	Json(body): Json<StartImportRequest>,
) -> Result<(StatusCode, Json<SessionAccepted>), MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&session_id)?;
	let options = checked_options(&state, body.options)?;
	let entry = state.registry.get(&tenant_id, &session_id).await?;
	let session = entry.claim()?;

	let phase = session.phase_kind();
	if phase != SessionPhase::PreviewReady {
		return Err(MigrateApiError::Conflict(format!(
			"cannot start an import while the session is {phase}"
		)));
	}

	tracing::info!(session_id = %session_id, batch_size = options.batch_size, "import confirmed");
	spawn_driver(state.clone(), entry.clone(), session, DriverJob::Run(options));
	Ok((
		StatusCode::ACCEPTED,
		Json(SessionAccepted {
			session_id,
			phase: SessionPhase::Importing,
		}),
	))
}

/// Headless path: validation, preview and import in one background task.
pub async fn run_import(
	State(state): State<MigrateState>,
	Path(tenant_id): Path<String>,
	Json(body): Json<RunImportRequest>,
) -> Result<(StatusCode, Json<SessionAccepted>), MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let options = checked_options(&state, body.options)?;
	let entry = state.registry.create(tenant_id).await;
	let session = entry.claim()?;

	let session_id = entry.id;
	spawn_driver(
		state.clone(),
		entry.clone(),
		session,
		DriverJob::Connect {
			url: body.url,
			credential: body.credential,
			options,
		},
	);
	Ok((
		StatusCode::ACCEPTED,
		Json(SessionAccepted {
			session_id,
			phase: SessionPhase::CredentialsValidating,
		}),
	))
}

/// Live sessions come from the registry; settled ones fall back to the archive.
pub async fn get_session(
	State(state): State<MigrateState>,
	Path((tenant_id, session_id)): Path<(String, String)>,
) -> Result<Json<SessionView>, MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&session_id)?;

	match state.registry.get(&tenant_id, &session_id).await {
		Ok(entry) => Ok(Json(SessionView::from(&entry.snapshot()))),
		Err(SessionError::NotFound(_)) => state
			.archive
			.get_archived_session(&tenant_id, &session_id)
			.await?
			.map(|archived| Json(SessionView::from(archived)))
			.ok_or_else(|| MigrateApiError::NotFound(format!("import session {session_id} not found"))),
		Err(e) => Err(e.into()),
	}
}

/// Archived sessions for the tenant, newest first.
pub async fn list_sessions(
	State(state): State<MigrateState>,
	Path(tenant_id): Path<String>,
	Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ArchivedSessionSummary>>, MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let sessions = state
		.archive
		.list_archived_sessions(&tenant_id, query.limit())
		.await?;
	Ok(Json(sessions))
}

pub async fn get_source_user(
	State(state): State<MigrateState>,
	Path((tenant_id, session_id, source_id)): Path<(String, String, String)>,
) -> Result<Json<PreviewRow>, MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&session_id)?;
	let snapshot = state.registry.get(&tenant_id, &session_id).await?.snapshot();

	let (url, credential) = match (snapshot.source_url(), snapshot.credential()) {
		(Some(url), Some(credential)) => (url, credential),
		_ => {
			return Err(MigrateApiError::Conflict(
				"session holds no source credential".to_string(),
			))
		}
	};

	state
		.orchestrator
		.source_user(url, credential, &source_id)
		.await?
		.map(|record| Json(record.preview()))
		.ok_or_else(|| MigrateApiError::NotFound(format!("source user {source_id} not found")))
}

/// Request a stop; the driver honours it before its next batch.
pub async fn abort_import(
	State(state): State<MigrateState>,
	Path((tenant_id, session_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SessionAccepted>), MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&session_id)?;
	let entry = state.registry.get(&tenant_id, &session_id).await?;

	let phase = entry.snapshot().phase_kind();
	if phase != SessionPhase::Importing {
		return Err(MigrateApiError::Conflict(format!(
			"cannot abort while the session is {phase}"
		)));
	}

	entry.abort_signal().abort();
	tracing::info!(session_id = %session_id, "import abort requested");
	Ok((
		StatusCode::ACCEPTED,
		Json(SessionAccepted {
			session_id,
			phase,
		}),
	))
}

pub async fn resume_import(
	State(state): State<MigrateState>,
	Path((tenant_id, session_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SessionAccepted>), MigrateApiError> {
	let tenant_id = parse_tenant_id(&tenant_id)?;
	let session_id = parse_session_id(&session_id)?;
	let entry = state.registry.get(&tenant_id, &session_id).await?;
	let session = entry.claim()?;

	match session.failure() {
		Some(failure) if failure.phase == FailedPhase::Importing && failure.resumable => {}
		_ => {
			return Err(MigrateApiError::Conflict(
				"session has no resumable failure".to_string(),
			))
		}
	}

	spawn_driver(state.clone(), entry.clone(), session, DriverJob::Resume);
	Ok((
		StatusCode::ACCEPTED,
		Json(SessionAccepted {
			session_id,
			phase: SessionPhase::Importing,
		}),
	))
}
