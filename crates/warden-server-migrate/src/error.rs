// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use warden_migrate::OrchestratorError;
use warden_migrate_core::{ImportSessionId, LedgerError, TransitionError};
use warden_migrate_source::SourceError;
use warden_server_db::DbError;

/// Registry lookups and claims.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error("import session {0} not found")]
	NotFound(ImportSessionId),

	#[error("import session {0} is being driven by another request")]
	Busy(ImportSessionId),
}

#[derive(Debug, thiserror::Error)]
pub enum MigrateApiError {
	#[error("not found: {0}")]
	NotFound(String),
	#[error("bad request: {0}")]
	BadRequest(String),
	#[error("conflict: {0}")]
	Conflict(String),
	#[error("source rejected the credential")]
	InvalidCredential,
	#[error("source unreachable: {0}")]
	Unreachable(String),
	#[error("internal error: {0}")]
	Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub error: String,
	pub message: String,
}

impl MigrateApiError {
	fn code(&self) -> &'static str {
		match self {
			MigrateApiError::NotFound(_) => "not_found",
			MigrateApiError::BadRequest(_) => "bad_request",
			MigrateApiError::Conflict(_) => "conflict",
			MigrateApiError::InvalidCredential => "invalid_credential",
			MigrateApiError::Unreachable(_) => "unreachable",
			MigrateApiError::Internal(_) => "internal_error",
		}
	}

	fn status(&self) -> StatusCode {
		match self {
			MigrateApiError::NotFound(_) => StatusCode::NOT_FOUND,
			MigrateApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			MigrateApiError::Conflict(_) => StatusCode::CONFLICT,
			MigrateApiError::InvalidCredential => StatusCode::UNPROCESSABLE_ENTITY,
			MigrateApiError::Unreachable(_) => StatusCode::BAD_GATEWAY,
			MigrateApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl From<SessionError> for MigrateApiError {
	fn from(e: SessionError) -> Self {
		match e {
			SessionError::NotFound(_) => MigrateApiError::NotFound(e.to_string()),
			SessionError::Busy(_) => MigrateApiError::Conflict(e.to_string()),
		}
	}
}

impl From<SourceError> for MigrateApiError {
	fn from(e: SourceError) -> Self {
		match e {
			SourceError::InvalidCredential => MigrateApiError::InvalidCredential,
			SourceError::InvalidEndpoint(msg) => MigrateApiError::BadRequest(msg),
			other => MigrateApiError::Unreachable(other.to_string()),
		}
	}
}

impl From<OrchestratorError> for MigrateApiError {
	fn from(e: OrchestratorError) -> Self {
		match e {
			OrchestratorError::Options(e) => MigrateApiError::BadRequest(e.to_string()),
			OrchestratorError::Transition(e) => MigrateApiError::from(e),
			OrchestratorError::MissingCredential => {
				MigrateApiError::Conflict("session has no source credential".to_string())
			}
		}
	}
}

impl From<TransitionError> for MigrateApiError {
	fn from(e: TransitionError) -> Self {
		MigrateApiError::Conflict(e.to_string())
	}
}

impl From<DbError> for MigrateApiError {
	fn from(e: DbError) -> Self {
		MigrateApiError::Internal(e.to_string())
	}
}

impl From<LedgerError> for MigrateApiError {
	fn from(e: LedgerError) -> Self {
		MigrateApiError::Internal(format!("CSV write error: {e}"))
	}
}

impl IntoResponse for MigrateApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			tracing::error!(error = %self, "migration request failed");
		}
		let body = ErrorBody {
			error: self.code().to_string(),
			message: self.to_string(),
		};
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn source_errors_map_to_wizard_codes() {
		assert_eq!(
			MigrateApiError::from(SourceError::InvalidCredential).status(),
			StatusCode::UNPROCESSABLE_ENTITY
		);
		assert_eq!(
			MigrateApiError::from(SourceError::Timeout).status(),
			StatusCode::BAD_GATEWAY
		);
		assert_eq!(
			MigrateApiError::from(SourceError::InvalidEndpoint("ftp://x".to_string())).status(),
			StatusCode::BAD_REQUEST
		);
	}

	#[test]
	fn busy_sessions_conflict() {
		let err = MigrateApiError::from(SessionError::Busy(ImportSessionId::generate()));
		assert_eq!(err.status(), StatusCode::CONFLICT);
		assert_eq!(err.code(), "conflict");
	}
}
