// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_migrate_core::{
	FailedPhase, ImportOptions, ImportPhase, ImportProgress, ImportResult, ImportSession,
	ImportSessionId, Preview, PreviewRow, SessionPhase, SourceCredential, TenantId,
};
use warden_server_db::ArchivedSession;

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
	pub url: String,
	pub credential: SourceCredential,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
	/// Defaults to the URL of the previous attempt.
	#[serde(default)]
	pub url: Option<String>,
	pub credential: SourceCredential,
}

/// Import options as sent by the wizard; `batch_size` falls back to the
/// server default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptionsBody {
	pub batch_size: Option<usize>,
	pub skip_existing: bool,
	pub preserve_ids: bool,
	pub import_metadata: bool,
	pub preserve_oauth: bool,
}

impl OptionsBody {
	pub fn into_options(self, default_batch_size: usize) -> ImportOptions {
		ImportOptions {
			batch_size: self.batch_size.unwrap_or(default_batch_size),
			skip_existing: self.skip_existing,
			preserve_ids: self.preserve_ids,
			import_metadata: self.import_metadata,
			preserve_oauth: self.preserve_oauth,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct StartImportRequest {
	#[serde(default)]
	pub options: OptionsBody,
}

#[derive(Debug, Deserialize)]
pub struct RunImportRequest {
	pub url: String,
	pub credential: SourceCredential,
	#[serde(default)]
	pub options: OptionsBody,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
	pub url: String,
	pub sample_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
	pub session_id: String,
}

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const MAX_HISTORY_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
	pub limit: Option<i64>,
}

impl HistoryQuery {
	pub fn limit(&self) -> i64 {
		self.limit
			.unwrap_or(DEFAULT_HISTORY_LIMIT)
			.clamp(1, MAX_HISTORY_LIMIT)
	}
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SessionAccepted {
	pub session_id: ImportSessionId,
	pub phase: SessionPhase,
}

#[derive(Debug, Serialize)]
pub struct PreviewView {
	pub total_count: Option<u64>,
	pub sample_users: Vec<PreviewRow>,
}

impl From<Preview> for PreviewView {
	fn from(preview: Preview) -> Self {
		Self {
			total_count: preview.total_count,
			sample_users: preview.sample,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
	pub phase: FailedPhase,
	pub kind: String,
	pub message: String,
	pub resumable: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
	pub session_id: ImportSessionId,
	pub tenant_id: TenantId,
	pub phase: SessionPhase,
	pub source_url: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub preview: Option<PreviewView>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub progress: Option<ImportProgress>,
	/// Final result, or the partial result of a failed import.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<ImportResult>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorView>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<&ImportSession> for SessionView {
	fn from(session: &ImportSession) -> Self {
		let progress = match session.phase() {
			ImportPhase::Importing(progress) => Some(progress.clone()),
			_ => None,
		};
		Self {
			session_id: session.id,
			tenant_id: session.tenant_id,
			phase: session.phase_kind(),
			source_url: session.source_url().map(str::to_string),
			preview: session.preview().cloned().map(PreviewView::from),
			progress,
			result: session.result().cloned(),
			error: session.failure().map(|failure| ErrorView {
				phase: failure.phase,
				kind: failure.kind.as_code().to_string(),
				message: failure.message.clone(),
				resumable: failure.resumable,
			}),
			created_at: session.created_at,
			updated_at: session.updated_at,
		}
	}
}

impl From<ArchivedSession> for SessionView {
	fn from(archived: ArchivedSession) -> Self {
		let error = archived.error_kind.map(|kind| ErrorView {
			phase: FailedPhase::Importing,
			kind,
			message: String::new(),
			// The credential never outlives the live session.
			resumable: false,
		});
		Self {
			session_id: archived.id,
			tenant_id: archived.tenant_id,
			phase: archived.phase,
			source_url: Some(archived.source_url),
			preview: None,
			progress: None,
			result: Some(archived.result),
			error,
			created_at: archived.created_at,
			updated_at: archived.archived_at,
		}
	}
}
