// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Archive of finished or paused import sessions.
//!
//! Live sessions are held in memory by the server. Once a session stops
//! importing its summary and full error ledger are written here so the error
//! report stays downloadable. Credentials are never archived.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;
use warden_migrate_core::{
	FailReason, FailedPhase, ImportOptions, ImportOutcome, ImportPhase, ImportResult,
	ImportSession, ImportSessionId, OutcomeStatus, SessionPhase, SkipReason, TenantId,
};

use crate::error::DbError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedSession {
	pub id: ImportSessionId,
	pub tenant_id: TenantId,
	pub source_url: String,
	pub phase: SessionPhase,
	/// Session error code for failed sessions.
	pub error_kind: Option<String>,
	pub resumable: bool,
	pub options: Option<ImportOptions>,
	pub result: ImportResult,
	pub created_at: DateTime<Utc>,
	pub archived_at: DateTime<Utc>,
}

impl ArchivedSession {
	/// Archive form of a session that has import results, complete or partial.
	/// Sessions that never started importing have nothing worth keeping.
	pub fn from_session(session: &ImportSession) -> Option<Self> {
		let (result, failure) = match session.phase() {
			ImportPhase::Completed(result) => (result.clone(), None),
			ImportPhase::Failed(failure) if failure.phase == FailedPhase::Importing => {
				(failure.partial.clone()?, Some(failure))
			}
			_ => return None,
		};

		Some(Self {
			id: session.id,
			tenant_id: session.tenant_id,
			source_url: session.source_url().unwrap_or_default().to_string(),
			phase: session.phase_kind(),
			error_kind: failure.map(|f| f.kind.as_code().to_string()),
			resumable: failure.is_some_and(|f| f.resumable),
			options: session.options().cloned(),
			result,
			created_at: session.created_at,
			archived_at: Utc::now(),
		})
	}
}

/// Summary row without the outcome list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedSessionSummary {
	pub id: ImportSessionId,
	pub phase: SessionPhase,
	pub error_kind: Option<String>,
	pub total_users: u64,
	pub imported: u64,
	pub skipped: u64,
	pub failed: u64,
	pub created_at: DateTime<Utc>,
	pub archived_at: DateTime<Utc>,
}

#[async_trait]
pub trait ImportArchiveStore: Send + Sync {
	async fn archive_session(&self, session: &ArchivedSession) -> Result<(), DbError>;
	async fn get_archived_session(
		&self,
		tenant_id: &TenantId,
		id: &ImportSessionId,
	) -> Result<Option<ArchivedSession>, DbError>;
	async fn list_archived_sessions(
		&self,
		tenant_id: &TenantId,
		limit: i64,
	) -> Result<Vec<ArchivedSessionSummary>, DbError>;
}

#[derive(Clone)]
pub struct ImportArchiveRepository {
	pool: SqlitePool,
}

impl ImportArchiveRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Write or replace a session's summary and outcomes.
	///
	/// A resumed session is archived again when it stops, so the outcomes are
	/// replaced wholesale rather than appended.
	#[tracing::instrument(
		skip(self, session),
		fields(session_id = %session.id, tenant_id = %session.tenant_id, outcomes = session.result.outcomes.len())
	)]
	pub async fn archive_session(&self, session: &ArchivedSession) -> Result<(), DbError> {
		let id = session.id.to_string();
		let options = session
			.options
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO import_sessions (
				id, tenant_id, source_url, phase, error_kind, resumable, options,
				total_users, imported, skipped, failed, expected_total, created_at, archived_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(id) DO UPDATE SET
				phase = excluded.phase,
				error_kind = excluded.error_kind,
				resumable = excluded.resumable,
				options = excluded.options,
				total_users = excluded.total_users,
				imported = excluded.imported,
				skipped = excluded.skipped,
				failed = excluded.failed,
				expected_total = excluded.expected_total,
				archived_at = excluded.archived_at
			"#,
		)
		.bind(&id)
		.bind(session.tenant_id.to_string())
		.bind(&session.source_url)
		.bind(session.phase.as_str())
		.bind(&session.error_kind)
		.bind(session.resumable as i32)
		.bind(&options)
		.bind(session.result.total_users as i64)
		.bind(session.result.imported as i64)
		.bind(session.result.skipped as i64)
		.bind(session.result.failed as i64)
		.bind(session.result.expected_total.map(|n| n as i64))
		.bind(session.created_at.to_rfc3339())
		.bind(session.archived_at.to_rfc3339())
		.execute(&mut *tx)
		.await?;

		sqlx::query("DELETE FROM import_outcomes WHERE session_id = ?")
			.bind(&id)
			.execute(&mut *tx)
			.await?;

		for (seq, outcome) in session.result.outcomes.iter().enumerate() {
			let (status, reason) = match &outcome.status {
				OutcomeStatus::Imported { .. } => continue,
				OutcomeStatus::Skipped { reason } => ("skipped", reason.as_code().to_string()),
				OutcomeStatus::Failed { reason } => ("failed", reason.as_code().to_string()),
			};

			sqlx::query(
				r#"
				INSERT INTO import_outcomes (session_id, seq, email, source_id, status, reason)
				VALUES (?, ?, ?, ?, ?, ?)
				"#,
			)
			.bind(&id)
			.bind(seq as i64)
			.bind(&outcome.email)
			.bind(&outcome.source_id)
			.bind(status)
			.bind(reason)
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		tracing::info!(phase = %session.phase, "import session archived");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(tenant_id = %tenant_id, session_id = %id))]
	pub async fn get_archived_session(
		&self,
		tenant_id: &TenantId,
		id: &ImportSessionId,
	) -> Result<Option<ArchivedSession>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, tenant_id, source_url, phase, error_kind, resumable, options,
				   total_users, imported, skipped, failed, expected_total, created_at, archived_at
			FROM import_sessions
			WHERE tenant_id = ? AND id = ?
			"#,
		)
		.bind(tenant_id.to_string())
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		let Some(row) = row else {
			return Ok(None);
		};

		let outcome_rows = sqlx::query(
			r#"
			SELECT email, source_id, status, reason
			FROM import_outcomes
			WHERE session_id = ?
			ORDER BY seq
			"#,
		)
		.bind(id.to_string())
		.fetch_all(&self.pool)
		.await?;

		let outcomes = outcome_rows
			.iter()
			.map(row_to_outcome)
			.collect::<Vec<_>>();

		let summary = row_to_summary(&row)?;
		let options: Option<String> = row.get("options");
		let options = options.map(|raw| serde_json::from_str(&raw)).transpose()?;
		let expected_total: Option<i64> = row.get("expected_total");

		Ok(Some(ArchivedSession {
			id: summary.id,
			tenant_id: *tenant_id,
			source_url: row.get("source_url"),
			phase: summary.phase,
			error_kind: summary.error_kind,
			resumable: row.get::<i64, _>("resumable") != 0,
			options,
			result: ImportResult {
				total_users: summary.total_users,
				imported: summary.imported,
				skipped: summary.skipped,
				failed: summary.failed,
				expected_total: expected_total.map(|n| n as u64),
				outcomes,
			},
			created_at: summary.created_at,
			archived_at: summary.archived_at,
		}))
	}

	#[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
	pub async fn list_archived_sessions(
		&self,
		tenant_id: &TenantId,
		limit: i64,
	) -> Result<Vec<ArchivedSessionSummary>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, phase, error_kind, total_users, imported, skipped, failed,
				   created_at, archived_at
			FROM import_sessions
			WHERE tenant_id = ?
			ORDER BY created_at DESC
			LIMIT ?
			"#,
		)
		.bind(tenant_id.to_string())
		.bind(limit.clamp(1, 500))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_summary).collect()
	}
}

fn parse_phase(raw: &str) -> Result<SessionPhase, DbError> {
	serde_json::from_value(serde_json::Value::String(raw.to_string()))
		.map_err(|_| DbError::corrupt("phase", raw))
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::corrupt(column, e))
}

fn row_to_summary(row: &sqlx::sqlite::SqliteRow) -> Result<ArchivedSessionSummary, DbError> {
	let id: String = row.get("id");
	let id = Uuid::parse_str(&id).map_err(|e| DbError::corrupt("id", e))?;

	Ok(ArchivedSessionSummary {
		id: ImportSessionId::new(id),
		phase: parse_phase(&row.get::<String, _>("phase"))?,
		error_kind: row.get("error_kind"),
		total_users: row.get::<i64, _>("total_users") as u64,
		imported: row.get::<i64, _>("imported") as u64,
		skipped: row.get::<i64, _>("skipped") as u64,
		failed: row.get::<i64, _>("failed") as u64,
		created_at: parse_timestamp(&row.get::<String, _>("created_at"), "created_at")?,
		archived_at: parse_timestamp(&row.get::<String, _>("archived_at"), "archived_at")?,
	})
}

/// Unrecognised codes are kept as [`FailReason::Unknown`] rather than rejected.
fn row_to_outcome(row: &sqlx::sqlite::SqliteRow) -> ImportOutcome {
	let status: String = row.get("status");
	let reason: String = row.get("reason");

	let status = match (status.as_str(), reason.as_str()) {
		("skipped", code) if code == SkipReason::AlreadyExists.as_code() => OutcomeStatus::Skipped {
			reason: SkipReason::AlreadyExists,
		},
		(_, code) => OutcomeStatus::Failed {
			reason: FailReason::from_code(code),
		},
	};

	ImportOutcome {
		email: row.get("email"),
		source_id: row.get("source_id"),
		status,
	}
}

#[async_trait]
impl ImportArchiveStore for ImportArchiveRepository {
	async fn archive_session(&self, session: &ArchivedSession) -> Result<(), DbError> {
		self.archive_session(session).await
	}

	async fn get_archived_session(
		&self,
		tenant_id: &TenantId,
		id: &ImportSessionId,
	) -> Result<Option<ArchivedSession>, DbError> {
		self.get_archived_session(tenant_id, id).await
	}

	async fn list_archived_sessions(
		&self,
		tenant_id: &TenantId,
		limit: i64,
	) -> Result<Vec<ArchivedSessionSummary>, DbError> {
		self.list_archived_sessions(tenant_id, limit).await
	}
}
