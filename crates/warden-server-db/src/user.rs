// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant user store.
//!
//! Users are keyed by `(tenant_id, id)` and unique per `(tenant_id, email)`,
//! where `email` is the normalized address. Imported users carry provenance so
//! a retried import can recognise its own rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePool, Row};
use uuid::Uuid;
use warden_migrate_core::{
	ExistingUser, ImportSessionId, MappedUserRecord, OAuthLink, Provenance, TenantId, UserId,
};

use crate::error::DbError;

/// Result of writing an imported user.
///
/// Constraint losses are expected per-record outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
	Written { user_id: UserId },
	/// Another user in the tenant owns the email.
	EmailTaken,
	/// The id exists under a different email.
	IdTaken,
	/// A linked identity already belongs to another user in the tenant.
	IdentityTaken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
	pub tenant_id: TenantId,
	pub id: UserId,
	pub email: String,
	pub display_email: String,
	pub display_name: Option<String>,
	pub must_reset_password: bool,
	pub metadata: Option<serde_json::Value>,
	pub provenance: Option<Provenance>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl StoredUser {
	pub fn to_existing(&self) -> ExistingUser {
		ExistingUser {
			id: self.id,
			email: self.email.clone(),
			provenance: self.provenance.clone(),
		}
	}
}

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<StoredUser>, DbError>;
	async fn get_user_by_id(
		&self,
		tenant_id: &TenantId,
		id: &UserId,
	) -> Result<Option<StoredUser>, DbError>;
	async fn upsert_imported_user(
		&self,
		tenant_id: &TenantId,
		record: &MappedUserRecord,
	) -> Result<UpsertOutcome, DbError>;
	async fn get_identities_for_user(
		&self,
		tenant_id: &TenantId,
		user_id: &UserId,
	) -> Result<Vec<OAuthLink>, DbError>;
	async fn count_users(&self, tenant_id: &TenantId) -> Result<i64, DbError>;
}

/// Repository for tenant users and their linked identities.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Look up a user by normalized email.
	#[tracing::instrument(skip(self, email), fields(tenant_id = %tenant_id))]
	pub async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<StoredUser>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT tenant_id, id, email, display_email, display_name, must_reset_password,
				   metadata, import_session_id, import_source_id, created_at, updated_at
			FROM users
			WHERE tenant_id = ? AND email = ?
			"#,
		)
		.bind(tenant_id.to_string())
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_user(&r)).transpose()
	}

	#[tracing::instrument(skip(self), fields(tenant_id = %tenant_id, user_id = %id))]
	pub async fn get_user_by_id(
		&self,
		tenant_id: &TenantId,
		id: &UserId,
	) -> Result<Option<StoredUser>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT tenant_id, id, email, display_email, display_name, must_reset_password,
				   metadata, import_session_id, import_source_id, created_at, updated_at
			FROM users
			WHERE tenant_id = ? AND id = ?
			"#,
		)
		.bind(tenant_id.to_string())
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_user(&r)).transpose()
	}

	/// Insert or rewrite an imported user and replace its identities, atomically.
	///
	/// The row is keyed by `(tenant_id, record.id)`. An existing row is only
	/// rewritten when it has the same email, so repeating a write is a no-op
	/// in effect while a clash with a different user is reported.
	///
	/// # Returns
	/// - `EmailTaken` if another id in the tenant owns `record.email`
	/// - `IdTaken` if `record.id` exists with a different email
	/// - `IdentityTaken` if any link is held by another user; nothing is written
	#[tracing::instrument(
		skip(self, record),
		fields(tenant_id = %tenant_id, user_id = %record.id, links = record.oauth_links.len())
	)]
	pub async fn upsert_imported_user(
		&self,
		tenant_id: &TenantId,
		record: &MappedUserRecord,
	) -> Result<UpsertOutcome, DbError> {
		let tenant = tenant_id.to_string();
		let user_id = record.id.to_string();
		let now = Utc::now().to_rfc3339();
		let metadata = record
			.metadata
			.as_ref()
			.map(serde_json::to_string)
			.transpose()?;

		let mut tx = self.pool.begin().await?;

		let current_email: Option<String> =
			sqlx::query_scalar("SELECT email FROM users WHERE tenant_id = ? AND id = ?")
				.bind(&tenant)
				.bind(&user_id)
				.fetch_optional(&mut *tx)
				.await?;
		if matches!(&current_email, Some(email) if email != &record.email) {
			tracing::debug!("id already held by another email");
			return Ok(UpsertOutcome::IdTaken);
		}

		let written = sqlx::query(
			r#"
			INSERT INTO users (
				tenant_id, id, email, display_email, display_name, must_reset_password,
				metadata, import_session_id, import_source_id, created_at, updated_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			ON CONFLICT(tenant_id, id) DO UPDATE SET
				display_email = excluded.display_email,
				display_name = excluded.display_name,
				must_reset_password = excluded.must_reset_password,
				metadata = excluded.metadata,
				import_session_id = excluded.import_session_id,
				import_source_id = excluded.import_source_id,
				updated_at = excluded.updated_at
			WHERE users.email = excluded.email
			"#,
		)
		.bind(&tenant)
		.bind(&user_id)
		.bind(&record.email)
		.bind(&record.display_email)
		.bind(&record.display_name)
		.bind(record.must_reset_password as i32)
		.bind(&metadata)
		.bind(record.provenance.session_id.to_string())
		.bind(&record.provenance.source_id)
		.bind(&now)
		.bind(&now)
		.execute(&mut *tx)
		.await;

		match written {
			Ok(result) if result.rows_affected() == 0 => {
				tracing::debug!("id claimed concurrently by another email");
				return Ok(UpsertOutcome::IdTaken);
			}
			Ok(_) => {}
			Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
				tracing::debug!("email already owned by another user");
				return Ok(UpsertOutcome::EmailTaken);
			}
			Err(e) => return Err(e.into()),
		}

		sqlx::query("DELETE FROM user_identities WHERE tenant_id = ? AND user_id = ?")
			.bind(&tenant)
			.bind(&user_id)
			.execute(&mut *tx)
			.await?;

		for link in &record.oauth_links {
			let linked = sqlx::query(
				r#"
				INSERT INTO user_identities (id, tenant_id, user_id, provider, provider_user_id, created_at)
				VALUES (?, ?, ?, ?, ?, ?)
				ON CONFLICT(tenant_id, provider, provider_user_id) DO NOTHING
				"#,
			)
			.bind(Uuid::new_v4().to_string())
			.bind(&tenant)
			.bind(&user_id)
			.bind(&link.provider)
			.bind(&link.provider_user_id)
			.bind(&now)
			.execute(&mut *tx)
			.await?;

			if linked.rows_affected() == 0 {
				tracing::warn!(
					provider = %link.provider,
					"identity already linked to another user in tenant, rolling back"
				);
				tx.rollback().await?;
				return Ok(UpsertOutcome::IdentityTaken);
			}
		}

		tx.commit().await?;

		tracing::debug!("imported user written");
		Ok(UpsertOutcome::Written {
			user_id: record.id,
		})
	}

	#[tracing::instrument(skip(self), fields(tenant_id = %tenant_id, user_id = %user_id))]
	pub async fn get_identities_for_user(
		&self,
		tenant_id: &TenantId,
		user_id: &UserId,
	) -> Result<Vec<OAuthLink>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT provider, provider_user_id
			FROM user_identities
			WHERE tenant_id = ? AND user_id = ?
			ORDER BY provider, provider_user_id
			"#,
		)
		.bind(tenant_id.to_string())
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		Ok(rows
			.iter()
			.map(|r| OAuthLink::new(r.get::<String, _>("provider"), r.get::<String, _>("provider_user_id")))
			.collect())
	}

	#[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
	pub async fn count_users(&self, tenant_id: &TenantId) -> Result<i64, DbError> {
		let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE tenant_id = ?")
			.bind(tenant_id.to_string())
			.fetch_one(&self.pool)
			.await?;
		Ok(count.0)
	}
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid, DbError> {
	Uuid::parse_str(value).map_err(|e| DbError::corrupt(column, e))
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::corrupt(column, e))
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<StoredUser, DbError> {
	let tenant_id = parse_uuid(&row.get::<String, _>("tenant_id"), "tenant_id")?;
	let id = parse_uuid(&row.get::<String, _>("id"), "user id")?;

	let metadata: Option<String> = row.get("metadata");
	let metadata = metadata
		.map(|raw| serde_json::from_str(&raw))
		.transpose()?;

	let session_id: Option<String> = row.get("import_session_id");
	let source_id: Option<String> = row.get("import_source_id");
	let provenance = match (session_id, source_id) {
		(Some(session_id), Some(source_id)) => Some(Provenance {
			session_id: ImportSessionId::new(parse_uuid(&session_id, "import_session_id")?),
			source_id,
		}),
		_ => None,
	};

	Ok(StoredUser {
		tenant_id: TenantId::new(tenant_id),
		id: UserId::new(id),
		email: row.get("email"),
		display_email: row.get("display_email"),
		display_name: row.get("display_name"),
		must_reset_password: row.get::<i64, _>("must_reset_password") != 0,
		metadata,
		provenance,
		created_at: parse_timestamp(&row.get::<String, _>("created_at"), "created_at")?,
		updated_at: parse_timestamp(&row.get::<String, _>("updated_at"), "updated_at")?,
	})
}

#[async_trait]
impl UserStore for UserRepository {
	async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<StoredUser>, DbError> {
		self.get_user_by_email(tenant_id, email).await
	}

	async fn get_user_by_id(
		&self,
		tenant_id: &TenantId,
		id: &UserId,
	) -> Result<Option<StoredUser>, DbError> {
		self.get_user_by_id(tenant_id, id).await
	}

	async fn upsert_imported_user(
		&self,
		tenant_id: &TenantId,
		record: &MappedUserRecord,
	) -> Result<UpsertOutcome, DbError> {
		self.upsert_imported_user(tenant_id, record).await
	}

	async fn get_identities_for_user(
		&self,
		tenant_id: &TenantId,
		user_id: &UserId,
	) -> Result<Vec<OAuthLink>, DbError> {
		self.get_identities_for_user(tenant_id, user_id).await
	}

	async fn count_users(&self, tenant_id: &TenantId) -> Result<i64, DbError> {
		self.count_users(tenant_id).await
	}
}
