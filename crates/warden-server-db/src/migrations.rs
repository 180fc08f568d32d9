// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Embedded schema migrations.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: [(&str, &str); 2] = [
	("001_users", include_str!("../migrations/001_users.sql")),
	(
		"002_import_archive",
		include_str!("../migrations/002_import_archive.sql"),
	),
];

/// Run all database migrations.
///
/// Migrations are idempotent and safe to run on every start.
///
/// # Errors
/// Returns `DbError::Sqlx` for any failure other than an object that already
/// exists.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in statements(sql) {
			if let Err(e) = sqlx::query(stmt).execute(pool).await {
				let msg = e.to_string();
				if !msg.contains("already exists") && !msg.contains("duplicate column") {
					tracing::error!(migration = name, error = %e, "migration failed");
					return Err(e.into());
				}
			}
		}
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}

fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|stmt| {
		stmt
			.lines()
			.any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
	})
}
