// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use warden_migrate_core::{TenantId, UserId};

/// Single-connection in-memory pool; every connection to `:memory:` is a new
/// database, so the pool must not open a second one.
pub async fn create_test_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap()
}

pub async fn create_migrated_pool() -> SqlitePool {
	let pool = create_test_pool().await;
	crate::run_migrations(&pool).await.unwrap();
	pool
}

/// Insert a user the way the console's signup would, without import provenance.
pub async fn insert_native_user(pool: &SqlitePool, tenant_id: &TenantId, id: &UserId, email: &str) {
	let now = Utc::now().to_rfc3339();
	sqlx::query(
		r#"
		INSERT INTO users (tenant_id, id, email, display_email, created_at, updated_at)
		VALUES (?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(tenant_id.to_string())
	.bind(id.to_string())
	.bind(email.to_lowercase())
	.bind(email)
	.bind(&now)
	.bind(&now)
	.execute(pool)
	.await
	.unwrap();
}
