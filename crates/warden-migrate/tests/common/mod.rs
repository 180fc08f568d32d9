// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures: a scripted source provider and a migrated in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use warden_migrate::{AbortSignal, ImportOrchestrator, OrchestratorSettings};
use warden_migrate_core::{
	MappedUserRecord, OAuthLink, PageCursor, SourceCredential, SourceUserRecord, TenantId, UserId,
};
use warden_migrate_source::{ConnectorFactory, SourceConnector, SourceError, SourcePage};
use warden_server_db::{
	run_migrations, DbError, StoredUser, UpsertOutcome, UserRepository, UserStore,
};

pub const GOOD_KEY: &str = "sk_admin_good";
pub const SOURCE_URL: &str = "https://source.test";

pub fn user(source_id: &str, email: &str) -> SourceUserRecord {
	SourceUserRecord {
		source_id: source_id.to_string(),
		email: Some(email.to_string()),
		display_name: Some(format!("User {source_id}")),
		has_password: true,
		oauth_links: Vec::new(),
		metadata: None,
	}
}

pub fn credential() -> SourceCredential {
	SourceCredential::new(GOOD_KEY)
}

// =============================================================================
// Source
// =============================================================================

/// Source whose pages are fixed up front. Cursors are page indexes.
pub struct FakeSource {
	pages: Vec<Vec<SourceUserRecord>>,
	count: Option<u64>,
	fail_once_at: Mutex<Option<(usize, SourceError)>>,
	abort_at: Mutex<Option<(usize, AbortSignal)>>,
	stall_at: Mutex<Option<(usize, Duration)>>,
	fetches: Mutex<Vec<usize>>,
	validations: AtomicUsize,
}

impl FakeSource {
	pub fn new(pages: Vec<Vec<SourceUserRecord>>) -> Self {
		let count = pages.iter().map(|page| page.len() as u64).sum();
		Self {
			pages,
			count: Some(count),
			fail_once_at: Mutex::new(None),
			abort_at: Mutex::new(None),
			stall_at: Mutex::new(None),
			fetches: Mutex::new(Vec::new()),
			validations: AtomicUsize::new(0),
		}
	}

	pub fn without_count(mut self) -> Self {
		self.count = None;
		self
	}

	/// The next fetch of page `index` fails with `error`; later fetches succeed.
	pub fn fail_once_at(&self, index: usize, error: SourceError) {
		*self.fail_once_at.lock().unwrap() = Some((index, error));
	}

	/// Trip `signal` the next time page `index` is fetched.
	pub fn abort_once_at(&self, index: usize, signal: AbortSignal) {
		*self.abort_at.lock().unwrap() = Some((index, signal));
	}

	/// The next fetch of page `index` sleeps for `delay` before answering.
	pub fn stall_once_at(&self, index: usize, delay: Duration) {
		*self.stall_at.lock().unwrap() = Some((index, delay));
	}

	pub fn fetched_pages(&self) -> Vec<usize> {
		self.fetches.lock().unwrap().clone()
	}
}

#[async_trait]
impl SourceConnector for FakeSource {
	async fn validate(&self) -> Result<(), SourceError> {
		self.validations.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn count(&self) -> Option<u64> {
		self.count
	}

	async fn page(&self, cursor: Option<&PageCursor>) -> Result<SourcePage, SourceError> {
		let index = cursor.map(|c| c.as_str().parse::<usize>().unwrap()).unwrap_or(0);

		{
			let mut fail = self.fail_once_at.lock().unwrap();
			if matches!(fail.as_ref(), Some((at, _)) if *at == index) {
				let (_, error) = fail.take().unwrap();
				return Err(error);
			}
		}

		{
			let mut abort = self.abort_at.lock().unwrap();
			if matches!(abort.as_ref(), Some((at, _)) if *at == index) {
				let (_, signal) = abort.take().unwrap();
				signal.abort();
			}
		}

		let stall = {
			let mut stall = self.stall_at.lock().unwrap();
			match stall.as_ref() {
				Some((at, _)) if *at == index => stall.take().map(|(_, delay)| delay),
				_ => None,
			}
		};
		if let Some(delay) = stall {
			tokio::time::sleep(delay).await;
		}

		self.fetches.lock().unwrap().push(index);
		let records = self.pages.get(index).cloned().unwrap_or_default();
		let next = (index + 1 < self.pages.len()).then(|| PageCursor::new((index + 1).to_string()));
		Ok(SourcePage { records, next })
	}

	async fn fetch_user(&self, source_id: &str) -> Result<Option<SourceUserRecord>, SourceError> {
		Ok(self
			.pages
			.iter()
			.flatten()
			.find(|record| record.source_id == source_id)
			.cloned())
	}
}

/// Hands out the shared [`FakeSource`] to callers holding [`GOOD_KEY`].
pub struct FakeFactory {
	source: Arc<FakeSource>,
}

impl FakeFactory {
	pub fn new(source: Arc<FakeSource>) -> Self {
		Self { source }
	}
}

impl ConnectorFactory for FakeFactory {
	fn connect(
		&self,
		_source_url: &str,
		credential: &SourceCredential,
	) -> Result<Arc<dyn SourceConnector>, SourceError> {
		if credential.expose() != GOOD_KEY {
			return Err(SourceError::InvalidCredential);
		}
		Ok(self.source.clone())
	}
}

// =============================================================================
// Destination
// =============================================================================

pub async fn migrated_pool() -> SqlitePool {
	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}

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

/// Store whose writes fail for selected emails.
pub struct FlakyStore {
	inner: UserRepository,
	failing: HashSet<String>,
}

impl FlakyStore {
	pub fn new(inner: UserRepository, failing: &[&str]) -> Self {
		Self {
			inner,
			failing: failing.iter().map(|email| email.to_string()).collect(),
		}
	}
}

#[async_trait]
impl UserStore for FlakyStore {
	async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<StoredUser>, DbError> {
		self.inner.get_user_by_email(tenant_id, email).await
	}

	async fn get_user_by_id(
		&self,
		tenant_id: &TenantId,
		id: &UserId,
	) -> Result<Option<StoredUser>, DbError> {
		self.inner.get_user_by_id(tenant_id, id).await
	}

	async fn upsert_imported_user(
		&self,
		tenant_id: &TenantId,
		record: &MappedUserRecord,
	) -> Result<UpsertOutcome, DbError> {
		if self.failing.contains(&record.email) {
			return Err(DbError::Store("disk full".to_string()));
		}
		self.inner.upsert_imported_user(tenant_id, record).await
	}

	async fn get_identities_for_user(
		&self,
		tenant_id: &TenantId,
		user_id: &UserId,
	) -> Result<Vec<OAuthLink>, DbError> {
		self.inner.get_identities_for_user(tenant_id, user_id).await
	}

	async fn count_users(&self, tenant_id: &TenantId) -> Result<i64, DbError> {
		self.inner.count_users(tenant_id).await
	}
}

/// Store whose reads or writes hang for one email.
pub struct SlowStore {
	inner: UserRepository,
	email: String,
	delay: Duration,
	slow_lookups: bool,
}

impl SlowStore {
	/// Upserts of `email` sleep for `delay`.
	pub fn slow_writes(inner: UserRepository, email: &str, delay: Duration) -> Self {
		Self {
			inner,
			email: email.to_string(),
			delay,
			slow_lookups: false,
		}
	}

	/// Email lookups of `email` sleep for `delay`.
	pub fn slow_lookups(inner: UserRepository, email: &str, delay: Duration) -> Self {
		Self {
			slow_lookups: true,
			..Self::slow_writes(inner, email, delay)
		}
	}
}

#[async_trait]
impl UserStore for SlowStore {
	async fn get_user_by_email(
		&self,
		tenant_id: &TenantId,
		email: &str,
	) -> Result<Option<StoredUser>, DbError> {
		if self.slow_lookups && email == self.email {
			tokio::time::sleep(self.delay).await;
		}
		self.inner.get_user_by_email(tenant_id, email).await
	}

	async fn get_user_by_id(
		&self,
		tenant_id: &TenantId,
		id: &UserId,
	) -> Result<Option<StoredUser>, DbError> {
		self.inner.get_user_by_id(tenant_id, id).await
	}

	async fn upsert_imported_user(
		&self,
		tenant_id: &TenantId,
		record: &MappedUserRecord,
	) -> Result<UpsertOutcome, DbError> {
		if !self.slow_lookups && record.email == self.email {
			tokio::time::sleep(self.delay).await;
		}
		self.inner.upsert_imported_user(tenant_id, record).await
	}

	async fn get_identities_for_user(
		&self,
		tenant_id: &TenantId,
		user_id: &UserId,
	) -> Result<Vec<OAuthLink>, DbError> {
		self.inner.get_identities_for_user(tenant_id, user_id).await
	}

	async fn count_users(&self, tenant_id: &TenantId) -> Result<i64, DbError> {
		self.inner.count_users(tenant_id).await
	}
}

pub fn orchestrator(source: Arc<FakeSource>, store: Arc<dyn UserStore>) -> ImportOrchestrator {
	orchestrator_with(source, store, OrchestratorSettings::default())
}

pub fn orchestrator_with(
	source: Arc<FakeSource>,
	store: Arc<dyn UserStore>,
	settings: OrchestratorSettings,
) -> ImportOrchestrator {
	ImportOrchestrator::new(Arc::new(FakeFactory::new(source)), store, settings)
}
