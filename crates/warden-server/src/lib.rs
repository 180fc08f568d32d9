// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden server wiring.
//!
//! Turns a finalized [`ServerConfig`] and a database pool into the pieces the
//! binary runs: the import orchestrator, the shared API state and the router.

pub mod headless;

use axum::{routing::get, Json, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use warden_migrate::{ImportOrchestrator, OrchestratorSettings};
use warden_migrate_source::{HttpConnectorFactory, RetryConfig};
use warden_server_config::{MigrateConfig, ServerConfig};
use warden_server_db::{ImportArchiveRepository, UserRepository};
use warden_server_migrate::{migrate_routes, ImportDefaults, MigrateState, SessionRegistry};

pub use headless::{run_headless, HeadlessError, HeadlessImport};

/// Orchestrator backed by the HTTP source connector and the SQLite user store.
pub fn build_orchestrator(config: &MigrateConfig, pool: SqlitePool) -> ImportOrchestrator {
	let retry = RetryConfig::default().with_max_attempts(config.source_max_retries);
	let factory = HttpConnectorFactory::new(config.page_size, config.page_timeout(), retry);

	ImportOrchestrator::new(
		Arc::new(factory),
		Arc::new(UserRepository::new(pool)),
		orchestrator_settings(config),
	)
}

pub fn orchestrator_settings(config: &MigrateConfig) -> OrchestratorSettings {
	OrchestratorSettings {
		max_batch_size: config.max_batch_size,
		write_concurrency: config.write_concurrency,
		page_timeout: config.page_timeout(),
		write_timeout: config.write_timeout(),
		preview_sample_size: config.preview_sample_size,
	}
}

pub fn create_app_state(config: &ServerConfig, pool: SqlitePool) -> MigrateState {
	MigrateState {
		orchestrator: build_orchestrator(&config.migrate, pool.clone()),
		registry: Arc::new(SessionRegistry::default()),
		archive: Arc::new(ImportArchiveRepository::new(pool)),
		defaults: ImportDefaults {
			batch_size: config.migrate.default_batch_size,
			preview_sample_size: config.migrate.preview_sample_size,
		},
	}
}

/// Start evicting idle live sessions, checking four times per TTL.
pub fn spawn_session_sweep(state: &MigrateState, config: &MigrateConfig) -> tokio::task::JoinHandle<()> {
	let ttl = config.session_idle_ttl();
	let interval = (ttl / 4).max(Duration::from_secs(1));
	tracing::debug!(ttl_secs = ttl.as_secs(), "session sweep started");
	state.registry.clone().spawn_sweep_task(interval, ttl)
}

pub fn create_router(state: MigrateState) -> Router {
	Router::new()
		.route("/health", get(health))
		.merge(migrate_routes(state))
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}
