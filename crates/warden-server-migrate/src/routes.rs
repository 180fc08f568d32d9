// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	routing::{get, post},
	Router,
};

use crate::handlers::{connection, export, sessions};
use crate::state::MigrateState;

const BASE: &str = "/api/tenants/{tenant_id}/migrations";

pub fn migrate_routes(state: MigrateState) -> Router {
	let path = |suffix: &str| format!("{BASE}{suffix}");

	Router::new()
		.route(&path("/validate-connection"), post(connection::validate_connection))
		.route(&path("/preview"), get(connection::preview))
		.route(&path("/run-import"), post(sessions::run_import))
		.route(&path("/export-errors"), get(export::export_errors))
		.route(
			&path("/sessions"),
			get(sessions::list_sessions).post(sessions::create_session),
		)
		.route(&path("/sessions/{session_id}"), get(sessions::get_session))
		.route(
			&path("/sessions/{session_id}/credentials"),
			post(sessions::submit_credentials),
		)
		.route(&path("/sessions/{session_id}/import"), post(sessions::start_import))
		.route(
			&path("/sessions/{session_id}/source-users/{source_id}"),
			get(sessions::get_source_user),
		)
		.route(&path("/sessions/{session_id}/abort"), post(sessions::abort_import))
		.route(&path("/sessions/{session_id}/resume"), post(sessions::resume_import))
		.with_state(state)
}
