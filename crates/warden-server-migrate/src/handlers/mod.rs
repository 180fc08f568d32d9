// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod connection;
pub mod export;
pub mod sessions;

use warden_migrate_core::{ImportSessionId, TenantId};

use crate::error::MigrateApiError;

fn parse_tenant_id(s: &str) -> Result<TenantId, MigrateApiError> {
	s.parse()
		.map_err(|_| MigrateApiError::BadRequest(format!("Invalid tenant ID: {s}")))
}

fn parse_session_id(s: &str) -> Result<ImportSessionId, MigrateApiError> {
	s.parse()
		.map_err(|_| MigrateApiError::BadRequest(format!("Invalid session ID: {s}")))
}
