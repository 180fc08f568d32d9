// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use warden_migrate::ImportOrchestrator;
use warden_server_db::ImportArchiveStore;

use crate::registry::SessionRegistry;

/// Values used when a request leaves them out.
#[derive(Debug, Clone, Copy)]
pub struct ImportDefaults {
	pub batch_size: usize,
	pub preview_sample_size: usize,
}

impl Default for ImportDefaults {
	fn default() -> Self {
		Self {
			batch_size: warden_migrate_core::DEFAULT_BATCH_SIZE,
			preview_sample_size: 5,
		}
	}
}

#[derive(Clone)]
pub struct MigrateState {
	pub orchestrator: ImportOrchestrator,
	pub registry: Arc<SessionRegistry>,
	pub archive: Arc<dyn ImportArchiveStore>,
	pub defaults: ImportDefaults,
}
