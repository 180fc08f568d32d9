// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use warden_migrate_core::ImportSession;

/// Notified after every session transition and after each committed batch.
///
/// Called on the driver task; implementations must not block.
pub trait ProgressObserver: Send + Sync {
	fn on_update(&self, session: &ImportSession);
}

/// Observer for headless runs that only need the final state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
	fn on_update(&self, _session: &ImportSession) {}
}
