// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background tasks that own a session while the orchestrator drives it.

use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::Instrument;
use warden_migrate::ProgressObserver;
use warden_migrate_core::{ImportOptions, ImportSession, SessionPhase, SourceCredential};
use warden_server_db::ArchivedSession;

use crate::registry::SessionEntry;
use crate::state::MigrateState;

pub(crate) enum DriverJob {
	/// Validate and preview, stopping at the preview.
	Validate {
		url: String,
		credential: SourceCredential,
	},
	/// Validate, preview, then import without stopping at the preview.
	Connect {
		url: String,
		credential: SourceCredential,
		options: ImportOptions,
	},
	Run(ImportOptions),
	Resume,
}

pub(crate) fn spawn_driver(
	state: MigrateState,
	entry: Arc<SessionEntry>,
	session: OwnedMutexGuard<ImportSession>,
	job: DriverJob,
) {
	let span = tracing::info_span!("import_driver", session_id = %entry.id, tenant_id = %entry.tenant_id);
	tokio::spawn(drive(state, entry, session, job).instrument(span));
}

async fn drive(
	state: MigrateState,
	entry: Arc<SessionEntry>,
	mut session: OwnedMutexGuard<ImportSession>,
	job: DriverJob,
) {
	let orchestrator = &state.orchestrator;
	let observer = entry.as_ref();
	let abort = entry.abort_signal();

	let outcome = match job {
		DriverJob::Validate { url, credential } => {
			orchestrator
				.submit_credentials(&mut session, &url, credential, observer)
				.await
		}
		DriverJob::Connect {
			url,
			credential,
			options,
		} => {
			match orchestrator
				.submit_credentials(&mut session, &url, credential, observer)
				.await
			{
				Ok(()) if session.phase_kind() == SessionPhase::PreviewReady => {
					orchestrator.run(&mut session, options, abort, observer).await
				}
				other => other,
			}
		}
		DriverJob::Run(options) => orchestrator.run(&mut session, options, abort, observer).await,
		DriverJob::Resume => {
			abort.reset();
			orchestrator.resume(&mut session, abort, observer).await
		}
	};

	if let Err(e) = outcome {
		tracing::warn!(error = %e, "import driver stopped before the session settled");
	}
	observer.on_update(&session);

	// Settled sessions are served from the archive from here on. Resumable
	// failures stay live until resumed or swept.
	if let Some(archived) = ArchivedSession::from_session(&session) {
		match state.archive.archive_session(&archived).await {
			Ok(()) if !archived.resumable => {
				state.registry.remove(&entry.id).await;
			}
			Ok(()) => {}
			Err(e) => tracing::error!(error = %e, "failed to archive import session"),
		}
	}
}
