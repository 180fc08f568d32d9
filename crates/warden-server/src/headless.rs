// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Terminal-driven imports.
//!
//! Runs one session start to finish in the current process: validate, show
//! the preview, wait for confirmation, import. Transient source failures are
//! resumed in place a bounded number of times.

use std::fmt::Write as _;
use warden_migrate::{AbortSignal, ImportOrchestrator, OrchestratorError, ProgressObserver};
use warden_migrate_core::{
	ImportOptions, ImportPhase, ImportResult, ImportSession, Preview, SessionErrorKind,
	SessionPhase, SourceCredential, TenantId,
};

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
	#[error("source connection failed ({kind}): {message}")]
	Rejected { kind: &'static str, message: String },

	#[error("import was not confirmed")]
	NotConfirmed,

	#[error("session ended up in unexpected phase {0}")]
	UnexpectedPhase(SessionPhase),

	#[error(transparent)]
	Orchestrator(#[from] OrchestratorError),
}

pub struct HeadlessImport {
	pub tenant_id: TenantId,
	pub source_url: String,
	pub credential: SourceCredential,
	pub options: ImportOptions,
	/// In-process resumes allowed after a transient source failure.
	pub max_resumes: u32,
}

/// Logs progress as batches commit.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
	fn on_update(&self, session: &ImportSession) {
		if let ImportPhase::Importing(progress) = session.phase() {
			tracing::info!(
				processed = progress.tally.processed(),
				expected_total = ?progress.expected_total,
				imported = progress.tally.imported,
				skipped = progress.tally.skipped,
				failed = progress.tally.failed,
				"import progress"
			);
		}
	}
}

/// Drive one import to a settled session.
///
/// `confirm` sees the preview and decides whether to go ahead. The returned
/// session is either `Completed` or `Failed` with a partial result.
pub async fn run_headless<C>(
	orchestrator: &ImportOrchestrator,
	request: HeadlessImport,
	abort: &AbortSignal,
	confirm: C,
) -> Result<ImportSession, HeadlessError>
where
	C: FnOnce(&Preview) -> bool,
{
	let mut session = ImportSession::new(request.tenant_id);
	let observer = LogProgress;

	orchestrator
		.submit_credentials(&mut session, &request.source_url, request.credential, &observer)
		.await?;

	let preview = match session.phase() {
		ImportPhase::PreviewReady(preview) => preview.clone(),
		ImportPhase::Failed(failure) => {
			return Err(HeadlessError::Rejected {
				kind: failure.kind.as_code(),
				message: failure.message.clone(),
			});
		}
		other => return Err(HeadlessError::UnexpectedPhase(other.kind())),
	};

	if !confirm(&preview) {
		return Err(HeadlessError::NotConfirmed);
	}

	orchestrator
		.run(&mut session, request.options, abort, &observer)
		.await?;

	let mut resumes = 0;
	while let Some(failure) = session.failure() {
		if !failure.resumable
			|| failure.kind == SessionErrorKind::Aborted
			|| resumes >= request.max_resumes
		{
			break;
		}
		resumes += 1;
		tracing::warn!(
			kind = failure.kind.as_code(),
			attempt = resumes,
			"resuming import after transient failure"
		);
		orchestrator.resume(&mut session, abort, &observer).await?;
	}

	Ok(session)
}

pub fn render_preview(preview: &Preview) -> String {
	let mut out = String::new();
	match preview.total_count {
		Some(total) => {
			let _ = writeln!(out, "Source reports {total} users.");
		}
		None => {
			let _ = writeln!(out, "Source did not report a user count.");
		}
	}
	for row in &preview.sample {
		let _ = writeln!(
			out,
			"  {:<40} {:<24} password={} oauth={}",
			row.email,
			row.display_name.as_deref().unwrap_or("-"),
			yes_no(row.has_password),
			yes_no(row.has_oauth),
		);
	}
	out
}

pub fn render_result(result: &ImportResult) -> String {
	let mut out = format!(
		"Processed {} users: {} imported, {} skipped, {} failed.",
		result.total_users, result.imported, result.skipped, result.failed
	);
	if let Some(expected) = result.expected_total {
		if expected != result.total_users {
			let _ = write!(out, " Source reported {expected}.");
		}
	}
	out
}

fn yes_no(value: bool) -> &'static str {
	if value {
		"yes"
	} else {
		"no"
	}
}
