// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Import session state machine.
//!
//! ```text
//! Idle -> CredentialsValidating -> PreviewReady -> Importing -> Completed
//!                 |      ^                            |   ^
//!                 v      | resubmit                   v   | resume
//!        Failed(CredentialsValidating)       Failed(Importing, resumable)
//! ```
//!
//! `Completed` and non-resumable import failures are terminal. The source
//! credential is dropped whenever the session can no longer use it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::credential::SourceCredential;
use crate::ids::{ImportSessionId, TenantId, UserId};
use crate::ledger::ErrorLedger;
use crate::options::ImportOptions;
use crate::outcome::ImportOutcome;
use crate::record::{PageCursor, PreviewRow};
use crate::result::{ImportResult, ImportTally};

// =============================================================================
// Phase names and session-level errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
	Idle,
	CredentialsValidating,
	PreviewReady,
	Importing,
	Completed,
	Failed,
}

impl SessionPhase {
	pub fn as_str(&self) -> &'static str {
		match self {
			SessionPhase::Idle => "idle",
			SessionPhase::CredentialsValidating => "credentials_validating",
			SessionPhase::PreviewReady => "preview_ready",
			SessionPhase::Importing => "importing",
			SessionPhase::Completed => "completed",
			SessionPhase::Failed => "failed",
		}
	}
}

impl fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Phase a session was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedPhase {
	CredentialsValidating,
	Importing,
}

/// Session-fatal conditions. Per-record problems never end up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
	InvalidCredential,
	Unreachable,
	SourceTimeout,
	RateLimited,
	SourceUnavailable,
	InvalidSourceResponse,
	SourceRejected,
	Aborted,
}

impl SessionErrorKind {
	pub fn as_code(&self) -> &'static str {
		match self {
			SessionErrorKind::InvalidCredential => "invalid_credential",
			SessionErrorKind::Unreachable => "unreachable",
			SessionErrorKind::SourceTimeout => "source_timeout",
			SessionErrorKind::RateLimited => "rate_limited",
			SessionErrorKind::SourceUnavailable => "source_unavailable",
			SessionErrorKind::InvalidSourceResponse => "invalid_source_response",
			SessionErrorKind::SourceRejected => "source_rejected",
			SessionErrorKind::Aborted => "aborted",
		}
	}

	/// Whether an import that stopped for this reason may continue from its
	/// last checkpoint.
	pub fn is_resumable(&self) -> bool {
		matches!(
			self,
			SessionErrorKind::Unreachable
				| SessionErrorKind::SourceTimeout
				| SessionErrorKind::RateLimited
				| SessionErrorKind::SourceUnavailable
				| SessionErrorKind::Aborted
		)
	}
}

impl fmt::Display for SessionErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_code())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
	#[error("cannot {action} while the session is {from}")]
	InvalidTransition {
		from: SessionPhase,
		action: &'static str,
	},

	#[error("import stopped with {0} and cannot be resumed")]
	NotResumable(SessionErrorKind),
}

// =============================================================================
// Phase payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
	pub total_count: Option<u64>,
	pub sample: Vec<PreviewRow>,
}

/// Where to pick pagination back up. Batches never span pages, so `skip`
/// counts records of the page at `cursor` that already have outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
	/// `None` means the provider's first page.
	pub cursor: Option<PageCursor>,
	pub skip: usize,
}

/// Natural keys already handed out within one session.
#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
	emails: HashSet<String>,
	ids: HashSet<UserId>,
}

impl ClaimSet {
	/// Returns `false` if the email was already claimed.
	pub fn claim_email(&mut self, email: &str) -> bool {
		self.emails.insert(email.to_string())
	}

	/// Returns `false` if the id was already claimed.
	pub fn claim_id(&mut self, id: UserId) -> bool {
		self.ids.insert(id)
	}
}

/// Snapshot published while importing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
	pub tally: ImportTally,
	pub expected_total: Option<u64>,
	pub pages_completed: u64,
	pub cursor: Option<PageCursor>,
}

/// Everything an import run accumulates. Survives a resumable failure so the
/// next run continues instead of starting over.
#[derive(Debug, Clone, Default)]
pub struct ImportCheckpoint {
	pub resume: ResumePoint,
	pub tally: ImportTally,
	pub ledger: ErrorLedger,
	pub expected_total: Option<u64>,
	pub pages_completed: u64,
	pub claims: ClaimSet,
}

impl ImportCheckpoint {
	pub fn new(expected_total: Option<u64>) -> Self {
		Self {
			expected_total,
			..Self::default()
		}
	}

	pub fn record(&mut self, outcome: ImportOutcome) {
		self.tally.record(&outcome);
		self.ledger.record(outcome);
	}

	/// Mark `count` more records of the current page as done.
	pub fn advance_within_page(&mut self, count: usize) {
		self.resume.skip += count;
	}

	pub fn finish_page(&mut self, next: Option<PageCursor>) {
		self.pages_completed += 1;
		self.resume = ResumePoint {
			cursor: next,
			skip: 0,
		};
	}

	pub fn progress(&self) -> ImportProgress {
		ImportProgress {
			tally: self.tally,
			expected_total: self.expected_total,
			pages_completed: self.pages_completed,
			cursor: self.resume.cursor.clone(),
		}
	}

	pub fn to_result(&self) -> ImportResult {
		ImportResult::from_parts(self.tally, self.expected_total, &self.ledger)
	}
}

#[derive(Debug, Clone)]
pub struct SessionFailure {
	pub phase: FailedPhase,
	pub kind: SessionErrorKind,
	pub message: String,
	pub resumable: bool,
	/// Work done before the failure. Absent for credential failures.
	pub partial: Option<ImportResult>,
	checkpoint: Option<ImportCheckpoint>,
}

#[derive(Debug, Clone)]
pub enum ImportPhase {
	Idle,
	CredentialsValidating,
	PreviewReady(Preview),
	Importing(ImportProgress),
	Completed(ImportResult),
	Failed(SessionFailure),
}

impl ImportPhase {
	pub fn kind(&self) -> SessionPhase {
		match self {
			ImportPhase::Idle => SessionPhase::Idle,
			ImportPhase::CredentialsValidating => SessionPhase::CredentialsValidating,
			ImportPhase::PreviewReady(_) => SessionPhase::PreviewReady,
			ImportPhase::Importing(_) => SessionPhase::Importing,
			ImportPhase::Completed(_) => SessionPhase::Completed,
			ImportPhase::Failed(_) => SessionPhase::Failed,
		}
	}
}

// =============================================================================
// Session
// =============================================================================

#[derive(Debug, Clone)]
pub struct ImportSession {
	pub id: ImportSessionId,
	pub tenant_id: TenantId,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	source_url: Option<String>,
	credential: Option<SourceCredential>,
	options: Option<ImportOptions>,
	phase: ImportPhase,
}

impl ImportSession {
	pub fn new(tenant_id: TenantId) -> Self {
		let now = Utc::now();
		Self {
			id: ImportSessionId::generate(),
			tenant_id,
			created_at: now,
			updated_at: now,
			source_url: None,
			credential: None,
			options: None,
			phase: ImportPhase::Idle,
		}
	}

	pub fn phase(&self) -> &ImportPhase {
		&self.phase
	}

	pub fn phase_kind(&self) -> SessionPhase {
		self.phase.kind()
	}

	pub fn source_url(&self) -> Option<&str> {
		self.source_url.as_deref()
	}

	pub fn credential(&self) -> Option<&SourceCredential> {
		self.credential.as_ref()
	}

	/// Options frozen when the import started.
	pub fn options(&self) -> Option<&ImportOptions> {
		self.options.as_ref()
	}

	pub fn preview(&self) -> Option<&Preview> {
		match &self.phase {
			ImportPhase::PreviewReady(preview) => Some(preview),
			_ => None,
		}
	}

	pub fn failure(&self) -> Option<&SessionFailure> {
		match &self.phase {
			ImportPhase::Failed(failure) => Some(failure),
			_ => None,
		}
	}

	/// Final result, or the partial result of a failed import.
	pub fn result(&self) -> Option<&ImportResult> {
		match &self.phase {
			ImportPhase::Completed(result) => Some(result),
			ImportPhase::Failed(failure) => failure.partial.as_ref(),
			_ => None,
		}
	}

	pub fn is_terminal(&self) -> bool {
		match &self.phase {
			ImportPhase::Completed(_) => true,
			ImportPhase::Failed(failure) => {
				failure.phase == FailedPhase::Importing && !failure.resumable
			}
			_ => false,
		}
	}

	/// Error report for a session that is not mid-import.
	pub fn error_report(&self) -> Option<ErrorLedger> {
		self
			.result()
			.map(|result| ErrorLedger::from_outcomes(result.outcomes.iter().cloned()))
	}

	/// `Idle` or a failed validation moves to `CredentialsValidating`.
	/// Credentials are taken when idle or after a credential failure.
	pub fn can_submit_credentials(&self) -> bool {
		match &self.phase {
			ImportPhase::Idle => true,
			ImportPhase::Failed(failure) => failure.phase == FailedPhase::CredentialsValidating,
			_ => false,
		}
	}

	pub fn submit_credentials(
		&mut self,
		source_url: impl Into<String>,
		credential: SourceCredential,
	) -> Result<(), TransitionError> {
		if !self.can_submit_credentials() {
			return Err(self.invalid("submit credentials"));
		}

		self.source_url = Some(source_url.into());
		self.credential = Some(credential);
		self.transition(ImportPhase::CredentialsValidating);
		Ok(())
	}

	pub fn credentials_accepted(&mut self, preview: Preview) -> Result<(), TransitionError> {
		if !matches!(self.phase, ImportPhase::CredentialsValidating) {
			return Err(self.invalid("accept credentials"));
		}
		self.transition(ImportPhase::PreviewReady(preview));
		Ok(())
	}

	pub fn credentials_rejected(
		&mut self,
		kind: SessionErrorKind,
		message: impl Into<String>,
	) -> Result<(), TransitionError> {
		if !matches!(self.phase, ImportPhase::CredentialsValidating) {
			return Err(self.invalid("reject credentials"));
		}
		self.credential = None;
		self.transition(ImportPhase::Failed(SessionFailure {
			phase: FailedPhase::CredentialsValidating,
			kind,
			message: message.into(),
			resumable: false,
			partial: None,
			checkpoint: None,
		}));
		Ok(())
	}

	/// Operator confirmation. `options` cannot change afterwards.
	pub fn start_import(&mut self, options: ImportOptions) -> Result<(), TransitionError> {
		if !matches!(self.phase, ImportPhase::PreviewReady(_)) {
			return Err(self.invalid("start an import"));
		}
		self.options = Some(options);
		self.transition(ImportPhase::Importing(ImportProgress::default()));
		Ok(())
	}

	pub fn record_progress(&mut self, progress: ImportProgress) -> Result<(), TransitionError> {
		match &mut self.phase {
			ImportPhase::Importing(current) => {
				*current = progress;
				self.updated_at = Utc::now();
				Ok(())
			}
			_ => Err(self.invalid("record progress")),
		}
	}

	pub fn complete(&mut self, result: ImportResult) -> Result<(), TransitionError> {
		if !matches!(self.phase, ImportPhase::Importing(_)) {
			return Err(self.invalid("complete"));
		}
		self.credential = None;
		self.transition(ImportPhase::Completed(result));
		Ok(())
	}

	/// Stop the import. Resumability follows from `kind`; a resumable failure
	/// keeps the checkpoint and the credential for [`ImportSession::resume`].
	pub fn fail_import(
		&mut self,
		kind: SessionErrorKind,
		message: impl Into<String>,
		checkpoint: ImportCheckpoint,
	) -> Result<(), TransitionError> {
		if !matches!(self.phase, ImportPhase::Importing(_)) {
			return Err(self.invalid("fail the import"));
		}

		let resumable = kind.is_resumable();
		if !resumable {
			self.credential = None;
		}
		let partial = checkpoint.to_result();
		self.transition(ImportPhase::Failed(SessionFailure {
			phase: FailedPhase::Importing,
			kind,
			message: message.into(),
			resumable,
			partial: Some(partial),
			checkpoint: resumable.then_some(checkpoint),
		}));
		Ok(())
	}

	/// Move a resumable failure back to `Importing`, handing out the checkpoint.
	pub fn resume(&mut self) -> Result<ImportCheckpoint, TransitionError> {
		let failure = match &mut self.phase {
			ImportPhase::Failed(failure) if failure.phase == FailedPhase::Importing => failure,
			_ => return Err(self.invalid("resume")),
		};
		if !failure.resumable || self.credential.is_none() {
			return Err(TransitionError::NotResumable(failure.kind));
		}
		let checkpoint = match failure.checkpoint.take() {
			Some(checkpoint) => checkpoint,
			None => return Err(TransitionError::NotResumable(failure.kind)),
		};

		self.transition(ImportPhase::Importing(checkpoint.progress()));
		Ok(checkpoint)
	}

	fn invalid(&self, action: &'static str) -> TransitionError {
		TransitionError::InvalidTransition {
			from: self.phase_kind(),
			action,
		}
	}

	fn transition(&mut self, next: ImportPhase) {
		let from = self.phase_kind();
		self.phase = next;
		self.updated_at = Utc::now();
		tracing::debug!(
			session_id = %self.id,
			tenant_id = %self.tenant_id,
			from = %from,
			to = %self.phase_kind(),
			"import session transition"
		);
	}
}
