// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session driver: credential validation, preview and the paged import loop.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use warden_migrate_core::{
	map_record, ClaimSet, Decision, FailReason, ImportCheckpoint, ImportOptions, ImportOutcome,
	ImportSession, ImportSessionId, MappedUserRecord, OptionsError, Preview, SessionErrorKind,
	SkipReason, SourceCredential, SourceUserRecord, TransitionError,
};
use warden_migrate_source::{ConnectorFactory, PreviewSampler, SourceConnector, SourceError};
use warden_server_db::UserStore;

use crate::abort::AbortSignal;
use crate::observer::ProgressObserver;
use crate::resolver::DedupResolver;
use crate::writer::BatchWriter;

pub const MAX_WRITE_CONCURRENCY: usize = 32;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
	#[error(transparent)]
	Transition(#[from] TransitionError),

	#[error(transparent)]
	Options(#[from] OptionsError),

	#[error("session has no source credential")]
	MissingCredential,
}

/// Limits applied to every session this orchestrator drives.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
	pub max_batch_size: usize,
	pub write_concurrency: usize,
	pub page_timeout: Duration,
	pub write_timeout: Duration,
	pub preview_sample_size: usize,
}

impl Default for OrchestratorSettings {
	fn default() -> Self {
		Self {
			max_batch_size: 1000,
			write_concurrency: 8,
			page_timeout: Duration::from_secs(30),
			write_timeout: Duration::from_secs(10),
			preview_sample_size: 5,
		}
	}
}

// =============================================================================
// Orchestrator
// =============================================================================

#[derive(Clone)]
pub struct ImportOrchestrator {
	factory: Arc<dyn ConnectorFactory>,
	store: Arc<dyn UserStore>,
	settings: OrchestratorSettings,
}

impl ImportOrchestrator {
	pub fn new(
		factory: Arc<dyn ConnectorFactory>,
		store: Arc<dyn UserStore>,
		mut settings: OrchestratorSettings,
	) -> Self {
		settings.write_concurrency = settings.write_concurrency.clamp(1, MAX_WRITE_CONCURRENCY);
		settings.max_batch_size = settings.max_batch_size.max(1);
		Self {
			factory,
			store,
			settings,
		}
	}

	pub fn settings(&self) -> &OrchestratorSettings {
		&self.settings
	}

	/// Probe the source with the credential. Nothing is read beyond the probe.
	#[instrument(skip(self, credential))]
	pub async fn validate_connection(
		&self,
		source_url: &str,
		credential: &SourceCredential,
	) -> std::result::Result<(), SourceError> {
		let connector = self.factory.connect(source_url, credential)?;
		connector.validate().await
	}

	/// Sample of up to `sample_size` source users plus the provider's count.
	#[instrument(skip(self, credential))]
	pub async fn preview(
		&self,
		source_url: &str,
		credential: &SourceCredential,
		sample_size: usize,
	) -> std::result::Result<Preview, SourceError> {
		let connector = self.factory.connect(source_url, credential)?;
		let n = sample_size.min(self.settings.preview_sample_size);
		PreviewSampler::new(connector.as_ref()).preview(n).await
	}

	/// Single source user by provider id, for operator spot checks.
	#[instrument(skip(self, credential))]
	pub async fn source_user(
		&self,
		source_url: &str,
		credential: &SourceCredential,
		source_id: &str,
	) -> std::result::Result<Option<SourceUserRecord>, SourceError> {
		let connector = self.factory.connect(source_url, credential)?;
		connector.fetch_user(source_id).await
	}

	/// Validate the credential and build the preview, moving the session to
	/// `PreviewReady` or to a credential failure the operator can retry.
	#[instrument(skip_all, fields(session_id = %session.id, tenant_id = %session.tenant_id))]
	pub async fn submit_credentials(
		&self,
		session: &mut ImportSession,
		source_url: &str,
		credential: SourceCredential,
		observer: &dyn ProgressObserver,
	) -> Result<()> {
		session.submit_credentials(source_url, credential.clone())?;
		observer.on_update(session);

		match self.probe(source_url, &credential).await {
			Ok(preview) => {
				tracing::info!(
					total_count = ?preview.total_count,
					sample = preview.sample.len(),
					"source credential accepted"
				);
				session.credentials_accepted(preview)?;
			}
			Err(e) => {
				let kind = match e.session_error_kind() {
					SessionErrorKind::InvalidCredential => SessionErrorKind::InvalidCredential,
					_ => SessionErrorKind::Unreachable,
				};
				tracing::warn!(error = %e, kind = kind.as_code(), "source credential rejected");
				session.credentials_rejected(kind, e.to_string())?;
			}
		}

		observer.on_update(session);
		Ok(())
	}

	async fn probe(
		&self,
		source_url: &str,
		credential: &SourceCredential,
	) -> std::result::Result<Preview, SourceError> {
		let connector = self.factory.connect(source_url, credential)?;
		connector.validate().await?;
		PreviewSampler::new(connector.as_ref())
			.preview(self.settings.preview_sample_size)
			.await
	}

	/// Confirm and run the import to a terminal phase.
	///
	/// Invalid options or a session outside `PreviewReady` are rejected
	/// without touching the session. Source and write failures end up in the
	/// session, not in the returned error.
	#[instrument(skip_all, fields(session_id = %session.id, tenant_id = %session.tenant_id))]
	pub async fn run(
		&self,
		session: &mut ImportSession,
		options: ImportOptions,
		abort: &AbortSignal,
		observer: &dyn ProgressObserver,
	) -> Result<()> {
		options.validate(self.settings.max_batch_size)?;
		if session.credential().is_none() {
			return Err(OrchestratorError::MissingCredential);
		}
		session.start_import(options)?;
		observer.on_update(session);

		let connector = match self.connect(session) {
			Ok(connector) => connector,
			Err(e) => {
				return self.stop(session, e.session_error_kind(), e.to_string(), ImportCheckpoint::new(None), observer);
			}
		};

		let expected_total = connector.count().await;
		tracing::info!(expected_total = ?expected_total, "import started");
		self.drive(session, connector.as_ref(), ImportCheckpoint::new(expected_total), abort, observer)
			.await
	}

	/// Continue a resumable failure from its checkpoint.
	#[instrument(skip_all, fields(session_id = %session.id, tenant_id = %session.tenant_id))]
	pub async fn resume(
		&self,
		session: &mut ImportSession,
		abort: &AbortSignal,
		observer: &dyn ProgressObserver,
	) -> Result<()> {
		let checkpoint = session.resume()?;
		observer.on_update(session);
		tracing::info!(
			pages_completed = checkpoint.pages_completed,
			processed = checkpoint.tally.processed(),
			"import resumed"
		);

		let connector = match self.connect(session) {
			Ok(connector) => connector,
			Err(e) => {
				return self.stop(session, e.session_error_kind(), e.to_string(), checkpoint, observer);
			}
		};
		self.drive(session, connector.as_ref(), checkpoint, abort, observer).await
	}

	fn connect(&self, session: &ImportSession) -> std::result::Result<Arc<dyn SourceConnector>, SourceError> {
		let source_url = session.source_url().unwrap_or_default();
		match session.credential() {
			Some(credential) => self.factory.connect(source_url, credential),
			None => Err(SourceError::InvalidCredential),
		}
	}

	async fn drive(
		&self,
		session: &mut ImportSession,
		connector: &dyn SourceConnector,
		mut checkpoint: ImportCheckpoint,
		abort: &AbortSignal,
		observer: &dyn ProgressObserver,
	) -> Result<()> {
		let options = session.options().cloned().unwrap_or_default();
		let resolver = DedupResolver::new(self.store.clone(), session.tenant_id, self.settings.write_timeout);
		let writer = BatchWriter::new(
			self.store.clone(),
			session.tenant_id,
			self.settings.write_concurrency,
			self.settings.write_timeout,
		);

		loop {
			if abort.is_aborted() {
				return self.stop(session, SessionErrorKind::Aborted, "import aborted by operator", checkpoint, observer);
			}

			let fetch = connector.page(checkpoint.resume.cursor.as_ref());
			let page = match tokio::time::timeout(self.settings.page_timeout, fetch).await {
				Ok(Ok(page)) => page,
				Ok(Err(e)) => {
					return self.stop(session, e.session_error_kind(), e.to_string(), checkpoint, observer);
				}
				Err(_) => {
					return self.stop(
						session,
						SessionErrorKind::SourceTimeout,
						"source page request timed out",
						checkpoint,
						observer,
					);
				}
			};

			let pending: Vec<SourceUserRecord> = page.records.into_iter().skip(checkpoint.resume.skip).collect();
			for batch in pending.chunks(options.batch_size) {
				if abort.is_aborted() {
					return self.stop(session, SessionErrorKind::Aborted, "import aborted by operator", checkpoint, observer);
				}

				let outcomes = self
					.process_batch(session.id, batch, &options, &mut checkpoint.claims, &resolver, &writer)
					.await;
				for outcome in outcomes {
					checkpoint.record(outcome);
				}
				checkpoint.advance_within_page(batch.len());
				session.record_progress(checkpoint.progress())?;
				observer.on_update(session);
			}

			checkpoint.finish_page(page.next);
			session.record_progress(checkpoint.progress())?;
			observer.on_update(session);
			if checkpoint.resume.cursor.is_none() {
				break;
			}
		}

		let result = checkpoint.to_result();
		tracing::info!(
			total_users = result.total_users,
			imported = result.imported,
			skipped = result.skipped,
			failed = result.failed,
			"import completed"
		);
		session.complete(result)?;
		observer.on_update(session);
		Ok(())
	}

	/// Map, claim, resolve and write one batch. Every input yields exactly one
	/// outcome.
	async fn process_batch(
		&self,
		session_id: ImportSessionId,
		records: &[SourceUserRecord],
		options: &ImportOptions,
		claims: &mut ClaimSet,
		resolver: &DedupResolver,
		writer: &BatchWriter,
	) -> Vec<ImportOutcome> {
		let mut outcomes = Vec::with_capacity(records.len());
		let mut pending = Vec::with_capacity(records.len());

		for record in records {
			let mapped = match map_record(record, options, session_id) {
				Ok(mapped) => mapped,
				Err(e) => {
					tracing::debug!(source_id = %record.source_id, error = %e, "source record rejected");
					outcomes.push(ImportOutcome::unmapped(record, e.into()));
					continue;
				}
			};

			// Two source users sharing an email: the first one wins.
			if !claims.claim_email(&mapped.email) {
				outcomes.push(if options.skip_existing {
					ImportOutcome::skipped(&mapped, SkipReason::AlreadyExists)
				} else {
					ImportOutcome::failed(&mapped, FailReason::EmailCollision)
				});
				continue;
			}
			if options.preserve_ids && !claims.claim_id(mapped.id) {
				outcomes.push(ImportOutcome::failed(&mapped, FailReason::IdCollision));
				continue;
			}
			pending.push(mapped);
		}

		let decided: Vec<(MappedUserRecord, Decision)> = stream::iter(pending)
			.map(|record| async move {
				let decision = resolver.resolve(&record, options).await;
				(record, decision)
			})
			.buffer_unordered(self.settings.write_concurrency)
			.collect()
			.await;
		let written = writer.write_batch(decided).await;

		outcomes.extend(written);
		outcomes
	}

	fn stop(
		&self,
		session: &mut ImportSession,
		kind: SessionErrorKind,
		message: impl Into<String>,
		checkpoint: ImportCheckpoint,
		observer: &dyn ProgressObserver,
	) -> Result<()> {
		let message = message.into();
		tracing::warn!(
			kind = kind.as_code(),
			resumable = kind.is_resumable(),
			processed = checkpoint.tally.processed(),
			error = %message,
			"import stopped"
		);
		session.fail_import(kind, message, checkpoint)?;
		observer.on_update(session);
		Ok(())
	}
}
