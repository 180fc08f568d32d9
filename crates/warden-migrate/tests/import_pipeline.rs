// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end import runs against a scripted source and a SQLite destination.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use warden_migrate::{
	AbortSignal, BatchWriter, NoopObserver, OrchestratorError, OrchestratorSettings, ProgressObserver,
};
use warden_migrate_core::{
	map_record, Decision, FailReason, FailedPhase, ImportOptions, ImportOutcome, ImportPhase, ImportSession,
	ImportSessionId, OAuthLink, OutcomeStatus, SessionErrorKind, SessionPhase, SkipReason,
	SourceCredential, TenantId, TransitionError, UserId,
};
use warden_migrate_source::SourceError;
use warden_server_db::{UserRepository, UserStore};

async fn ready_session(
	orchestrator: &warden_migrate::ImportOrchestrator,
	tenant_id: TenantId,
) -> ImportSession {
	let mut session = ImportSession::new(tenant_id);
	orchestrator
		.submit_credentials(&mut session, SOURCE_URL, credential(), &NoopObserver)
		.await
		.unwrap();
	assert_eq!(session.phase_kind(), SessionPhase::PreviewReady);
	session
}

fn result_of(session: &ImportSession) -> &warden_migrate_core::ImportResult {
	session.result().expect("session should be completed")
}

// =============================================================================
// Credentials and preview
// =============================================================================

/// Purpose: a rejected key lands in a retryable credential failure without
/// keeping the key, and a corrected key reaches the preview.
#[tokio::test]
async fn rejected_credential_can_be_corrected() {
	let source = Arc::new(FakeSource::new(vec![vec![user("1", "a@x.io")]]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let orchestrator = orchestrator(source, store);
	let mut session = ImportSession::new(TenantId::generate());

	orchestrator
		.submit_credentials(&mut session, SOURCE_URL, SourceCredential::new("wrong"), &NoopObserver)
		.await
		.unwrap();
	let failure = session.failure().unwrap();
	assert_eq!(failure.kind, SessionErrorKind::InvalidCredential);
	assert!(!failure.resumable);
	assert!(session.credential().is_none());

	orchestrator
		.submit_credentials(&mut session, SOURCE_URL, credential(), &NoopObserver)
		.await
		.unwrap();
	let preview = session.preview().unwrap();
	assert_eq!(preview.total_count, Some(1));
	assert_eq!(preview.sample[0].email, "a@x.io");
}

/// Purpose: preview is capped and never writes to the destination.
#[tokio::test]
async fn preview_is_capped_and_read_only() {
	let records = (0..20).map(|i| user(&i.to_string(), &format!("u{i}@x.io"))).collect();
	let source = Arc::new(FakeSource::new(vec![records]));
	let pool = migrated_pool().await;
	let store = Arc::new(UserRepository::new(pool));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source, store.clone());

	let preview = orchestrator.preview(SOURCE_URL, &credential(), 50).await.unwrap();
	assert_eq!(preview.sample.len(), 5);
	assert_eq!(preview.total_count, Some(20));
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 0);
}

#[tokio::test]
async fn source_user_lookup() {
	let source = Arc::new(FakeSource::new(vec![vec![user("7", "seven@x.io")]]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let orchestrator = orchestrator(source, store);

	let found = orchestrator.source_user(SOURCE_URL, &credential(), "7").await.unwrap();
	assert_eq!(found.unwrap().email.as_deref(), Some("seven@x.io"));
	assert!(orchestrator
		.source_user(SOURCE_URL, &credential(), "8")
		.await
		.unwrap()
		.is_none());

	let err = orchestrator
		.validate_connection(SOURCE_URL, &SourceCredential::new("nope"))
		.await
		.unwrap_err();
	assert!(matches!(err, SourceError::InvalidCredential));
}

// =============================================================================
// Import runs
// =============================================================================

/// Purpose: three fresh users with default options all import and land as
/// reset-required accounts.
#[tokio::test]
async fn fresh_users_all_import() {
	let source = Arc::new(FakeSource::new(vec![vec![
		user("1", "a@x.io"),
		user("2", "b@x.io"),
		user("3", "C@X.io"),
	]]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source, store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.skipped, result.failed), (3, 0, 0));
	assert_eq!(result.total_users, 3);
	assert_eq!(result.expected_total, Some(3));
	assert!(result.outcomes.is_empty());
	assert!(result.is_balanced());
	assert!(session.credential().is_none());

	let stored = store.get_user_by_email(&tenant_id, "c@x.io").await.unwrap().unwrap();
	assert!(stored.must_reset_password);
	assert_eq!(stored.display_email, "C@X.io");
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 3);
}

/// Purpose: with skip_existing a pre-existing email is skipped and recorded;
/// the existing row is left alone.
#[tokio::test]
async fn existing_email_is_skipped() {
	let pool = migrated_pool().await;
	let tenant_id = TenantId::generate();
	let native_id = UserId::generate();
	insert_native_user(&pool, &tenant_id, &native_id, "taken@x.io").await;

	let source = Arc::new(FakeSource::new(vec![vec![user("1", "new@x.io"), user("2", "Taken@x.io")]]));
	let store = Arc::new(UserRepository::new(pool));
	let orchestrator = orchestrator(source, store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;

	let options = ImportOptions {
		skip_existing: true,
		..ImportOptions::default()
	};
	orchestrator
		.run(&mut session, options, &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.skipped, result.failed), (1, 1, 0));
	assert_eq!(result.outcomes.len(), 1);
	assert_eq!(result.outcomes[0].source_id, "2");
	assert_eq!(
		result.outcomes[0].status,
		OutcomeStatus::Skipped {
			reason: SkipReason::AlreadyExists
		}
	);

	let existing = store.get_user_by_email(&tenant_id, "taken@x.io").await.unwrap().unwrap();
	assert_eq!(existing.id, native_id);
	assert!(existing.provenance.is_none());
}

/// Purpose: without skip_existing the same clash is a failure.
#[tokio::test]
async fn existing_email_fails_without_skip() {
	let pool = migrated_pool().await;
	let tenant_id = TenantId::generate();
	insert_native_user(&pool, &tenant_id, &UserId::generate(), "taken@x.io").await;

	let source = Arc::new(FakeSource::new(vec![vec![user("1", "taken@x.io")]]));
	let orchestrator = orchestrator(source, Arc::new(UserRepository::new(pool)));
	let mut session = ready_session(&orchestrator, tenant_id).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!(result.failed, 1);
	assert_eq!(result.outcomes[0].reason_code(), Some("email_collision"));
}

/// Purpose: a page failure after the first page leaves a resumable failure
/// holding only page one; resuming finishes pages two and three without
/// fetching page one again.
#[tokio::test]
async fn page_failure_then_resume() {
	let source = Arc::new(FakeSource::new(vec![
		vec![user("1", "a@x.io"), user("2", "b@x.io")],
		vec![user("3", "c@x.io"), user("4", "d@x.io")],
		vec![user("5", "e@x.io")],
	]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source.clone(), store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;
	let abort = AbortSignal::new();

	source.fail_once_at(
		1,
		SourceError::Api {
			status: 503,
			message: "maintenance".to_string(),
		},
	);
	let before = source.fetched_pages().len();

	orchestrator
		.run(&mut session, ImportOptions::default(), &abort, &NoopObserver)
		.await
		.unwrap();

	let failure = session.failure().unwrap();
	assert_eq!(failure.kind, SessionErrorKind::SourceUnavailable);
	assert!(failure.resumable);
	let partial = failure.partial.as_ref().unwrap();
	assert_eq!((partial.imported, partial.total_users), (2, 2));
	assert!(session.credential().is_some());

	orchestrator.resume(&mut session, &abort, &NoopObserver).await.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.skipped, result.failed), (5, 0, 0));
	assert_eq!(result.total_users, 5);
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 5);
	assert_eq!(&source.fetched_pages()[before..], &[0, 1, 2]);
}

/// Purpose: a page that outlives the page timeout fails the import as a
/// resumable source timeout; resuming refetches that page.
#[tokio::test]
async fn slow_page_times_out_resumably() {
	let source = Arc::new(FakeSource::new(vec![
		vec![user("1", "a@x.io")],
		vec![user("2", "b@x.io")],
	]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let settings = OrchestratorSettings {
		page_timeout: Duration::from_millis(200),
		..OrchestratorSettings::default()
	};
	let orchestrator = orchestrator_with(source.clone(), store.clone(), settings);
	let mut session = ready_session(&orchestrator, tenant_id).await;
	let abort = AbortSignal::new();
	source.stall_once_at(1, Duration::from_secs(30));

	orchestrator
		.run(&mut session, ImportOptions::default(), &abort, &NoopObserver)
		.await
		.unwrap();

	assert_eq!(session.phase_kind(), SessionPhase::Failed);
	let failure = session.failure().unwrap();
	assert_eq!(failure.kind, SessionErrorKind::SourceTimeout);
	assert_eq!(failure.phase, FailedPhase::Importing);
	assert!(failure.resumable);
	assert_eq!(failure.partial.as_ref().unwrap().imported, 1);

	orchestrator.resume(&mut session, &abort, &NoopObserver).await.unwrap();
	assert_eq!(result_of(&session).imported, 2);
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 2);
}

/// Purpose: a write that outlives the write timeout fails only that record;
/// the rest of the batch imports and the session completes.
#[tokio::test]
async fn slow_write_fails_one_record() {
	let pool = migrated_pool().await;
	let store = Arc::new(SlowStore::slow_writes(
		UserRepository::new(pool),
		"slow@x.io",
		Duration::from_secs(30),
	));
	let source = Arc::new(FakeSource::new(vec![vec![
		user("1", "a@x.io"),
		user("2", "slow@x.io"),
		user("3", "c@x.io"),
	]]));
	let tenant_id = TenantId::generate();
	let settings = OrchestratorSettings {
		write_timeout: Duration::from_millis(500),
		..OrchestratorSettings::default()
	};
	let orchestrator = orchestrator_with(source, store.clone(), settings);
	let mut session = ready_session(&orchestrator, tenant_id).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.skipped, result.failed), (2, 0, 1));
	assert_eq!(result.outcomes[0].source_id, "2");
	assert_eq!(result.outcomes[0].reason_code(), Some("write_error"));
	assert!(result.is_balanced());
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 2);
}

/// Purpose: a destination lookup that outlives the write timeout fails only
/// that record as write_error.
#[tokio::test]
async fn slow_lookup_fails_one_record() {
	let pool = migrated_pool().await;
	let store = Arc::new(SlowStore::slow_lookups(
		UserRepository::new(pool),
		"slow@x.io",
		Duration::from_secs(30),
	));
	let source = Arc::new(FakeSource::new(vec![vec![user("1", "slow@x.io"), user("2", "b@x.io")]]));
	let tenant_id = TenantId::generate();
	let settings = OrchestratorSettings {
		write_timeout: Duration::from_millis(500),
		..OrchestratorSettings::default()
	};
	let orchestrator = orchestrator_with(source, store.clone(), settings);
	let mut session = ready_session(&orchestrator, tenant_id).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.failed), (1, 1));
	assert_eq!(result.outcomes[0].source_id, "1");
	assert_eq!(result.outcomes[0].reason_code(), Some("write_error"));
	assert!(store.get_user_by_email(&tenant_id, "b@x.io").await.unwrap().is_some());
}

/// Purpose: a credential revoked mid-import is not resumable.
#[tokio::test]
async fn revoked_credential_is_final() {
	let source = Arc::new(FakeSource::new(vec![
		vec![user("1", "a@x.io")],
		vec![user("2", "b@x.io")],
	]));
	let orchestrator = orchestrator(source.clone(), Arc::new(UserRepository::new(migrated_pool().await)));
	let mut session = ready_session(&orchestrator, TenantId::generate()).await;
	let abort = AbortSignal::new();
	source.fail_once_at(1, SourceError::InvalidCredential);

	orchestrator
		.run(&mut session, ImportOptions::default(), &abort, &NoopObserver)
		.await
		.unwrap();

	let failure = session.failure().unwrap();
	assert_eq!(failure.kind, SessionErrorKind::InvalidCredential);
	assert!(!failure.resumable);
	assert!(session.credential().is_none());

	let err = orchestrator.resume(&mut session, &abort, &NoopObserver).await.unwrap_err();
	assert!(matches!(
		err,
		OrchestratorError::Transition(TransitionError::NotResumable(SessionErrorKind::InvalidCredential))
	));
}

/// Purpose: an id that already belongs to another email fails only that
/// record when ids are preserved.
#[tokio::test]
async fn preserved_id_collision_fails_one_record() {
	let pool = migrated_pool().await;
	let tenant_id = TenantId::generate();
	let taken = UserId::generate();
	insert_native_user(&pool, &tenant_id, &taken, "owner@x.io").await;

	let free_a = UserId::generate();
	let free_b = UserId::generate();
	let source = Arc::new(FakeSource::new(vec![vec![
		user(&free_a.to_string(), "a@x.io"),
		user(&taken.to_string(), "intruder@x.io"),
		user(&free_b.to_string(), "b@x.io"),
	]]));
	let store = Arc::new(UserRepository::new(pool));
	let orchestrator = orchestrator(source, store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;

	let options = ImportOptions {
		preserve_ids: true,
		..ImportOptions::default()
	};
	orchestrator
		.run(&mut session, options, &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.failed), (2, 1));
	assert_eq!(result.outcomes[0].email, "intruder@x.io");
	assert_eq!(
		result.outcomes[0].status,
		OutcomeStatus::Failed {
			reason: FailReason::IdCollision
		}
	);
	assert_eq!(store.get_user_by_id(&tenant_id, &free_a).await.unwrap().unwrap().email, "a@x.io");
	assert_eq!(store.get_user_by_id(&tenant_id, &taken).await.unwrap().unwrap().email, "owner@x.io");
}

/// Purpose: bad source records fail individually and the rest of the batch
/// still imports.
#[tokio::test]
async fn invalid_records_fail_individually() {
	let mut missing = user("2", "");
	missing.email = None;
	let source = Arc::new(FakeSource::new(vec![vec![
		user("1", "ok@x.io"),
		missing,
		user("3", "not-an-email"),
		user("4", "also-ok@x.io"),
	]]));
	let orchestrator = orchestrator(source, Arc::new(UserRepository::new(migrated_pool().await)));
	let mut session = ready_session(&orchestrator, TenantId::generate()).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.failed), (2, 2));
	assert!(result
		.outcomes
		.iter()
		.all(|o| o.reason_code() == Some("invalid_record")));
	assert!(result.is_balanced());
}

/// Purpose: two source users sharing an email produce one account; the
/// second is reported.
#[tokio::test]
async fn duplicate_source_emails_import_once() {
	let source = Arc::new(FakeSource::new(vec![
		vec![user("1", "dup@x.io")],
		vec![user("2", "DUP@x.io")],
	]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source, store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.failed), (1, 1));
	assert_eq!(result.outcomes[0].source_id, "2");
	assert_eq!(result.outcomes[0].reason_code(), Some("email_collision"));
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 1);
}

/// Purpose: a store error fails that record as write_error and the import
/// still completes.
#[tokio::test]
async fn write_errors_are_per_record() {
	let pool = migrated_pool().await;
	let store = Arc::new(FlakyStore::new(UserRepository::new(pool), &["bad@x.io"]));
	let source = Arc::new(FakeSource::new(vec![vec![user("1", "good@x.io"), user("2", "bad@x.io")]]));
	let orchestrator = orchestrator(source, store);
	let mut session = ready_session(&orchestrator, TenantId::generate()).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.failed), (1, 1));
	assert_eq!(result.outcomes[0].reason_code(), Some("write_error"));

	let csv = String::from_utf8(session.error_report().unwrap().export().unwrap()).unwrap();
	assert_eq!(csv, "\"email\",\"reason\"\n\"bad@x.io\",\"write_error\"\n");
}

/// Purpose: OAuth links and metadata are carried only when asked for.
#[tokio::test]
async fn oauth_and_metadata_follow_options() {
	let mut linked = user("1", "linked@x.io");
	linked.oauth_links = vec![OAuthLink::new("github", "gh-1"), OAuthLink::new("google", "g-1")];
	linked.metadata = Some(serde_json::json!({"plan": "pro"}));
	let source = Arc::new(FakeSource::new(vec![vec![linked]]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source, store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;

	let options = ImportOptions {
		preserve_oauth: true,
		import_metadata: true,
		..ImportOptions::default()
	};
	orchestrator
		.run(&mut session, options, &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let stored = store.get_user_by_email(&tenant_id, "linked@x.io").await.unwrap().unwrap();
	assert_eq!(stored.metadata, Some(serde_json::json!({"plan": "pro"})));
	let mut links = store.get_identities_for_user(&tenant_id, &stored.id).await.unwrap();
	links.sort_by(|a, b| a.provider.cmp(&b.provider));
	assert_eq!(links, vec![OAuthLink::new("github", "gh-1"), OAuthLink::new("google", "g-1")]);
}

/// Purpose: two source users claiming the same provider identity never both
/// report as imported; the one that loses the link fails as write_error.
#[tokio::test]
async fn shared_oauth_identity_fails_the_second_user() {
	let mut first = user("1", "first@x.io");
	first.oauth_links = vec![OAuthLink::new("github", "gh-shared")];
	let mut second = user("2", "second@x.io");
	second.oauth_links = vec![OAuthLink::new("github", "gh-shared")];
	let source = Arc::new(FakeSource::new(vec![vec![first], vec![second]]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source, store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;

	let options = ImportOptions {
		preserve_oauth: true,
		..ImportOptions::default()
	};
	orchestrator
		.run(&mut session, options, &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!((result.imported, result.failed), (1, 1));
	assert_eq!(result.outcomes[0].source_id, "2");
	assert_eq!(result.outcomes[0].reason_code(), Some("write_error"));
	assert!(result.is_balanced());

	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 1);
	assert!(store.get_user_by_email(&tenant_id, "second@x.io").await.unwrap().is_none());
	let owner = store.get_user_by_email(&tenant_id, "first@x.io").await.unwrap().unwrap();
	assert_eq!(
		store.get_identities_for_user(&tenant_id, &owner.id).await.unwrap(),
		vec![OAuthLink::new("github", "gh-shared")]
	);
}

/// Purpose: an operator abort stops between batches and resume continues
/// where it left off.
#[tokio::test]
async fn abort_then_resume() {
	let abort = AbortSignal::new();
	let source = Arc::new(FakeSource::new(vec![
		vec![user("1", "a@x.io")],
		vec![user("2", "b@x.io")],
	]));
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let orchestrator = orchestrator(source.clone(), store.clone());
	let mut session = ready_session(&orchestrator, tenant_id).await;
	source.abort_once_at(1, abort.clone());

	orchestrator
		.run(&mut session, ImportOptions::default(), &abort, &NoopObserver)
		.await
		.unwrap();

	let failure = session.failure().unwrap();
	assert_eq!(failure.kind, SessionErrorKind::Aborted);
	assert!(failure.resumable);
	assert_eq!(failure.partial.as_ref().unwrap().imported, 1);
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 1);

	abort.reset();
	orchestrator.resume(&mut session, &abort, &NoopObserver).await.unwrap();
	assert_eq!(result_of(&session).imported, 2);
}

/// Purpose: options are checked before the session leaves the preview.
#[tokio::test]
async fn oversized_batch_is_rejected_up_front() {
	let source = Arc::new(FakeSource::new(vec![vec![user("1", "a@x.io")]]));
	let orchestrator = orchestrator(source, Arc::new(UserRepository::new(migrated_pool().await)));
	let mut session = ready_session(&orchestrator, TenantId::generate()).await;

	let options = ImportOptions {
		batch_size: 5000,
		..ImportOptions::default()
	};
	let err = orchestrator
		.run(&mut session, options, &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap_err();
	assert!(matches!(err, OrchestratorError::Options(_)));
	assert_eq!(session.phase_kind(), SessionPhase::PreviewReady);
}

/// Purpose: without a provider count the total is what was processed.
#[tokio::test]
async fn missing_count_uses_processed_total() {
	let source = Arc::new(
		FakeSource::new(vec![vec![user("1", "a@x.io"), user("2", "b@x.io")]]).without_count(),
	);
	let orchestrator = orchestrator(source, Arc::new(UserRepository::new(migrated_pool().await)));
	let mut session = ready_session(&orchestrator, TenantId::generate()).await;

	orchestrator
		.run(&mut session, ImportOptions::default(), &AbortSignal::new(), &NoopObserver)
		.await
		.unwrap();

	let result = result_of(&session);
	assert_eq!(result.expected_total, None);
	assert_eq!(result.total_users, 2);
}

/// Purpose: small batches publish progress after each one.
#[tokio::test]
async fn progress_is_published_per_batch() {
	struct Recorder(std::sync::Mutex<Vec<u64>>);
	impl ProgressObserver for Recorder {
		fn on_update(&self, session: &ImportSession) {
			if let ImportPhase::Importing(progress) = session.phase() {
				self.0.lock().unwrap().push(progress.tally.processed());
			}
		}
	}

	let records = (0..5).map(|i| user(&i.to_string(), &format!("u{i}@x.io"))).collect();
	let source = Arc::new(FakeSource::new(vec![records]));
	let orchestrator = orchestrator(source, Arc::new(UserRepository::new(migrated_pool().await)));
	let mut session = ready_session(&orchestrator, TenantId::generate()).await;
	let recorder = Recorder(std::sync::Mutex::new(Vec::new()));

	let options = ImportOptions {
		batch_size: 2,
		..ImportOptions::default()
	};
	orchestrator
		.run(&mut session, options, &AbortSignal::new(), &recorder)
		.await
		.unwrap();

	let seen = recorder.0.lock().unwrap().clone();
	assert_eq!(seen.first(), Some(&0));
	assert!(seen.contains(&2));
	assert!(seen.contains(&4));
	assert_eq!(seen.last(), Some(&5));
}

// =============================================================================
// Writer
// =============================================================================

/// Purpose: replaying a written batch within the same session yields the same
/// rows and the same outcomes.
#[tokio::test]
async fn batch_replay_is_idempotent() {
	let store = Arc::new(UserRepository::new(migrated_pool().await));
	let tenant_id = TenantId::generate();
	let session_id = ImportSessionId::generate();
	let writer = BatchWriter::new(store.clone(), tenant_id, 4, std::time::Duration::from_secs(5));
	let options = ImportOptions::default();

	let mapped: Vec<_> = ["a@x.io", "b@x.io"]
		.iter()
		.enumerate()
		.map(|(i, email)| map_record(&user(&i.to_string(), email), &options, session_id).unwrap())
		.collect();
	let batch = || {
		mapped
			.iter()
			.map(|record| (record.clone(), Decision::Create { target: record.id }))
			.collect::<Vec<_>>()
	};

	let mut first = writer.write_batch(batch()).await;
	let mut second = writer.write_batch(batch()).await;
	let key = |o: &ImportOutcome| o.source_id.clone();
	first.sort_by_key(key);
	second.sort_by_key(key);

	assert_eq!(first, second);
	assert!(first.iter().all(ImportOutcome::is_imported));
	assert_eq!(store.count_users(&tenant_id).await.unwrap(), 2);
}
