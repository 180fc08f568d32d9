// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # warden-migrate-core
//!
//! Pure domain model for importing a user population from an external identity
//! provider into a tenant's user store.
//!
//! Nothing in this crate performs I/O. The connector, the destination store and
//! the orchestrator live in sibling crates and exchange the types defined here:
//!
//! - [`SourceUserRecord`] is what the provider hands us
//! - [`map_record`] turns it into a [`MappedUserRecord`]
//! - [`resolve`] decides create / skip / fail against a [`DestinationLookup`]
//! - every record ends as exactly one [`ImportOutcome`]
//! - skipped and failed outcomes accumulate in the [`ErrorLedger`]
//! - [`ImportSession`] tracks the wizard phases of one migration

pub mod credential;
pub mod dedup;
pub mod ids;
pub mod ledger;
pub mod mapper;
pub mod options;
pub mod outcome;
pub mod reason;
pub mod record;
pub mod result;
pub mod session;

pub use credential::SourceCredential;
pub use dedup::{resolve, DestinationLookup, ExistingUser};
pub use ids::{ImportSessionId, TenantId, UserId};
pub use ledger::{ErrorLedger, LedgerError};
pub use mapper::{map_record, normalize_email, MapError};
pub use options::{ImportOptions, OptionsError, DEFAULT_BATCH_SIZE};
pub use outcome::{Decision, ImportOutcome, OutcomeStatus};
pub use reason::{FailReason, SkipReason};
pub use record::{MappedUserRecord, OAuthLink, PageCursor, PreviewRow, Provenance, SourceUserRecord};
pub use result::{ImportResult, ImportTally};
pub use session::{
	ClaimSet, FailedPhase, ImportCheckpoint, ImportPhase, ImportProgress, ImportSession, Preview,
	ResumePoint, SessionErrorKind, SessionFailure, SessionPhase, TransitionError,
};
