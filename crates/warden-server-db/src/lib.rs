// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # warden-server-db
//!
//! Persistence for the Warden server using SQLite via sqlx.
//!
//! ## Repository Pattern
//!
//! Each domain has a `*Store` trait (the seam the import pipeline depends on)
//! and a `*Repository` struct holding a `SqlitePool` whose inherent methods
//! the trait impl delegates to.
//!
//! | Store | Purpose |
//! |-------|---------|
//! | [`UserStore`] | tenant users and linked identities, the import destination |
//! | [`ImportArchiveStore`] | summaries and error ledgers of stopped import sessions |
//!
//! Lookups where absence is normal return `Result<Option<T>>`. Unique
//! constraint losses during an import upsert are reported as
//! [`UpsertOutcome`] values rather than errors.
//!
//! ## Testing
//!
//! Tests run against a single-connection in-memory pool with the embedded
//! migrations applied.

pub mod archive;
mod error;
mod migrations;
pub mod pool;
pub mod user;

#[cfg(test)]
pub mod testing;

pub use archive::{
	ArchivedSession, ArchivedSessionSummary, ImportArchiveRepository, ImportArchiveStore,
};
pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use user::{StoredUser, UpsertOutcome, UserRepository, UserStore};
