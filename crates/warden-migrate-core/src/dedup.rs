// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Duplicate resolution against the destination store.
//!
//! [`resolve`] is pure: the caller performs the lookups and hands the rows in.
//! The store's unique constraints remain the final word, since another writer
//! can land between the lookup and the upsert.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::options::ImportOptions;
use crate::outcome::Decision;
use crate::reason::{FailReason, SkipReason};
use crate::record::{MappedUserRecord, Provenance};

/// A destination user as seen by dedup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingUser {
	pub id: UserId,
	/// Normalized email.
	pub email: String,
	/// Set when the row was written by an import.
	pub provenance: Option<Provenance>,
}

/// Destination rows matching a mapped record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationLookup {
	pub by_email: Option<ExistingUser>,
	/// Only consulted with `preserve_ids`.
	pub by_id: Option<ExistingUser>,
}

impl DestinationLookup {
	pub fn empty() -> Self {
		Self::default()
	}
}

/// Decide what to do with `record`.
///
/// Email is checked before id. A row carrying this record's own provenance is
/// a leftover of an interrupted attempt of the same session and is rewritten in
/// place, which keeps retried batches free of duplicates.
pub fn resolve(
	record: &MappedUserRecord,
	lookup: &DestinationLookup,
	options: &ImportOptions,
) -> Decision {
	if let Some(existing) = &lookup.by_email {
		if existing.provenance.as_ref() == Some(&record.provenance) {
			return Decision::Create {
				target: existing.id,
			};
		}
		if options.skip_existing {
			return Decision::Skip(SkipReason::AlreadyExists);
		}
		return Decision::Fail(FailReason::EmailCollision);
	}

	if options.preserve_ids {
		if let Some(existing) = &lookup.by_id {
			if existing.email != record.email {
				return Decision::Fail(FailReason::IdCollision);
			}
		}
	}

	Decision::Create { target: record.id }
}
