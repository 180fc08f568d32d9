// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::reason::{FailReason, SkipReason};
use crate::record::{MappedUserRecord, SourceUserRecord};

/// What to do with one mapped record, decided right before its write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
	/// Upsert the record under `target`. `target` differs from the mapped id
	/// when the row is this session's own earlier write.
	Create { target: UserId },
	Skip(SkipReason),
	Fail(FailReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
	Imported { user_id: UserId },
	Skipped { reason: SkipReason },
	Failed { reason: FailReason },
}

/// Final fate of a single source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
	pub email: String,
	pub source_id: String,
	#[serde(flatten)]
	pub status: OutcomeStatus,
}

impl ImportOutcome {
	pub fn imported(record: &MappedUserRecord, user_id: UserId) -> Self {
		Self {
			email: record.display_email.clone(),
			source_id: record.provenance.source_id.clone(),
			status: OutcomeStatus::Imported { user_id },
		}
	}

	pub fn skipped(record: &MappedUserRecord, reason: SkipReason) -> Self {
		Self {
			email: record.display_email.clone(),
			source_id: record.provenance.source_id.clone(),
			status: OutcomeStatus::Skipped { reason },
		}
	}

	pub fn failed(record: &MappedUserRecord, reason: FailReason) -> Self {
		Self {
			email: record.display_email.clone(),
			source_id: record.provenance.source_id.clone(),
			status: OutcomeStatus::Failed { reason },
		}
	}

	/// Failure for a record that never made it through the mapper. The raw
	/// email has its control characters replaced so report rows stay on one line.
	pub fn unmapped(record: &SourceUserRecord, reason: FailReason) -> Self {
		Self {
			email: scrub_control(record.raw_email().trim()),
			source_id: record.source_id.clone(),
			status: OutcomeStatus::Failed { reason },
		}
	}

	/// Outcome for a decision that needs no write.
	pub fn from_decision(record: &MappedUserRecord, decision: &Decision) -> Option<Self> {
		match decision {
			Decision::Create { .. } => None,
			Decision::Skip(reason) => Some(Self::skipped(record, *reason)),
			Decision::Fail(reason) => Some(Self::failed(record, reason.clone())),
		}
	}

	pub fn is_imported(&self) -> bool {
		matches!(self.status, OutcomeStatus::Imported { .. })
	}

	/// Code for the error report, `None` for imported records.
	pub fn reason_code(&self) -> Option<&str> {
		match &self.status {
			OutcomeStatus::Imported { .. } => None,
			OutcomeStatus::Skipped { reason } => Some(reason.as_code()),
			OutcomeStatus::Failed { reason } => Some(reason.as_code()),
		}
	}
}

fn scrub_control(raw: &str) -> String {
	raw.chars().map(|c| if c.is_control() { '?' } else { c }).collect()
}
