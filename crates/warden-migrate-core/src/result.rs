// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::ledger::ErrorLedger;
use crate::outcome::{ImportOutcome, OutcomeStatus};

/// Running counters over recorded outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTally {
	pub imported: u64,
	pub skipped: u64,
	pub failed: u64,
}

impl ImportTally {
	pub fn record(&mut self, outcome: &ImportOutcome) {
		match outcome.status {
			OutcomeStatus::Imported { .. } => self.imported += 1,
			OutcomeStatus::Skipped { .. } => self.skipped += 1,
			OutcomeStatus::Failed { .. } => self.failed += 1,
		}
	}

	pub fn processed(&self) -> u64 {
		self.imported + self.skipped + self.failed
	}
}

/// Summary handed back to the operator, complete or partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
	/// Source records that reached an outcome.
	pub total_users: u64,
	pub imported: u64,
	pub skipped: u64,
	pub failed: u64,
	/// Provider's own count when it offered one.
	pub expected_total: Option<u64>,
	/// Skipped and failed outcomes in ledger order.
	pub outcomes: Vec<ImportOutcome>,
}

impl ImportResult {
	pub fn from_parts(tally: ImportTally, expected_total: Option<u64>, ledger: &ErrorLedger) -> Self {
		Self {
			total_users: tally.processed(),
			imported: tally.imported,
			skipped: tally.skipped,
			failed: tally.failed,
			expected_total,
			outcomes: ledger.all().to_vec(),
		}
	}

	pub fn is_balanced(&self) -> bool {
		self.imported + self.skipped + self.failed == self.total_users
			&& self.outcomes.len() as u64 == self.skipped + self.failed
	}
}
