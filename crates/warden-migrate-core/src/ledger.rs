// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-session record of every skipped or failed user.
//!
//! The ledger is append-only and is the only source of the downloadable error
//! report. Imported outcomes are counted elsewhere and never land here.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::outcome::ImportOutcome;

pub const CSV_HEADER: [&str; 2] = ["email", "reason"];

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
	#[error("CSV encoding failed: {0}")]
	Csv(#[from] csv::Error),

	#[error("CSV buffer flush failed: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLedger {
	entries: Vec<ImportOutcome>,
}

impl ErrorLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Rebuild a ledger from stored outcomes, keeping their order.
	pub fn from_outcomes(outcomes: impl IntoIterator<Item = ImportOutcome>) -> Self {
		let mut ledger = Self::new();
		for outcome in outcomes {
			ledger.record(outcome);
		}
		ledger
	}

	/// Append an outcome. Returns `false` for imported outcomes, which are not kept.
	pub fn record(&mut self, outcome: ImportOutcome) -> bool {
		if outcome.is_imported() {
			return false;
		}
		self.entries.push(outcome);
		true
	}

	pub fn all(&self) -> &[ImportOutcome] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Render the report: an `email,reason` header then one row per entry,
	/// every field quoted, `\n` line endings.
	pub fn export(&self) -> Result<Vec<u8>, LedgerError> {
		let mut writer = WriterBuilder::new()
			.quote_style(QuoteStyle::Always)
			.terminator(Terminator::Any(b'\n'))
			.from_writer(Vec::with_capacity(64 * (self.entries.len() + 1)));

		writer.write_record(CSV_HEADER)?;
		for entry in &self.entries {
			writer.write_record([entry.email.as_str(), entry.reason_code().unwrap_or_default()])?;
		}

		writer.into_inner().map_err(|e| LedgerError::Io(e.into_error()))
	}
}
