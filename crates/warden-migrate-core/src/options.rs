// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Operator choices for one import run. Frozen once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
	/// Records committed per batch. Abort is honoured between batches.
	pub batch_size: usize,
	/// Skip users whose normalized email already exists instead of failing them.
	pub skip_existing: bool,
	/// Reuse the provider's user id as the destination id.
	pub preserve_ids: bool,
	/// Copy the provider's metadata blob onto the destination user.
	pub import_metadata: bool,
	/// Carry OAuth provider links over to the destination user.
	pub preserve_oauth: bool,
}

impl Default for ImportOptions {
	fn default() -> Self {
		Self {
			batch_size: DEFAULT_BATCH_SIZE,
			skip_existing: false,
			preserve_ids: false,
			import_metadata: false,
			preserve_oauth: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
	#[error("batch_size must be at least 1")]
	ZeroBatchSize,

	#[error("batch_size {requested} exceeds the maximum of {max}")]
	BatchSizeTooLarge { requested: usize, max: usize },
}

impl ImportOptions {
	pub fn validate(&self, max_batch_size: usize) -> Result<(), OptionsError> {
		if self.batch_size == 0 {
			return Err(OptionsError::ZeroBatchSize);
		}
		if self.batch_size > max_batch_size {
			return Err(OptionsError::BatchSizeTooLarge {
				requested: self.batch_size,
				max: max_batch_size,
			});
		}
		Ok(())
	}
}
