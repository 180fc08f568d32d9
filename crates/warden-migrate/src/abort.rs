// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operator abort request, checked by the driver between batches.
#[derive(Debug, Clone)]
pub struct AbortSignal {
	aborted: Arc<AtomicBool>,
}

impl AbortSignal {
	pub fn new() -> Self {
		Self {
			aborted: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn abort(&self) {
		self.aborted.store(true, Ordering::SeqCst);
	}

	pub fn is_aborted(&self) -> bool {
		self.aborted.load(Ordering::SeqCst)
	}

	/// Clear a previous request so a resumed run is not stopped immediately.
	pub fn reset(&self) {
		self.aborted.store(false, Ordering::SeqCst);
	}
}

impl Default for AbortSignal {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_state() {
		let signal = AbortSignal::new();
		let handle = signal.clone();
		assert!(!signal.is_aborted());

		handle.abort();
		assert!(signal.is_aborted());

		signal.reset();
		assert!(!handle.is_aborted());
	}
}
