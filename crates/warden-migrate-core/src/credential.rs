// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source provider credential.
//!
//! The operator pastes an admin credential for the external provider. It lives
//! only as long as the import session that needs it and must never reach a log
//! line, a status response or the archive.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

pub const REDACTED: &str = "[REDACTED]";

/// Admin credential for the source identity provider.
///
/// Debug, Display and Serialize are redacted and the backing memory is zeroed
/// on drop. Use [`SourceCredential::expose`] at the single point where the
/// value is placed on the wire.
#[derive(Zeroize, Clone, PartialEq, Eq)]
#[zeroize(drop)]
pub struct SourceCredential {
	inner: String,
}

impl SourceCredential {
	pub fn new(value: impl Into<String>) -> Self {
		Self {
			inner: value.into(),
		}
	}

	pub fn expose(&self) -> &str {
		&self.inner
	}

	/// Blank or whitespace-only credentials are rejected before any network call.
	pub fn is_blank(&self) -> bool {
		self.inner.trim().is_empty()
	}
}

impl fmt::Debug for SourceCredential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SourceCredential").field(&REDACTED).finish()
	}
}

impl fmt::Display for SourceCredential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl Serialize for SourceCredential {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SourceCredential {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SourceCredential::new)
	}
}
