// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{ImportSessionId, UserId};

/// Opaque pagination token handed out by the source provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
	pub fn new(token: impl Into<String>) -> Self {
		Self(token.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for PageCursor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A linked third-party login on either side of the migration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OAuthLink {
	pub provider: String,
	pub provider_user_id: String,
}

impl OAuthLink {
	pub fn new(provider: impl Into<String>, provider_user_id: impl Into<String>) -> Self {
		Self {
			provider: provider.into(),
			provider_user_id: provider_user_id.into(),
		}
	}
}

/// A user as exported by the source provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUserRecord {
	pub source_id: String,
	/// Natural key. Absent or malformed values fail the record as invalid.
	pub email: Option<String>,
	pub display_name: Option<String>,
	pub has_password: bool,
	pub oauth_links: Vec<OAuthLink>,
	pub metadata: Option<serde_json::Value>,
}

impl SourceUserRecord {
	pub fn has_oauth(&self) -> bool {
		!self.oauth_links.is_empty()
	}

	/// Email exactly as the provider sent it, or empty when missing.
	pub fn raw_email(&self) -> &str {
		self.email.as_deref().unwrap_or_default()
	}

	pub fn preview(&self) -> PreviewRow {
		PreviewRow {
			email: self.raw_email().trim().to_string(),
			display_name: self.display_name.clone(),
			has_password: self.has_password,
			has_oauth: self.has_oauth(),
		}
	}
}

/// What the operator sees before committing to an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRow {
	pub email: String,
	pub display_name: Option<String>,
	pub has_password: bool,
	pub has_oauth: bool,
}

/// Which session and source record produced a destination user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
	pub session_id: ImportSessionId,
	pub source_id: String,
}

/// A source user reshaped for the destination store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedUserRecord {
	pub id: UserId,
	/// Trimmed, lower-cased. The dedup key within a tenant.
	pub email: String,
	/// Trimmed, original casing.
	pub display_email: String,
	pub display_name: Option<String>,
	pub must_reset_password: bool,
	pub metadata: Option<serde_json::Value>,
	pub oauth_links: Vec<OAuthLink>,
	pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn preview_reports_oauth_presence_only() {
		let record = SourceUserRecord {
			source_id: "u1".into(),
			email: Some(" Ada@Example.com ".into()),
			display_name: Some("Ada".into()),
			has_password: true,
			oauth_links: vec![OAuthLink::new("github", "42")],
			metadata: Some(serde_json::json!({"plan": "pro"})),
		};

		let row = record.preview();
		assert_eq!(row.email, "Ada@Example.com");
		assert!(row.has_password);
		assert!(row.has_oauth);
	}

	#[test]
	fn raw_email_defaults_to_empty() {
		let record = SourceUserRecord {
			source_id: "u2".into(),
			email: None,
			display_name: None,
			has_password: false,
			oauth_links: vec![],
			metadata: None,
		};
		assert_eq!(record.raw_email(), "");
		assert!(!record.has_oauth());
	}
}
