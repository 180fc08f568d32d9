// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source schema to destination schema.

use crate::ids::{ImportSessionId, UserId};
use crate::options::ImportOptions;
use crate::reason::FailReason;
use crate::record::{MappedUserRecord, Provenance, SourceUserRecord};

/// Why a source record cannot be mapped. Collapses to
/// [`FailReason::InvalidRecord`] in outcomes; the detail is for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
	#[error("record has no email")]
	MissingEmail,

	#[error("email is malformed")]
	MalformedEmail,

	#[error("source id {0:?} cannot be used as a destination id")]
	UnusableSourceId(String),
}

impl From<MapError> for FailReason {
	fn from(_: MapError) -> Self {
		FailReason::InvalidRecord
	}
}

/// Trim and lower-case an address, rejecting anything that is not plausibly
/// `local@domain`.
pub fn normalize_email(raw: &str) -> Option<String> {
	let trimmed = raw.trim();
	let (local, domain) = trimmed.split_once('@')?;

	if local.is_empty() || domain.is_empty() || domain.contains('@') {
		return None;
	}
	if trimmed.chars().any(char::is_whitespace) {
		return None;
	}
	if domain.starts_with('.') || domain.ends_with('.') {
		return None;
	}

	Some(trimmed.to_lowercase())
}

/// Map one source record under the session's frozen options.
///
/// Passwords never cross over: every imported user must reset.
pub fn map_record(
	record: &SourceUserRecord,
	options: &ImportOptions,
	session_id: ImportSessionId,
) -> Result<MappedUserRecord, MapError> {
	let raw_email = record.email.as_deref().ok_or(MapError::MissingEmail)?;
	if raw_email.trim().is_empty() {
		return Err(MapError::MissingEmail);
	}
	let email = normalize_email(raw_email).ok_or(MapError::MalformedEmail)?;

	let id = if options.preserve_ids {
		record
			.source_id
			.parse::<UserId>()
			.map_err(|_| MapError::UnusableSourceId(record.source_id.clone()))?
	} else {
		UserId::generate()
	};

	let display_name = record
		.display_name
		.as_deref()
		.map(str::trim)
		.filter(|name| !name.is_empty())
		.map(str::to_string);

	Ok(MappedUserRecord {
		id,
		email,
		display_email: raw_email.trim().to_string(),
		display_name,
		must_reset_password: true,
		metadata: if options.import_metadata {
			record.metadata.clone()
		} else {
			None
		},
		oauth_links: if options.preserve_oauth {
			record.oauth_links.clone()
		} else {
			Vec::new()
		},
		provenance: Provenance {
			session_id,
			source_id: record.source_id.clone(),
		},
	})
}
