// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Closed sets of per-record reasons.
//!
//! Reasons cross crate and storage boundaries as stable snake_case codes. Text
//! for humans comes from [`FailReason::describe`] and friends and is never
//! parsed back.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
	AlreadyExists,
}

impl SkipReason {
	pub fn as_code(&self) -> &'static str {
		match self {
			SkipReason::AlreadyExists => "already_exists",
		}
	}

	pub fn describe(&self) -> &'static str {
		match self {
			SkipReason::AlreadyExists => "A user with this email already exists",
		}
	}
}

/// Why a record could not be imported.
///
/// `Unknown` preserves codes this build does not recognise, for example ones
/// written by a newer server into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum FailReason {
	EmailCollision,
	IdCollision,
	WriteError,
	InvalidRecord,
	Unknown(String),
}

impl FailReason {
	pub const KNOWN: [FailReason; 4] = [
		FailReason::EmailCollision,
		FailReason::IdCollision,
		FailReason::WriteError,
		FailReason::InvalidRecord,
	];

	pub fn as_code(&self) -> &str {
		match self {
			FailReason::EmailCollision => "email_collision",
			FailReason::IdCollision => "id_collision",
			FailReason::WriteError => "write_error",
			FailReason::InvalidRecord => "invalid_record",
			FailReason::Unknown(code) => code,
		}
	}

	pub fn from_code(code: &str) -> Self {
		match code {
			"email_collision" => FailReason::EmailCollision,
			"id_collision" => FailReason::IdCollision,
			"write_error" => FailReason::WriteError,
			"invalid_record" => FailReason::InvalidRecord,
			other => FailReason::Unknown(other.to_string()),
		}
	}

	pub fn describe(&self) -> String {
		match self {
			FailReason::EmailCollision => "A different user already owns this email".to_string(),
			FailReason::IdCollision => "The preserved id belongs to a user with another email".to_string(),
			FailReason::WriteError => "The user could not be written".to_string(),
			FailReason::InvalidRecord => "The source record is missing a usable email or id".to_string(),
			FailReason::Unknown(code) => format!("Unrecognised failure ({code})"),
		}
	}
}

impl fmt::Display for FailReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_code())
	}
}

impl From<FailReason> for String {
	fn from(reason: FailReason) -> Self {
		reason.as_code().to_string()
	}
}

impl From<String> for FailReason {
	fn from(code: String) -> Self {
		FailReason::from_code(&code)
	}
}
