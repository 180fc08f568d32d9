// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Invalid database URL: {0}")]
	InvalidUrl(String),

	/// A stored value no longer decodes into its domain type.
	#[error("Corrupt {column} value: {message}")]
	Corrupt { column: String, message: String },

	#[error("JSON column error: {0}")]
	Json(#[from] serde_json::Error),

	/// Raised by store implementations that are not backed by SQLite.
	#[error("Store error: {0}")]
	Store(String),
}

impl DbError {
	pub(crate) fn corrupt(column: &str, message: impl std::fmt::Display) -> Self {
		DbError::Corrupt {
			column: column.to_string(),
			message: message.to_string(),
		}
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
