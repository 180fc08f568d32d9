// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite location for users and the import archive.

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite:./warden.db";

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
	pub url: String,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

impl DatabaseConfig {
	/// Only SQLite URLs are supported.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.url.starts_with("sqlite:") {
			return Err(ConfigError::invalid(
				"database.url",
				format!("expected a sqlite: URL, got {:?}", self.url),
			));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		self.url.map(|url| DatabaseConfig { url }).unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_non_sqlite_url_rejected() {
		let config = DatabaseConfigLayer {
			url: Some("postgres://localhost/warden".to_string()),
		}
		.finalize();
		assert!(config.validate().is_err());
		assert!(DatabaseConfig::default().validate().is_ok());
	}
}
