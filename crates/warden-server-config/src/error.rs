// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// An environment variable is set but does not parse.
	#[error("{var}={value:?} is not a valid {expected}")]
	InvalidEnv {
		var: String,
		value: String,
		expected: &'static str,
	},

	#[error("Failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse TOML config at {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// A resolved value is out of range. `key` is the dotted config path.
	#[error("Invalid {key}: {message}")]
	Invalid { key: &'static str, message: String },
}

impl ConfigError {
	pub(crate) fn invalid(key: &'static str, message: impl Into<String>) -> Self {
		ConfigError::Invalid {
			key,
			message: message.into(),
		}
	}
}
