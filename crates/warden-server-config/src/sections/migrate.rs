// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User migration import configuration.

use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound on concurrent destination writes per batch.
pub const MAX_WRITE_CONCURRENCY: usize = 32;

/// Migration configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
	pub default_batch_size: usize,
	pub max_batch_size: usize,
	pub write_concurrency: usize,
	/// Users requested per source page.
	pub page_size: u32,
	pub page_timeout_secs: u64,
	pub write_timeout_secs: u64,
	pub preview_sample_size: usize,
	/// Attempts per source request, including the first.
	pub source_max_retries: u32,
	/// Unowned live sessions untouched for this long are dropped from memory.
	pub session_idle_ttl_secs: u64,
}

impl Default for MigrateConfig {
	fn default() -> Self {
		Self {
			default_batch_size: 100,
			max_batch_size: 1000,
			write_concurrency: 8,
			page_size: 100,
			page_timeout_secs: 30,
			write_timeout_secs: 10,
			preview_sample_size: 5,
			source_max_retries: 3,
			session_idle_ttl_secs: 3600,
		}
	}
}

impl MigrateConfig {
	pub fn page_timeout(&self) -> Duration {
		Duration::from_secs(self.page_timeout_secs)
	}

	pub fn write_timeout(&self) -> Duration {
		Duration::from_secs(self.write_timeout_secs)
	}

	pub fn session_idle_ttl(&self) -> Duration {
		Duration::from_secs(self.session_idle_ttl_secs)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		let counts = [
			("migrate.default_batch_size", self.default_batch_size as u64),
			("migrate.max_batch_size", self.max_batch_size as u64),
			("migrate.write_concurrency", self.write_concurrency as u64),
			("migrate.page_size", self.page_size as u64),
			("migrate.page_timeout_secs", self.page_timeout_secs),
			("migrate.write_timeout_secs", self.write_timeout_secs),
			("migrate.preview_sample_size", self.preview_sample_size as u64),
			("migrate.source_max_retries", self.source_max_retries as u64),
			("migrate.session_idle_ttl_secs", self.session_idle_ttl_secs),
		];
		if let Some(&(key, _)) = counts.iter().find(|(_, value)| *value == 0) {
			return Err(ConfigError::invalid(key, "must be greater than zero"));
		}

		if self.write_concurrency > MAX_WRITE_CONCURRENCY {
			return Err(ConfigError::invalid(
				"migrate.write_concurrency",
				format!("must be at most {MAX_WRITE_CONCURRENCY}, got {}", self.write_concurrency),
			));
		}
		if self.default_batch_size > self.max_batch_size {
			return Err(ConfigError::invalid(
				"migrate.default_batch_size",
				format!("{} exceeds max_batch_size {}", self.default_batch_size, self.max_batch_size),
			));
		}
		Ok(())
	}
}

/// Migration configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrateConfigLayer {
	#[serde(default)]
	pub default_batch_size: Option<usize>,
	#[serde(default)]
	pub max_batch_size: Option<usize>,
	#[serde(default)]
	pub write_concurrency: Option<usize>,
	#[serde(default)]
	pub page_size: Option<u32>,
	#[serde(default)]
	pub page_timeout_secs: Option<u64>,
	#[serde(default)]
	pub write_timeout_secs: Option<u64>,
	#[serde(default)]
	pub preview_sample_size: Option<usize>,
	#[serde(default)]
	pub source_max_retries: Option<u32>,
	#[serde(default)]
	pub session_idle_ttl_secs: Option<u64>,
}

impl MigrateConfigLayer {
	pub fn merge(&mut self, other: MigrateConfigLayer) {
		if other.default_batch_size.is_some() {
			self.default_batch_size = other.default_batch_size;
		}
		if other.max_batch_size.is_some() {
			self.max_batch_size = other.max_batch_size;
		}
		if other.write_concurrency.is_some() {
			self.write_concurrency = other.write_concurrency;
		}
		if other.page_size.is_some() {
			self.page_size = other.page_size;
		}
		if other.page_timeout_secs.is_some() {
			self.page_timeout_secs = other.page_timeout_secs;
		}
		if other.write_timeout_secs.is_some() {
			self.write_timeout_secs = other.write_timeout_secs;
		}
		if other.preview_sample_size.is_some() {
			self.preview_sample_size = other.preview_sample_size;
		}
		if other.source_max_retries.is_some() {
			self.source_max_retries = other.source_max_retries;
		}
		if other.session_idle_ttl_secs.is_some() {
			self.session_idle_ttl_secs = other.session_idle_ttl_secs;
		}
	}

	pub fn finalize(self) -> MigrateConfig {
		let defaults = MigrateConfig::default();
		MigrateConfig {
			default_batch_size: self.default_batch_size.unwrap_or(defaults.default_batch_size),
			max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
			write_concurrency: self.write_concurrency.unwrap_or(defaults.write_concurrency),
			page_size: self.page_size.unwrap_or(defaults.page_size),
			page_timeout_secs: self.page_timeout_secs.unwrap_or(defaults.page_timeout_secs),
			write_timeout_secs: self.write_timeout_secs.unwrap_or(defaults.write_timeout_secs),
			preview_sample_size: self
				.preview_sample_size
				.unwrap_or(defaults.preview_sample_size),
			source_max_retries: self.source_max_retries.unwrap_or(defaults.source_max_retries),
			session_idle_ttl_secs: self
				.session_idle_ttl_secs
				.unwrap_or(defaults.session_idle_ttl_secs),
		}
	}
}
