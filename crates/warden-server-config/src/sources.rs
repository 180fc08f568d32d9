// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer, MigrateConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/warden/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: WARDEN_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env_var("WARDEN_SERVER_HOST"),
				port: env_parse("WARDEN_SERVER_PORT")?,
			}),
			database: Some(DatabaseConfigLayer {
				url: env_var("WARDEN_SERVER_DATABASE_URL"),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("WARDEN_SERVER_LOG_LEVEL"),
			}),
			migrate: Some(load_migrate_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidEnv {
			var: name.to_string(),
			value: v,
			expected: std::any::type_name::<T>(),
		}),
		None => Ok(None),
	}
}

fn load_migrate_from_env() -> Result<MigrateConfigLayer, ConfigError> {
	Ok(MigrateConfigLayer {
		default_batch_size: env_parse("WARDEN_SERVER_MIGRATE_DEFAULT_BATCH_SIZE")?,
		max_batch_size: env_parse("WARDEN_SERVER_MIGRATE_MAX_BATCH_SIZE")?,
		write_concurrency: env_parse("WARDEN_SERVER_MIGRATE_WRITE_CONCURRENCY")?,
		page_size: env_parse("WARDEN_SERVER_MIGRATE_PAGE_SIZE")?,
		page_timeout_secs: env_parse("WARDEN_SERVER_MIGRATE_PAGE_TIMEOUT_SECS")?,
		write_timeout_secs: env_parse("WARDEN_SERVER_MIGRATE_WRITE_TIMEOUT_SECS")?,
		preview_sample_size: env_parse("WARDEN_SERVER_MIGRATE_PREVIEW_SAMPLE_SIZE")?,
		source_max_retries: env_parse("WARDEN_SERVER_MIGRATE_SOURCE_MAX_RETRIES")?,
		session_idle_ttl_secs: env_parse("WARDEN_SERVER_MIGRATE_SESSION_IDLE_TTL_SECS")?,
	})
}
