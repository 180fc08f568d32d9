// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer, MigrateConfigLayer};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub migrate: Option<MigrateConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_option(&mut self.migrate, other.migrate, MigrateConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_other_overwrites() {
		let mut base = ServerConfigLayer {
			migrate: Some(MigrateConfigLayer {
				write_concurrency: Some(4),
				page_size: Some(50),
				..Default::default()
			}),
			..Default::default()
		};
		let other = ServerConfigLayer {
			migrate: Some(MigrateConfigLayer {
				write_concurrency: Some(16),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(other);
		let migrate = base.migrate.as_ref().unwrap();
		assert_eq!(migrate.write_concurrency, Some(16));
		assert_eq!(migrate.page_size, Some(50));
	}

	#[test]
	fn test_merge_adds_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite:/var/lib/warden/data.db".to_string()),
			}),
			..Default::default()
		});
		assert!(base.http.is_none());
		assert_eq!(
			base.database.as_ref().unwrap().url,
			Some("sqlite:/var/lib/warden/data.db".to_string())
		);
	}
}
