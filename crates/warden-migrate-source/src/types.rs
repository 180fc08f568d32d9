// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider wire types and endpoint parsing.

use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use warden_migrate_core::{OAuthLink, SourceUserRecord};

use crate::error::SourceError;

/// Identity provider name the source uses for plain email/password logins.
pub const PASSWORD_PROVIDER: &str = "email";

/// Base URL of a source provider, validated and without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoint(String);

impl SourceEndpoint {
	pub fn parse(raw: &str) -> Result<Self, SourceError> {
		let url = Url::parse(raw.trim()).map_err(|e| SourceError::InvalidEndpoint(e.to_string()))?;

		if !matches!(url.scheme(), "http" | "https") {
			return Err(SourceError::InvalidEndpoint(format!(
				"unsupported scheme {}",
				url.scheme()
			)));
		}
		if url.host_str().is_none() {
			return Err(SourceError::InvalidEndpoint("missing host".to_string()));
		}

		Ok(Self(url.as_str().trim_end_matches('/').to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn join(&self, path: &str) -> String {
		format!("{}/{}", self.0, path.trim_start_matches('/'))
	}
}

impl fmt::Display for SourceEndpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiIdentity {
	pub provider: String,
	pub provider_user_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
	pub id: String,
	pub email: Option<String>,
	pub display_name: Option<String>,
	#[serde(default)]
	pub has_password: bool,
	#[serde(default)]
	pub identities: Vec<ApiIdentity>,
	#[serde(default)]
	pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUserPage {
	pub users: Vec<ApiUser>,
	#[serde(default)]
	pub next_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUserCount {
	pub count: u64,
}

impl From<ApiUser> for SourceUserRecord {
	fn from(user: ApiUser) -> Self {
		let oauth_links = user
			.identities
			.into_iter()
			.filter(|identity| identity.provider != PASSWORD_PROVIDER)
			.map(|identity| OAuthLink::new(identity.provider, identity.provider_user_id))
			.collect();

		SourceUserRecord {
			source_id: user.id,
			email: user.email,
			display_name: user.display_name,
			has_password: user.has_password,
			oauth_links,
			metadata: user.metadata.filter(|value| !value.is_null()),
		}
	}
}
