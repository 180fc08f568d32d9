// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP connector for the provider's admin REST API.
//!
//! | Call | Request |
//! |------|---------|
//! | validate | `GET /admin/users?page=1&per_page=1` |
//! | count | `GET /admin/users/count` |
//! | page | `GET /admin/users?page=N&per_page=M` |
//! | fetch_user | `GET /admin/users/{id}` |
//!
//! Every call sends `Authorization: Bearer <credential>`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use warden_common_http::{retry, RetryConfig};
use warden_migrate_core::{PageCursor, SourceCredential, SourceUserRecord};

use crate::connector::{ConnectorFactory, SourceConnector, SourcePage};
use crate::error::SourceError;
use crate::types::{ApiUser, ApiUserCount, ApiUserPage, SourceEndpoint};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 1000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 512;

/// Connector for one provider endpoint and credential.
#[derive(Debug, Clone)]
pub struct HttpSourceConnector {
	http_client: Client,
	endpoint: SourceEndpoint,
	credential: SourceCredential,
	page_size: u32,
	retry_config: RetryConfig,
}

impl HttpSourceConnector {
	pub fn new(endpoint: SourceEndpoint, credential: SourceCredential) -> Self {
		Self {
			http_client: warden_common_http::new_client_with_timeout(REQUEST_TIMEOUT),
			endpoint,
			credential,
			page_size: DEFAULT_PAGE_SIZE,
			retry_config: RetryConfig::default(),
		}
	}

	pub fn with_page_size(mut self, page_size: u32) -> Self {
		self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
		self
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.http_client = warden_common_http::new_client_with_timeout(timeout);
		self
	}

	pub fn endpoint(&self) -> &SourceEndpoint {
		&self.endpoint
	}

	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, String)],
	) -> Result<T, SourceError> {
		let url = self.endpoint.join(path);
		debug!(url = %url, "requesting source provider");

		let response = self
			.http_client
			.get(&url)
			.bearer_auth(self.credential.expose())
			.query(query)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					return SourceError::Timeout;
				}
				if e.is_connect() {
					return SourceError::Unreachable(e.to_string());
				}
				SourceError::Network(e)
			})?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(status_error(status, clip_error_body(body)));
		}

		let body = response.bytes().await.map_err(SourceError::Network)?;
		serde_json::from_slice(&body)
			.map_err(|e| SourceError::InvalidResponse(format!("JSON parse error: {e}")))
	}

	async fn page_inner(&self, page: u64) -> Result<SourcePage, SourceError> {
		let response: ApiUserPage = self
			.get_json(
				"admin/users",
				&[
					("page", page.to_string()),
					("per_page", self.page_size.to_string()),
				],
			)
			.await?;

		let next = match response.next_page {
			Some(next) if next <= page => {
				return Err(SourceError::InvalidResponse(format!(
					"next_page {next} does not advance past {page}"
				)));
			}
			Some(next) => Some(PageCursor::new(next.to_string())),
			None => None,
		};

		Ok(SourcePage {
			records: response.users.into_iter().map(SourceUserRecord::from).collect(),
			next,
		})
	}
}

fn status_error(status: StatusCode, body: String) -> SourceError {
	match status {
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::InvalidCredential,
		StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited,
		StatusCode::NOT_FOUND => SourceError::NotFound,
		_ => SourceError::Api {
			status: status.as_u16(),
			message: body,
		},
	}
}

/// Keep at most [`MAX_ERROR_BODY`] bytes, cut on a char boundary.
fn clip_error_body(mut body: String) -> String {
	if body.len() > MAX_ERROR_BODY {
		let cut = (0..=MAX_ERROR_BODY)
			.rev()
			.find(|i| body.is_char_boundary(*i))
			.unwrap_or(0);
		body.truncate(cut);
	}
	body
}

fn page_number(cursor: Option<&PageCursor>) -> Result<u64, SourceError> {
	match cursor {
		None => Ok(1),
		Some(cursor) => cursor
			.as_str()
			.parse::<u64>()
			.ok()
			.filter(|page| *page >= 1)
			.ok_or_else(|| SourceError::InvalidResponse(format!("unusable page cursor {cursor}"))),
	}
}

#[async_trait]
impl SourceConnector for HttpSourceConnector {
	#[instrument(skip(self), fields(endpoint = %self.endpoint))]
	async fn validate(&self) -> Result<(), SourceError> {
		let probe = retry(&self.retry_config, || async {
			self
				.get_json::<ApiUserPage>(
					"admin/users",
					&[("page", "1".to_string()), ("per_page", "1".to_string())],
				)
				.await
		})
		.await;

		match probe {
			Ok(_) => {
				debug!("source credential accepted");
				Ok(())
			}
			Err(SourceError::InvalidCredential) => Err(SourceError::InvalidCredential),
			Err(e) => {
				warn!(error = %e, "source validation failed");
				Err(SourceError::Unreachable(e.to_string()))
			}
		}
	}

	#[instrument(skip(self), fields(endpoint = %self.endpoint))]
	async fn count(&self) -> Option<u64> {
		match self
			.get_json::<ApiUserCount>("admin/users/count", &[])
			.await
		{
			Ok(response) => Some(response.count),
			Err(e) => {
				debug!(error = %e, "source count unavailable");
				None
			}
		}
	}

	#[instrument(skip(self), fields(endpoint = %self.endpoint, cursor = ?cursor.map(PageCursor::as_str)))]
	async fn page(&self, cursor: Option<&PageCursor>) -> Result<SourcePage, SourceError> {
		let page = page_number(cursor)?;
		let result = retry(&self.retry_config, || self.page_inner(page)).await?;
		debug!(
			records = result.records.len(),
			last = result.next.is_none(),
			"source page fetched"
		);
		Ok(result)
	}

	#[instrument(skip(self), fields(endpoint = %self.endpoint))]
	async fn fetch_user(&self, source_id: &str) -> Result<Option<SourceUserRecord>, SourceError> {
		if source_id.is_empty() || source_id.contains('/') {
			return Ok(None);
		}
		let path = format!("admin/users/{source_id}");

		match retry(&self.retry_config, || self.get_json::<ApiUser>(&path, &[])).await {
			Ok(user) => Ok(Some(user.into())),
			Err(SourceError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}
}

/// Builds [`HttpSourceConnector`]s with shared tuning.
#[derive(Debug, Clone)]
pub struct HttpConnectorFactory {
	page_size: u32,
	timeout: Duration,
	retry_config: RetryConfig,
}

impl Default for HttpConnectorFactory {
	fn default() -> Self {
		Self {
			page_size: DEFAULT_PAGE_SIZE,
			timeout: REQUEST_TIMEOUT,
			retry_config: RetryConfig::default(),
		}
	}
}

impl HttpConnectorFactory {
	pub fn new(page_size: u32, timeout: Duration, retry_config: RetryConfig) -> Self {
		Self {
			page_size,
			timeout,
			retry_config,
		}
	}
}

impl ConnectorFactory for HttpConnectorFactory {
	fn connect(
		&self,
		source_url: &str,
		credential: &SourceCredential,
	) -> Result<Arc<dyn SourceConnector>, SourceError> {
		if credential.is_blank() {
			return Err(SourceError::InvalidCredential);
		}
		let endpoint = SourceEndpoint::parse(source_url)?;

		Ok(Arc::new(
			HttpSourceConnector::new(endpoint, credential.clone())
				.with_page_size(self.page_size)
				.with_timeout(self.timeout)
				.with_retry_config(self.retry_config.clone()),
		))
	}
}
