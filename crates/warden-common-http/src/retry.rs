// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for calls against upstream services.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const TRANSIENT_STATUSES: [StatusCode; 6] = [
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Total attempts including the first call. `1` disables retries.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A config that performs exactly one attempt.
	pub fn no_retry() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);
		self
	}

	/// Whether an HTTP status is worth another attempt.
	pub fn is_transient_status(status: StatusCode) -> bool {
		TRANSIENT_STATUSES.contains(&status)
	}

	/// Delay before retry number `attempt` (zero based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exponential.min(self.max_delay.as_secs_f64());

		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(delay)
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}

		self
			.status()
			.map(RetryConfig::is_transient_status)
			.unwrap_or(false)
	}
}

/// Runs `f` until it succeeds, returns a non-retryable error, or the attempt
/// budget in `cfg` is spent.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			return Err(err);
		}

		if attempt >= cfg.max_attempts {
			warn!(
				error = %err,
				attempt,
				max_attempts = cfg.max_attempts,
				"upstream call failed, attempts exhausted"
			);
			return Err(err);
		}

		let delay = cfg.delay_for(attempt - 1);
		warn!(
			error = %err,
			attempt,
			max_attempts = cfg.max_attempts,
			delay_ms = delay.as_millis() as u64,
			"upstream call failed, retrying"
		);
		tokio::time::sleep(delay).await;
	}
}
