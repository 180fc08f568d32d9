// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client construction with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a client builder with the standard Warden User-Agent header.
///
/// Callers customize timeouts and pools before calling `build()`.
///
/// # Example
/// ```ignore
/// let client = warden_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a client with a whole-request timeout and the standard User-Agent.
///
/// Panics only when the TLS backend cannot be initialised.
pub fn new_client_with_timeout(timeout: Duration) -> Client {
	builder()
		.timeout(timeout)
		.connect_timeout(timeout.min(Duration::from_secs(10)))
		.build()
		.expect("failed to build HTTP client")
}

/// Returns the standard Warden User-Agent string, `warden/{crate_version}`.
pub fn user_agent() -> String {
	format!("warden/{}", env!("CARGO_PKG_VERSION"))
}
