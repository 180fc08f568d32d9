// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Errors raised while talking to the source provider.

use thiserror::Error;
use warden_common_http::RetryableError;
use warden_migrate_core::SessionErrorKind;

#[derive(Debug, Error)]
pub enum SourceError {
	/// Network-level failure during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("Request timed out")]
	Timeout,

	/// The provider could not be reached at all.
	#[error("Source unreachable: {0}")]
	Unreachable(String),

	#[error("Invalid source URL: {0}")]
	InvalidEndpoint(String),

	/// Credential missing, revoked or lacking admin scope.
	#[error("Source rejected the credential")]
	InvalidCredential,

	#[error("Source rate limit exceeded")]
	RateLimited,

	#[error("Resource not found at source")]
	NotFound,

	#[error("Invalid response from source: {0}")]
	InvalidResponse(String),

	#[error("Source API error: {status} - {message}")]
	Api { status: u16, message: String },
}

impl SourceError {
	/// Session-level classification used when this error stops a session.
	pub fn session_error_kind(&self) -> SessionErrorKind {
		match self {
			SourceError::Network(e) if e.is_timeout() => SessionErrorKind::SourceTimeout,
			SourceError::Network(_) => SessionErrorKind::Unreachable,
			SourceError::Timeout => SessionErrorKind::SourceTimeout,
			SourceError::Unreachable(_) | SourceError::InvalidEndpoint(_) => {
				SessionErrorKind::Unreachable
			}
			SourceError::InvalidCredential => SessionErrorKind::InvalidCredential,
			SourceError::RateLimited => SessionErrorKind::RateLimited,
			SourceError::Api { status, .. } if *status >= 500 => SessionErrorKind::SourceUnavailable,
			SourceError::Api { .. } | SourceError::NotFound => SessionErrorKind::SourceRejected,
			SourceError::InvalidResponse(_) => SessionErrorKind::InvalidSourceResponse,
		}
	}
}

impl RetryableError for SourceError {
	fn is_retryable(&self) -> bool {
		match self {
			SourceError::Network(e) => e.is_retryable(),
			SourceError::Timeout => true,
			SourceError::Unreachable(_) => true,
			SourceError::RateLimited => true,
			SourceError::Api { status, .. } => *status >= 500,
			SourceError::InvalidEndpoint(_)
			| SourceError::InvalidCredential
			| SourceError::NotFound
			| SourceError::InvalidResponse(_) => false,
		}
	}
}
