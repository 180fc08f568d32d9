// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Connectors for the external identity provider a tenant migrates away from.
//!
//! The orchestrator only sees the [`SourceConnector`] and [`ConnectorFactory`]
//! traits. [`HttpSourceConnector`] speaks the provider's admin REST API.

pub mod client;
pub mod connector;
pub mod error;
pub mod preview;
pub mod types;

pub use client::{HttpConnectorFactory, HttpSourceConnector};
pub use connector::{ConnectorFactory, SourceConnector, SourcePage};
pub use error::SourceError;
pub use preview::{PreviewSampler, MAX_PREVIEW_SAMPLE};
pub use types::SourceEndpoint;
pub use warden_common_http::RetryConfig;
