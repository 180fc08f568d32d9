// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for warden-server.

pub mod database;
pub mod http;
pub mod logging;
pub mod migrate;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use migrate::{MigrateConfig, MigrateConfigLayer, MAX_WRITE_CONCURRENCY};
