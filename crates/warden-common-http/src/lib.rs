// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Warden.
//!
//! This crate provides:
//! - A client builder carrying the `warden/{version}` User-Agent
//! - Retry with exponential backoff for transient upstream failures

mod client;
mod retry;

pub use client::{builder, new_client_with_timeout, user_agent};
pub use retry::{retry, RetryConfig, RetryableError};
