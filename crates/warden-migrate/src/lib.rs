// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # warden-migrate
//!
//! Drives an [`ImportSession`](warden_migrate_core::ImportSession) from
//! submitted credentials to a final result:
//!
//! ```text
//! SourceConnector::page -> map_record -> DedupResolver -> BatchWriter -> ErrorLedger
//! ```
//!
//! One driver task owns a session at a time. Inside a batch, per-record
//! lookup and write run on a bounded pool; batches and pages stay in order.

mod abort;
mod observer;
mod orchestrator;
mod resolver;
mod writer;

pub use abort::AbortSignal;
pub use observer::{NoopObserver, ProgressObserver};
pub use orchestrator::{
	ImportOrchestrator, OrchestratorError, OrchestratorSettings, MAX_WRITE_CONCURRENCY,
};
pub use resolver::DedupResolver;
pub use writer::BatchWriter;
