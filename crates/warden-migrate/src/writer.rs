// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use warden_migrate_core::{
	Decision, FailReason, ImportOutcome, MappedUserRecord, TenantId,
};
use warden_server_db::{UpsertOutcome, UserStore};

/// Commits decided records to the tenant's store.
///
/// Only `Create` decisions touch the store. Each write is an idempotent upsert,
/// so replaying a batch after a crash yields the same rows.
#[derive(Clone)]
pub struct BatchWriter {
	store: Arc<dyn UserStore>,
	tenant_id: TenantId,
	concurrency: usize,
	write_timeout: Duration,
}

impl BatchWriter {
	pub fn new(
		store: Arc<dyn UserStore>,
		tenant_id: TenantId,
		concurrency: usize,
		write_timeout: Duration,
	) -> Self {
		Self {
			store,
			tenant_id,
			concurrency: concurrency.max(1),
			write_timeout,
		}
	}

	/// Write a resolved batch. One outcome per input, in completion order.
	#[tracing::instrument(skip_all, fields(tenant_id = %self.tenant_id, size = batch.len()))]
	pub async fn write_batch(&self, batch: Vec<(MappedUserRecord, Decision)>) -> Vec<ImportOutcome> {
		stream::iter(batch)
			.map(|(record, decision)| self.write_one(record, decision))
			.buffer_unordered(self.concurrency)
			.collect()
			.await
	}

	async fn write_one(&self, mut record: MappedUserRecord, decision: Decision) -> ImportOutcome {
		let target = match decision {
			Decision::Create { target } => target,
			Decision::Skip(reason) => return ImportOutcome::skipped(&record, reason),
			Decision::Fail(reason) => return ImportOutcome::failed(&record, reason),
		};
		record.id = target;

		let write = self.store.upsert_imported_user(&self.tenant_id, &record);
		match tokio::time::timeout(self.write_timeout, write).await {
			Ok(Ok(UpsertOutcome::Written { user_id })) => ImportOutcome::imported(&record, user_id),
			Ok(Ok(UpsertOutcome::EmailTaken)) => ImportOutcome::failed(&record, FailReason::EmailCollision),
			Ok(Ok(UpsertOutcome::IdTaken)) => ImportOutcome::failed(&record, FailReason::IdCollision),
			Ok(Ok(UpsertOutcome::IdentityTaken)) => {
				tracing::warn!(
					source_id = %record.provenance.source_id,
					"linked identity belongs to another user"
				);
				ImportOutcome::failed(&record, FailReason::WriteError)
			}
			Ok(Err(e)) => {
				tracing::warn!(
					source_id = %record.provenance.source_id,
					error = %e,
					"user write failed"
				);
				ImportOutcome::failed(&record, FailReason::WriteError)
			}
			Err(_) => {
				tracing::warn!(
					source_id = %record.provenance.source_id,
					timeout_ms = self.write_timeout.as_millis() as u64,
					"user write timed out"
				);
				ImportOutcome::failed(&record, FailReason::WriteError)
			}
		}
	}
}
