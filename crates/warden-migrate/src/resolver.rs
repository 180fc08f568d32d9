// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;
use warden_migrate_core::{
	resolve, Decision, DestinationLookup, FailReason, ImportOptions, MappedUserRecord, TenantId,
};
use warden_server_db::{DbError, UserStore};

/// Looks a mapped record up in the tenant's store and decides its fate.
#[derive(Clone)]
pub struct DedupResolver {
	store: Arc<dyn UserStore>,
	tenant_id: TenantId,
	lookup_timeout: Duration,
}

impl DedupResolver {
	pub fn new(store: Arc<dyn UserStore>, tenant_id: TenantId, lookup_timeout: Duration) -> Self {
		Self {
			store,
			tenant_id,
			lookup_timeout,
		}
	}

	/// Destination rows for the record. The id lookup only runs when the
	/// email is free and ids are preserved.
	pub async fn lookup(
		&self,
		record: &MappedUserRecord,
		options: &ImportOptions,
	) -> Result<DestinationLookup, DbError> {
		let by_email = self
			.store
			.get_user_by_email(&self.tenant_id, &record.email)
			.await?
			.map(|user| user.to_existing());

		let by_id = if options.preserve_ids && by_email.is_none() {
			self
				.store
				.get_user_by_id(&self.tenant_id, &record.id)
				.await?
				.map(|user| user.to_existing())
		} else {
			None
		};

		Ok(DestinationLookup { by_email, by_id })
	}

	/// Decision for one record, computed right before its write. A lookup
	/// that fails or times out fails the record, never the batch.
	#[tracing::instrument(skip_all, fields(source_id = %record.provenance.source_id))]
	pub async fn resolve(&self, record: &MappedUserRecord, options: &ImportOptions) -> Decision {
		match tokio::time::timeout(self.lookup_timeout, self.lookup(record, options)).await {
			Ok(Ok(lookup)) => resolve(record, &lookup, options),
			Ok(Err(e)) => {
				tracing::warn!(error = %e, "destination lookup failed");
				Decision::Fail(FailReason::WriteError)
			}
			Err(_) => {
				tracing::warn!(timeout_ms = self.lookup_timeout.as_millis() as u64, "destination lookup timed out");
				Decision::Fail(FailReason::WriteError)
			}
		}
	}
}
