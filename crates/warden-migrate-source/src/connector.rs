// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use std::sync::Arc;
use warden_migrate_core::{PageCursor, SourceCredential, SourceUserRecord};

use crate::error::SourceError;

/// One page of source users.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePage {
	pub records: Vec<SourceUserRecord>,
	/// `None` on the last page.
	pub next: Option<PageCursor>,
}

/// Read access to a source provider, bound to one endpoint and credential.
///
/// Pagination is restartable: calling [`SourceConnector::page`] again with a
/// cursor it previously returned yields the same page.
#[async_trait]
pub trait SourceConnector: Send + Sync {
	/// Cheap authenticated call. Fails with `InvalidCredential` or `Unreachable`.
	async fn validate(&self) -> Result<(), SourceError>;

	/// Provider's user count, if it offers one.
	async fn count(&self) -> Option<u64>;

	/// Page at `cursor`, or the first page for `None`.
	async fn page(&self, cursor: Option<&PageCursor>) -> Result<SourcePage, SourceError>;

	/// Single user by provider id.
	async fn fetch_user(&self, source_id: &str) -> Result<Option<SourceUserRecord>, SourceError>;
}

/// Builds connectors for operator-supplied endpoints.
pub trait ConnectorFactory: Send + Sync {
	fn connect(
		&self,
		source_url: &str,
		credential: &SourceCredential,
	) -> Result<Arc<dyn SourceConnector>, SourceError>;
}
