// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory registry of live import sessions.
//!
//! Each session has one owner at a time: whoever holds its slot guard may
//! transition it. Readers never touch the slot; they read the latest snapshot,
//! which the owner republishes after every transition and committed batch.
//!
//! Settled sessions leave the registry once archived. Anything else that sits
//! unowned past the idle TTL is dropped by the sweep, credential included.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, OwnedMutexGuard, RwLock};
use warden_migrate::{AbortSignal, ProgressObserver};
use warden_migrate_core::{ImportSession, ImportSessionId, TenantId};

use crate::error::SessionError;

pub struct SessionEntry {
	pub id: ImportSessionId,
	pub tenant_id: TenantId,
	slot: Arc<Mutex<ImportSession>>,
	snapshot: watch::Sender<ImportSession>,
	abort: AbortSignal,
}

impl SessionEntry {
	fn new(session: ImportSession) -> Self {
		let (snapshot, _) = watch::channel(session.clone());
		Self {
			id: session.id,
			tenant_id: session.tenant_id,
			slot: Arc::new(Mutex::new(session)),
			snapshot,
			abort: AbortSignal::new(),
		}
	}

	/// Latest published state.
	pub fn snapshot(&self) -> ImportSession {
		self.snapshot.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<ImportSession> {
		self.snapshot.subscribe()
	}

	/// Take ownership of the session without waiting.
	pub fn claim(&self) -> Result<OwnedMutexGuard<ImportSession>, SessionError> {
		self
			.slot
			.clone()
			.try_lock_owned()
			.map_err(|_| SessionError::Busy(self.id))
	}

	pub fn abort_signal(&self) -> &AbortSignal {
		&self.abort
	}

	fn is_owned(&self) -> bool {
		self.slot.try_lock().is_err()
	}

	/// Time since the last published change.
	fn idle_for(&self) -> Duration {
		Utc::now()
			.signed_duration_since(self.snapshot.borrow().updated_at)
			.to_std()
			.unwrap_or_default()
	}
}

impl ProgressObserver for SessionEntry {
	fn on_update(&self, session: &ImportSession) {
		self.snapshot.send_replace(session.clone());
	}
}

#[derive(Default)]
pub struct SessionRegistry {
	sessions: RwLock<HashMap<ImportSessionId, Arc<SessionEntry>>>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn create(&self, tenant_id: TenantId) -> Arc<SessionEntry> {
		let entry = Arc::new(SessionEntry::new(ImportSession::new(tenant_id)));
		self.sessions.write().await.insert(entry.id, entry.clone());
		tracing::debug!(session_id = %entry.id, tenant_id = %tenant_id, "import session created");
		entry
	}

	/// Sessions of other tenants are reported as missing.
	pub async fn get(
		&self,
		tenant_id: &TenantId,
		id: &ImportSessionId,
	) -> Result<Arc<SessionEntry>, SessionError> {
		self
			.sessions
			.read()
			.await
			.get(id)
			.filter(|entry| entry.tenant_id == *tenant_id)
			.cloned()
			.ok_or(SessionError::NotFound(*id))
	}

	pub async fn remove(&self, id: &ImportSessionId) -> bool {
		let removed = self.sessions.write().await.remove(id).is_some();
		if removed {
			tracing::debug!(session_id = %id, "import session released");
		}
		removed
	}

	/// Drop unowned sessions idle for at least `ttl`. Returns how many went.
	pub async fn evict_idle(&self, ttl: Duration) -> usize {
		let mut sessions = self.sessions.write().await;
		let before = sessions.len();
		sessions.retain(|_, entry| entry.is_owned() || entry.idle_for() < ttl);
		let evicted = before - sessions.len();
		if evicted > 0 {
			tracing::info!(evicted, remaining = sessions.len(), "evicted idle import sessions");
		}
		evicted
	}

	/// Run [`Self::evict_idle`] every `interval`.
	pub fn spawn_sweep_task(
		self: Arc<Self>,
		interval: Duration,
		ttl: Duration,
	) -> tokio::task::JoinHandle<()> {
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.tick().await;

			loop {
				ticker.tick().await;
				self.evict_idle(ttl).await;
			}
		})
	}

	pub async fn len(&self) -> usize {
		self.sessions.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}
