//! In-memory session registry.
//!
//! Holds at most one [`SessionEntry`] per tenant together with a per-tenant
//! lifecycle lock. Every lifecycle step (starting a session, handling an
//! event, tearing down, wiping) runs under that tenant's lock; the map itself
//! is only locked for short synchronous reads and writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use pairlink_protocol::SessionStatus;
use parking_lot::Mutex;
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::info;

use crate::client::ProtocolClient;
use crate::pairing::PairingObservers;

/// Lifecycle state of one tenant's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
	Uninitialized,
	Initializing,
	AwaitingPairing,
	Authenticated,
	Ready,
	Disconnected,
	Reconnecting,
	Destroyed,
}

impl SessionState {
	pub fn as_str(self) -> &'static str {
		match self {
			SessionState::Uninitialized => "uninitialized",
			SessionState::Initializing => "initializing",
			SessionState::AwaitingPairing => "awaiting_pairing",
			SessionState::Authenticated => "authenticated",
			SessionState::Ready => "ready",
			SessionState::Disconnected => "disconnected",
			SessionState::Reconnecting => "reconnecting",
			SessionState::Destroyed => "destroyed",
		}
	}

	/// States in which a session is on its way to `Ready`.
	pub fn is_starting(self) -> bool {
		matches!(
			self,
			SessionState::Initializing | SessionState::AwaitingPairing | SessionState::Authenticated | SessionState::Reconnecting
		)
	}
}

impl std::fmt::Display for SessionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Resident session of one tenant.
pub struct SessionEntry {
	pub tenant: String,
	/// Distinguishes this entry from earlier and later entries for the same tenant.
	pub generation: u64,
	pub client: Arc<dyn ProtocolClient>,
	state: SessionState,
	pairing_code: Option<String>,
	pub observers: PairingObservers,
	/// When the handle last reported a valid identity.
	pub last_probe: Option<Instant>,
}

impl SessionEntry {
	/// A new entry in `Initializing`.
	pub fn new(tenant: impl Into<String>, generation: u64, client: Arc<dyn ProtocolClient>) -> Self {
		let mut entry = Self {
			tenant: tenant.into(),
			generation,
			client,
			state: SessionState::Uninitialized,
			pairing_code: None,
			observers: PairingObservers::default(),
			last_probe: None,
		};
		entry.transition(SessionState::Initializing);
		entry
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn pairing_code(&self) -> Option<&str> {
		self.pairing_code.as_deref()
	}

	/// Moves to `next`, clearing the pairing code unless `next` is `AwaitingPairing`.
	pub fn transition(&mut self, next: SessionState) {
		if next != SessionState::AwaitingPairing {
			self.pairing_code = None;
		}
		if next != SessionState::Ready {
			self.last_probe = None;
		}
		if self.state != next {
			info!(
				target: "pairlink.session",
				tenant = %self.tenant,
				generation = self.generation,
				from = %self.state,
				to = %next,
				"session state changed"
			);
			self.state = next;
		}
	}

	/// Stores a new pairing code, superseding any earlier one.
	pub fn set_pairing_code(&mut self, code: String) {
		self.transition(SessionState::AwaitingPairing);
		self.pairing_code = Some(code);
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot {
			tenant: self.tenant.clone(),
			generation: self.generation,
			state: self.state,
			pairing_code: self.pairing_code.clone(),
		}
	}
}

/// Read-only copy of an entry's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
	pub tenant: String,
	pub generation: u64,
	pub state: SessionState,
	pub pairing_code: Option<String>,
}

impl SessionSnapshot {
	/// Status reported to pollers for this snapshot.
	pub fn status(&self) -> SessionStatus {
		match self.state {
			SessionState::Ready => SessionStatus::ready(),
			SessionState::AwaitingPairing => SessionStatus::initializing(self.pairing_code.clone()),
			state if state.is_starting() => SessionStatus::initializing(None),
			_ => SessionStatus::idle(),
		}
	}
}

/// Snapshot plus a borrowed client handle, for the duration of one call.
pub(crate) struct EntryView {
	pub snapshot: SessionSnapshot,
	pub client: Arc<dyn ProtocolClient>,
	pub last_probe: Option<Instant>,
}

type LockMap = Arc<Mutex<HashMap<String, Arc<TokioMutex<()>>>>>;

/// Holds one tenant's lifecycle lock. On release the lock is dropped from
/// the registry when nobody else holds or waits for it.
pub struct TenantGuard {
	tenant: String,
	guard: Option<OwnedMutexGuard<()>>,
	locks: LockMap,
}

impl Drop for TenantGuard {
	fn drop(&mut self) {
		let mut locks = self.locks.lock();
		drop(self.guard.take());
		// New holders clone under the map lock, so a count of one is final.
		if locks.get(&self.tenant).is_some_and(|lock| Arc::strong_count(lock) == 1) {
			locks.remove(&self.tenant);
		}
	}
}

#[derive(Default)]
pub struct SessionRegistry {
	entries: Mutex<HashMap<String, SessionEntry>>,
	locks: LockMap,
	generations: AtomicU64,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Acquires `tenant`'s lifecycle lock.
	pub async fn lock_tenant(&self, tenant: &str) -> TenantGuard {
		let lock = Arc::clone(self.locks.lock().entry(tenant.to_string()).or_default());
		let guard = lock.lock_owned().await;
		TenantGuard {
			tenant: tenant.to_string(),
			guard: Some(guard),
			locks: Arc::clone(&self.locks),
		}
	}

	/// Tenants with a lifecycle lock currently held or awaited.
	pub fn locked_tenants(&self) -> usize {
		self.locks.lock().len()
	}

	pub fn next_generation(&self) -> u64 {
		self.generations.fetch_add(1, Ordering::SeqCst) + 1
	}

	pub fn snapshot(&self, tenant: &str) -> Option<SessionSnapshot> {
		self.entries.lock().get(tenant).map(SessionEntry::snapshot)
	}

	pub(crate) fn view(&self, tenant: &str) -> Option<EntryView> {
		self.entries.lock().get(tenant).map(|entry| EntryView {
			snapshot: entry.snapshot(),
			client: Arc::clone(&entry.client),
			last_probe: entry.last_probe,
		})
	}

	/// Client of the entry with `generation`, if it is still resident.
	pub fn client(&self, tenant: &str, generation: u64) -> Option<Arc<dyn ProtocolClient>> {
		self.entries
			.lock()
			.get(tenant)
			.filter(|entry| entry.generation == generation)
			.map(|entry| Arc::clone(&entry.client))
	}

	/// Inserts `entry`, returning the entry it replaced.
	pub fn insert(&self, entry: SessionEntry) -> Option<SessionEntry> {
		self.entries.lock().insert(entry.tenant.clone(), entry)
	}

	pub fn remove(&self, tenant: &str) -> Option<SessionEntry> {
		self.entries.lock().remove(tenant)
	}

	/// Removes the entry only if it still has `generation`.
	pub fn remove_if(&self, tenant: &str, generation: u64) -> Option<SessionEntry> {
		let mut entries = self.entries.lock();
		if entries.get(tenant).is_some_and(|entry| entry.generation == generation) {
			entries.remove(tenant)
		} else {
			None
		}
	}

	/// Applies `f` to the entry only if it still has `generation`.
	pub fn update<R>(&self, tenant: &str, generation: u64, f: impl FnOnce(&mut SessionEntry) -> R) -> Option<R> {
		self.entries
			.lock()
			.get_mut(tenant)
			.filter(|entry| entry.generation == generation)
			.map(f)
	}

	/// Resident tenant ids, sorted.
	pub fn tenants(&self) -> Vec<String> {
		let mut tenants: Vec<String> = self.entries.lock().keys().cloned().collect();
		tenants.sort();
		tenants
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
