//! Session lifecycle controller.
//!
//! [`SessionManager`] owns the registry and drives each tenant through
//!
//! ```text
//! Uninitialized -> Initializing -> AwaitingPairing -> Authenticated -> Ready
//!                       |                                               |
//!                       +------------------> Ready                      v
//!                                        Initializing <- Reconnecting <- Disconnected
//! ```
//!
//! Client events arrive on a per-session channel and are handled one at a
//! time under the tenant's lifecycle lock, as are explicit requests. Each
//! entry carries a generation; work scheduled for an entry that has since been
//! replaced or removed finds no match and does nothing.

use std::collections::HashSet;
use std::sync::Arc;

use pairlink_protocol::{
	ClientEvent, ClientInfo, REASON_AUTH_FAILURE, REASON_SESSION_RESET, REASON_USER_DISCONNECT, TenantPatch, chat_address,
	now_ms,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::capture::MessageCaptureSink;
use crate::client::{ClientFactory, ClientHandle, ProtocolClient};
use crate::config::ManagerConfig;
use crate::credentials::{CredentialStore, validate_tenant_id};
use crate::error::{Error, Result};
use crate::pairing::{PairingObserver, PairingSubscription, encode_pairing_code};
use crate::registry::{EntryView, SessionEntry, SessionRegistry, SessionSnapshot, SessionState};
use crate::store::DocumentStore;

/// Disconnect reason used when a Ready handle stops reporting an identity.
pub const REASON_PROBE_FAILED: &str = "probe_failed";
/// Disconnect reason used when handling a client event failed.
pub const REASON_HANDLER_ERROR: &str = "handler_error";

/// Why a session is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionIntent {
	/// The tenant asked to connect; may start a pairing flow.
	Explicit,
	/// Resume only if credentials are already on disk.
	Passive,
	/// Scheduled recovery after a disconnect.
	Reconnect,
}

/// Multi-tenant session manager. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
	pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
	pub(crate) factory: Arc<dyn ClientFactory>,
	pub(crate) credentials: CredentialStore,
	pub(crate) store: Arc<dyn DocumentStore>,
	pub(crate) capture: MessageCaptureSink,
	pub(crate) config: ManagerConfig,
	pub(crate) registry: SessionRegistry,
	/// Tenants with a lazy resume in flight.
	pub(crate) resuming: Mutex<HashSet<String>>,
}

impl SessionManager {
	pub fn new(
		factory: Arc<dyn ClientFactory>,
		credentials: CredentialStore,
		store: Arc<dyn DocumentStore>,
		config: ManagerConfig,
	) -> Self {
		let credentials = credentials.with_wipe_retry(config.wipe_attempts, config.wipe_backoff);
		Self {
			inner: Arc::new(Inner {
				factory,
				credentials,
				capture: MessageCaptureSink::new(Arc::clone(&store)),
				store,
				config,
				registry: SessionRegistry::new(),
				resuming: Mutex::new(HashSet::new()),
			}),
		}
	}

	pub fn config(&self) -> &ManagerConfig {
		&self.inner.config
	}

	pub fn credentials(&self) -> &CredentialStore {
		&self.inner.credentials
	}

	pub fn store(&self) -> &Arc<dyn DocumentStore> {
		&self.inner.store
	}

	/// Current state of `tenant`'s resident entry.
	pub fn snapshot(&self, tenant: &str) -> Option<SessionSnapshot> {
		self.inner.registry.snapshot(tenant)
	}

	/// Resident tenant ids, sorted.
	pub fn resident_tenants(&self) -> Vec<String> {
		self.inner.registry.tenants()
	}

	/// Returns the tenant's session, starting one if needed.
	///
	/// Never waits for initialization to finish: a started session is returned
	/// in `Initializing` and progresses in the background. With
	/// [`SessionIntent::Passive`] nothing is started unless credentials exist,
	/// in which case `None` is returned.
	pub async fn request_session(&self, tenant: &str, intent: SessionIntent) -> Result<Option<SessionSnapshot>> {
		validate_tenant_id(tenant)?;
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		self.request_locked(tenant, intent).await
	}

	/// Explicit connect: the tenant wants a session, pairing if necessary.
	pub async fn connect(&self, tenant: &str) -> Result<SessionSnapshot> {
		self.request_session(tenant, SessionIntent::Explicit)
			.await?
			.ok_or_else(|| Error::NotReady { tenant: tenant.to_string() })
	}

	async fn request_locked(&self, tenant: &str, intent: SessionIntent) -> Result<Option<SessionSnapshot>> {
		let mut torn_down = false;
		if let Some(view) = self.inner.registry.view(tenant) {
			match view.snapshot.state {
				SessionState::Ready => {
					if self.probe(tenant, &view).await {
						return Ok(Some(view.snapshot));
					}
					info!(target: "pairlink.session", tenant, "ready session failed liveness probe; restarting");
					torn_down = self.teardown_locked(tenant, view.snapshot.generation).await;
				}
				SessionState::Initializing | SessionState::AwaitingPairing | SessionState::Authenticated => {
					debug!(target: "pairlink.session", tenant, state = %view.snapshot.state, "reusing session in progress");
					return Ok(Some(view.snapshot));
				}
				state => {
					debug!(target: "pairlink.session", tenant, %state, "replacing stale session");
					torn_down = self.teardown_locked(tenant, view.snapshot.generation).await;
				}
			}
		}

		if intent == SessionIntent::Passive && !self.inner.credentials.exists(tenant) {
			debug!(target: "pairlink.session", tenant, "no credentials; waiting for an explicit connect");
			return Ok(None);
		}

		if torn_down {
			self.settle(tenant).await;
		}
		self.start_locked(tenant, intent).await.map(Some)
	}

	async fn start_locked(&self, tenant: &str, intent: SessionIntent) -> Result<SessionSnapshot> {
		let auth_dir = self.inner.credentials.path_for(tenant);
		let ClientHandle { client, events } = self.inner.factory.create(tenant, &auth_dir).map_err(Error::Client)?;

		let generation = self.inner.registry.next_generation();
		let entry = SessionEntry::new(tenant, generation, Arc::clone(&client));
		let snapshot = entry.snapshot();
		self.inner.registry.insert(entry);
		info!(
			target: "pairlink.session",
			tenant,
			generation,
			?intent,
			resume = self.inner.credentials.exists(tenant),
			"starting session"
		);

		self.write_patch(tenant, TenantPatch::connecting_started(now_ms())).await;

		self.spawn_event_pump(tenant, generation, events);
		self.spawn_initialize(tenant, generation, client);
		self.spawn_stall_watch(tenant, generation);

		Ok(snapshot)
	}

	fn spawn_event_pump(&self, tenant: &str, generation: u64, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
		let manager = self.clone();
		let tenant = tenant.to_string();
		tokio::spawn(async move {
			while let Some(event) = events.recv().await {
				manager.handle_event(&tenant, generation, event).await;
			}
			debug!(target: "pairlink.session", tenant = %tenant, generation, "event stream closed");
		});
	}

	fn spawn_initialize(&self, tenant: &str, generation: u64, client: Arc<dyn ProtocolClient>) {
		let manager = self.clone();
		let tenant = tenant.to_string();
		tokio::spawn(async move {
			if let Err(err) = client.initialize().await {
				manager.initialize_failed(&tenant, generation, err.to_string()).await;
			}
		});
	}

	fn spawn_stall_watch(&self, tenant: &str, generation: u64) {
		let manager = self.clone();
		let tenant = tenant.to_string();
		let window = self.inner.config.stall_window;
		tokio::spawn(async move {
			tokio::time::sleep(window).await;
			let stalled = manager
				.inner
				.registry
				.snapshot(&tenant)
				.is_some_and(|s| s.generation == generation && s.state == SessionState::Initializing);
			if stalled {
				warn!(
					target: "pairlink.session",
					tenant = %tenant,
					generation,
					waited_secs = window.as_secs(),
					"no pairing code yet; session still initializing"
				);
			}
		});
	}

	async fn initialize_failed(&self, tenant: &str, generation: u64, error: String) {
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		let Some(mut entry) = self.inner.registry.remove_if(tenant, generation) else {
			debug!(target: "pairlink.session", tenant, generation, error = %error, "initialize failed for a replaced session");
			return;
		};
		warn!(target: "pairlink.session", tenant, generation, error = %error, "initialize failed");
		entry.transition(SessionState::Destroyed);
		destroy_client(tenant, entry.client.as_ref()).await;
		self.write_patch(tenant, TenantPatch::connecting_failed()).await;
	}

	/// Handles one client event for the entry with `generation`.
	pub(crate) async fn handle_event(&self, tenant: &str, generation: u64, event: ClientEvent) {
		if event.is_message() {
			match self.inner.registry.client(tenant, generation) {
				Some(client) => {
					let capture = self.inner.capture.clone();
					let tenant = tenant.to_string();
					tokio::spawn(async move {
						capture.capture(&tenant, client.as_ref(), &event).await;
					});
				}
				None => debug!(target: "pairlink.capture", tenant, "message for a replaced session ignored"),
			}
			return;
		}

		let _guard = self.inner.registry.lock_tenant(tenant).await;
		let Some(view) = self.inner.registry.view(tenant).filter(|v| v.snapshot.generation == generation) else {
			debug!(target: "pairlink.session", tenant, generation, event = event.name(), "event for a replaced session ignored");
			return;
		};

		debug!(target: "pairlink.session", tenant, generation, event = event.name(), "client event");
		let result = match event {
			ClientEvent::Qr { code } => self.on_pairing_code(tenant, generation, &code).await,
			ClientEvent::Authenticated => self.on_authenticated(tenant, generation).await,
			ClientEvent::Ready => self.on_ready(tenant, &view).await,
			ClientEvent::AuthFailure { message } => self.on_auth_failure(tenant, generation, &message).await,
			ClientEvent::Disconnected { reason } => self.on_disconnected(tenant, &view, &reason).await,
			ClientEvent::Message(_) | ClientEvent::MessageCreate(_) => Ok(()),
		};

		if let Err(err) = result {
			warn!(target: "pairlink.session", tenant, generation, error = %err, "event handler failed; degrading session");
			self.mark_disconnected_locked(tenant, generation, REASON_HANDLER_ERROR).await;
		}
	}

	async fn on_pairing_code(&self, tenant: &str, generation: u64, raw: &str) -> Result<()> {
		let encoded = encode_pairing_code(raw)?;
		let observers = self.inner.registry.update(tenant, generation, |entry| {
			entry.set_pairing_code(encoded.clone());
			entry.observers.clone()
		});
		if let Some(observers) = observers {
			debug!(target: "pairlink.session", tenant, observers = observers.len(), "pairing code issued");
			observers.notify(&encoded);
		}
		self.write_patch(tenant, TenantPatch::pairing_code_issued(now_ms())).await;
		Ok(())
	}

	async fn on_authenticated(&self, tenant: &str, generation: u64) -> Result<()> {
		self.inner
			.registry
			.update(tenant, generation, |entry| entry.transition(SessionState::Authenticated));
		self.write_patch(tenant, TenantPatch::authenticated(now_ms())).await;
		Ok(())
	}

	async fn on_ready(&self, tenant: &str, view: &EntryView) -> Result<()> {
		let generation = view.snapshot.generation;
		self.inner
			.registry
			.update(tenant, generation, |entry| entry.transition(SessionState::Ready));

		let info = match self.fetch_identity(tenant, view.client.as_ref()).await {
			Some(info) => {
				self.inner
					.registry
					.update(tenant, generation, |entry| entry.last_probe = Some(Instant::now()));
				info
			}
			None => {
				warn!(target: "pairlink.session", tenant, "ready without a reported identity");
				ClientInfo::default()
			}
		};
		info!(target: "pairlink.session", tenant, phone = ?info.wid, "session ready");
		self.write_patch(tenant, TenantPatch::ready(now_ms(), &info)).await;
		Ok(())
	}

	async fn on_auth_failure(&self, tenant: &str, generation: u64, message: &str) -> Result<()> {
		warn!(target: "pairlink.session", tenant, generation, error = %message, "authentication failed; wiping credentials");
		if let Some(mut entry) = self.inner.registry.remove_if(tenant, generation) {
			entry.transition(SessionState::Destroyed);
			destroy_client(tenant, entry.client.as_ref()).await;
			self.settle(tenant).await;
		}
		self.inner.credentials.wipe(tenant).await;
		self.write_patch(tenant, TenantPatch::wiped(now_ms(), REASON_AUTH_FAILURE)).await;
		Ok(())
	}

	async fn on_disconnected(&self, tenant: &str, view: &EntryView, reason: &str) -> Result<()> {
		let generation = view.snapshot.generation;
		match view.snapshot.state {
			SessionState::Ready | SessionState::Authenticated => {
				info!(target: "pairlink.session", tenant, reason, "transport lost");
				self.mark_disconnected_locked(tenant, generation, reason).await;
			}
			state => {
				// Never paired or already recovering; wait for the next request.
				info!(target: "pairlink.session", tenant, %state, reason, "disconnected before ready; tearing down");
				self.teardown_locked(tenant, generation).await;
				self.write_patch(tenant, TenantPatch::disconnected(now_ms(), reason)).await;
			}
		}
		Ok(())
	}

	/// Marks the entry `Disconnected` and schedules one reconnection attempt.
	pub(crate) async fn mark_disconnected_locked(&self, tenant: &str, generation: u64, reason: &str) {
		let marked = self
			.inner
			.registry
			.update(tenant, generation, |entry| entry.transition(SessionState::Disconnected));
		if marked.is_none() {
			return;
		}
		self.write_patch(tenant, TenantPatch::disconnected(now_ms(), reason)).await;
		self.schedule_reconnect(tenant, generation);
	}

	fn schedule_reconnect(&self, tenant: &str, generation: u64) {
		let manager = self.clone();
		let tenant = tenant.to_string();
		let delay = self.inner.config.reconnect_delay;
		debug!(target: "pairlink.session", tenant, generation, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			manager.reconnect(&tenant, generation).await;
		});
	}

	async fn reconnect(&self, tenant: &str, generation: u64) {
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		let Some(mut entry) = self.inner.registry.remove_if(tenant, generation) else {
			debug!(target: "pairlink.session", tenant, generation, "reconnect skipped; session already replaced");
			return;
		};
		if entry.state() != SessionState::Disconnected {
			debug!(target: "pairlink.session", tenant, state = %entry.state(), "reconnect skipped; session recovered");
			self.inner.registry.insert(entry);
			return;
		}

		entry.transition(SessionState::Reconnecting);
		destroy_client(tenant, entry.client.as_ref()).await;
		entry.transition(SessionState::Destroyed);
		self.settle(tenant).await;

		if let Err(err) = self.request_locked(tenant, SessionIntent::Reconnect).await {
			warn!(target: "pairlink.session", tenant, error = %err, "reconnect failed");
		}
	}

	/// Removes and destroys the entry with `generation`. No wipe.
	async fn teardown_locked(&self, tenant: &str, generation: u64) -> bool {
		match self.inner.registry.remove_if(tenant, generation) {
			Some(mut entry) => {
				entry.transition(SessionState::Destroyed);
				destroy_client(tenant, entry.client.as_ref()).await;
				true
			}
			None => false,
		}
	}

	/// Lets a destroyed handle release its credential directory. Called with
	/// the tenant lock held, before the directory is wiped or reused.
	async fn settle(&self, tenant: &str) {
		let delay = self.inner.config.settle_delay;
		debug!(target: "pairlink.session", tenant, delay_ms = delay.as_millis() as u64, "waiting for destroyed handle to settle");
		tokio::time::sleep(delay).await;
	}

	/// Liveness probe for a `Ready` entry, trusting a recent success.
	pub(crate) async fn probe(&self, tenant: &str, view: &EntryView) -> bool {
		let ttl = self.inner.config.probe_ttl;
		if view.last_probe.is_some_and(|at| at.elapsed() < ttl) {
			return true;
		}
		let alive = self.fetch_identity(tenant, view.client.as_ref()).await.is_some();
		if alive {
			self.inner.registry.update(tenant, view.snapshot.generation, |entry| {
				entry.last_probe = Some(Instant::now())
			});
		}
		alive
	}

	/// Asks the client for its identity, retrying transient failures.
	async fn fetch_identity(&self, tenant: &str, client: &dyn ProtocolClient) -> Option<ClientInfo> {
		let attempts = self.inner.config.probe_attempts.max(1);
		for attempt in 1..=attempts {
			match tokio::time::timeout(self.inner.config.probe_timeout, client.info()).await {
				Ok(Ok(Some(info))) if info.has_identity() => return Some(info),
				Ok(Ok(_)) => debug!(target: "pairlink.session", tenant, attempt, "client reported no identity"),
				Ok(Err(err)) => debug!(target: "pairlink.session", tenant, attempt, error = %err, "identity probe failed"),
				Err(_) => debug!(target: "pairlink.session", tenant, attempt, "identity probe timed out"),
			}
			if attempt < attempts {
				tokio::time::sleep(self.inner.config.probe_backoff).await;
			}
		}
		None
	}

	/// Tears the session down without touching credentials. Idempotent.
	pub async fn destroy(&self, tenant: &str) -> Result<()> {
		validate_tenant_id(tenant)?;
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		self.destroy_locked(tenant).await;
		Ok(())
	}

	async fn destroy_locked(&self, tenant: &str) -> bool {
		match self.inner.registry.remove(tenant) {
			Some(mut entry) => {
				entry.transition(SessionState::Destroyed);
				destroy_client(tenant, entry.client.as_ref()).await;
				true
			}
			None => false,
		}
	}

	/// Voluntary disconnect: destroy, keep credentials, record the reason.
	pub async fn disconnect(&self, tenant: &str) -> Result<()> {
		validate_tenant_id(tenant)?;
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		self.destroy_locked(tenant).await;
		info!(target: "pairlink.session", tenant, "disconnected on request");
		self.write_patch(tenant, TenantPatch::disconnected(now_ms(), REASON_USER_DISCONNECT))
			.await;
		Ok(())
	}

	/// Destroys the session and wipes its credentials; the next connect pairs afresh.
	pub async fn reset(&self, tenant: &str) -> Result<()> {
		validate_tenant_id(tenant)?;
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		if self.destroy_locked(tenant).await {
			self.settle(tenant).await;
		}
		self.inner.credentials.wipe(tenant).await;
		info!(target: "pairlink.session", tenant, "session reset");
		self.write_patch(tenant, TenantPatch::wiped(now_ms(), REASON_SESSION_RESET)).await;
		Ok(())
	}

	/// Destroys every resident session.
	pub async fn shutdown_all(&self) {
		let tenants = self.inner.registry.tenants();
		info!(target: "pairlink.session", sessions = tenants.len(), "shutting down sessions");
		for tenant in tenants {
			let _guard = self.inner.registry.lock_tenant(&tenant).await;
			self.destroy_locked(&tenant).await;
		}
	}

	/// Sends `body` to `peer` on the tenant's Ready session.
	///
	/// Fails with [`Error::NotReady`] instead of queuing when the session is
	/// not ready; a passive resume is started first if credentials exist.
	pub async fn send(&self, tenant: &str, peer: &str, body: &str) -> Result<()> {
		let chat_id = chat_address(peer).ok_or_else(|| Error::InvalidPeer(peer.to_string()))?;
		let snapshot = self.request_session(tenant, SessionIntent::Passive).await?;

		let client = snapshot
			.filter(|s| s.state == SessionState::Ready)
			.and_then(|s| self.inner.registry.client(tenant, s.generation))
			.ok_or_else(|| Error::NotReady { tenant: tenant.to_string() })?;

		client.send_message(&chat_id, body).await.map_err(Error::Transport)?;
		debug!(target: "pairlink.session", tenant, chat_id = %chat_id, "message sent");
		Ok(())
	}

	/// Sends `body` to the tenant's own persisted phone number.
	pub async fn send_to_self(&self, tenant: &str, body: &str) -> Result<()> {
		validate_tenant_id(tenant)?;
		let phone = self
			.inner
			.store
			.tenant(tenant)
			.await?
			.and_then(|doc| doc.phone_number)
			.ok_or_else(|| Error::InvalidPeer(format!("tenant {tenant} has no phone number on record")))?;
		self.send(tenant, &phone, body).await
	}

	/// Registers a pairing-code observer on the resident entry.
	///
	/// A code that is already present is delivered to `observer` before this
	/// returns. Returns `None` when no entry is resident.
	pub async fn subscribe_pairing(&self, tenant: &str, observer: PairingObserver) -> Result<Option<PairingSubscription>> {
		validate_tenant_id(tenant)?;
		let _guard = self.inner.registry.lock_tenant(tenant).await;
		let Some(snapshot) = self.inner.registry.snapshot(tenant) else {
			return Ok(None);
		};
		let subscription = self
			.inner
			.registry
			.update(tenant, snapshot.generation, |entry| entry.observers.register(Arc::clone(&observer)));
		if subscription.is_some() {
			if let Some(code) = snapshot.pairing_code.as_deref() {
				observer(code);
			}
		}
		Ok(subscription)
	}

	async fn write_patch(&self, tenant: &str, patch: TenantPatch) {
		if let Err(err) = self.inner.store.update_tenant(tenant, &patch).await {
			warn!(target: "pairlink.session", tenant, error = %err, "failed to write tenant document");
		}
	}
}

async fn destroy_client(tenant: &str, client: &dyn ProtocolClient) {
	if let Err(err) = client.destroy().await {
		warn!(target: "pairlink.session", tenant, error = %err, "client destroy failed");
	}
}
