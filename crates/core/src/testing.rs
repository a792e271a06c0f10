//! In-process protocol client for exercising the session lifecycle without a
//! bridge process.
//!
//! [`FakeFactory`] hands out [`FakeClient`]s. In the default scripted mode a
//! client's `initialize` behaves like the real protocol: if the credential
//! directory holds [`CREDENTIALS_FILE`] it resumes silently (`authenticated`
//! then `ready`), otherwise it issues a pairing code. [`FakeClient::pair`]
//! simulates the tenant scanning the code.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pairlink_protocol::{ClientEvent, ClientInfo, Contact, MediaPayload};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::client::{ClientFactory, ClientHandle, ProtocolClient};
use crate::error::ClientError;

/// Marker file the fake client treats as persisted credentials.
pub const CREDENTIALS_FILE: &str = "creds.json";

/// Writes fake credentials for `wid` into `auth_dir`.
pub fn seed_credentials(auth_dir: &Path, wid: &str) -> std::io::Result<()> {
	std::fs::create_dir_all(auth_dir)?;
	std::fs::write(auth_dir.join(CREDENTIALS_FILE), wid)
}

fn stored_identity(auth_dir: &Path) -> Option<String> {
	std::fs::read_to_string(auth_dir.join(CREDENTIALS_FILE))
		.ok()
		.map(|wid| wid.trim().to_string())
		.filter(|wid| !wid.is_empty())
}

pub struct FakeClient {
	tenant: String,
	auth_dir: PathBuf,
	events: mpsc::UnboundedSender<ClientEvent>,
	scripted: bool,
	initialize_calls: AtomicUsize,
	initialize_error: Mutex<Option<String>>,
	codes_issued: AtomicUsize,
	identity: Mutex<Option<ClientInfo>>,
	info_delay: Mutex<Option<Duration>>,
	destroyed: AtomicBool,
	fail_sends: AtomicBool,
	sent: Mutex<Vec<(String, String)>>,
	media: Mutex<Option<MediaPayload>>,
	contact: Mutex<Option<Contact>>,
}

impl FakeClient {
	fn new(tenant: &str, auth_dir: &Path, scripted: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<ClientEvent>) {
		let (events, rx) = mpsc::unbounded_channel();
		let client = Arc::new(Self {
			tenant: tenant.to_string(),
			auth_dir: auth_dir.to_path_buf(),
			events,
			scripted,
			initialize_calls: AtomicUsize::new(0),
			initialize_error: Mutex::new(None),
			codes_issued: AtomicUsize::new(0),
			identity: Mutex::new(None),
			info_delay: Mutex::new(None),
			destroyed: AtomicBool::new(false),
			fail_sends: AtomicBool::new(false),
			sent: Mutex::new(Vec::new()),
			media: Mutex::new(None),
			contact: Mutex::new(None),
		});
		(client, rx)
	}

	/// A client nobody listens to, for tests that call it directly.
	pub fn detached(tenant: &str) -> Arc<Self> {
		Self::new(tenant, Path::new(""), false).0
	}

	pub fn tenant(&self) -> &str {
		&self.tenant
	}

	/// Pushes an event as if the remote side emitted it.
	pub fn emit(&self, event: ClientEvent) {
		let _ = self.events.send(event);
	}

	/// Emits a fresh pairing code.
	pub fn issue_code(&self) {
		let n = self.codes_issued.fetch_add(1, Ordering::SeqCst) + 1;
		self.emit(ClientEvent::Qr {
			code: format!("{}@pairing-code-{n}", self.tenant),
		});
	}

	/// Simulates a successful scan: persists credentials, then `authenticated` and `ready`.
	pub fn pair(&self, wid: &str) {
		if let Err(err) = seed_credentials(&self.auth_dir, wid) {
			panic!("cannot seed credentials in {}: {err}", self.auth_dir.display());
		}
		self.set_identity(Some(wid));
		self.emit(ClientEvent::Authenticated);
		self.emit(ClientEvent::Ready);
	}

	/// Sets the identity reported by `info`; `None` makes liveness probes fail.
	pub fn set_identity(&self, wid: Option<&str>) {
		*self.identity.lock() = wid.map(|wid| ClientInfo {
			wid: Some(wid.to_string()),
			pushname: Some(format!("{} owner", self.tenant)),
		});
	}

	/// Makes `info` take `delay` before answering, like a hung bridge.
	pub fn set_info_delay(&self, delay: Option<Duration>) {
		*self.info_delay.lock() = delay;
	}

	pub fn set_initialize_error(&self, error: Option<&str>) {
		*self.initialize_error.lock() = error.map(str::to_string);
	}

	pub fn set_fail_sends(&self, fail: bool) {
		self.fail_sends.store(fail, Ordering::SeqCst);
	}

	pub fn set_media(&self, media: Option<MediaPayload>) {
		*self.media.lock() = media;
	}

	pub fn set_contact(&self, contact: Option<Contact>) {
		*self.contact.lock() = contact;
	}

	pub fn initialize_calls(&self) -> usize {
		self.initialize_calls.load(Ordering::SeqCst)
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::SeqCst)
	}

	/// `(chat_id, body)` of every successful send.
	pub fn sent(&self) -> Vec<(String, String)> {
		self.sent.lock().clone()
	}
}

#[async_trait]
impl ProtocolClient for FakeClient {
	async fn initialize(&self) -> Result<(), ClientError> {
		self.initialize_calls.fetch_add(1, Ordering::SeqCst);
		tokio::task::yield_now().await;

		if let Some(error) = self.initialize_error.lock().clone() {
			return Err(ClientError::Failed(error));
		}
		if !self.scripted {
			return Ok(());
		}

		match stored_identity(&self.auth_dir) {
			Some(wid) => {
				self.set_identity(Some(&wid));
				self.emit(ClientEvent::Authenticated);
				self.emit(ClientEvent::Ready);
			}
			None => self.issue_code(),
		}
		Ok(())
	}

	async fn info(&self) -> Result<Option<ClientInfo>, ClientError> {
		let delay = *self.info_delay.lock();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if self.is_destroyed() {
			return Err(ClientError::Destroyed);
		}
		Ok(self.identity.lock().clone())
	}

	async fn send_message(&self, chat_id: &str, body: &str) -> Result<(), ClientError> {
		if self.is_destroyed() {
			return Err(ClientError::Destroyed);
		}
		if self.fail_sends.load(Ordering::SeqCst) {
			return Err(ClientError::Failed("send rejected by remote".into()));
		}
		self.sent.lock().push((chat_id.to_string(), body.to_string()));
		Ok(())
	}

	async fn download_media(&self, message_id: &str) -> Result<MediaPayload, ClientError> {
		self.media
			.lock()
			.clone()
			.ok_or_else(|| ClientError::Failed(format!("no media for {message_id}")))
	}

	async fn contact(&self, _peer: &str) -> Result<Option<Contact>, ClientError> {
		Ok(self.contact.lock().clone())
	}

	async fn destroy(&self) -> Result<(), ClientError> {
		self.destroyed.store(true, Ordering::SeqCst);
		*self.identity.lock() = None;
		Ok(())
	}
}

/// Factory recording every client it creates, per tenant.
pub struct FakeFactory {
	scripted: bool,
	initialize_error: Mutex<Option<String>>,
	clients: Mutex<HashMap<String, Vec<Arc<FakeClient>>>>,
}

impl FakeFactory {
	/// Clients follow the credential-driven script on `initialize`.
	pub fn new() -> Self {
		Self {
			scripted: true,
			initialize_error: Mutex::new(None),
			clients: Mutex::new(HashMap::new()),
		}
	}

	/// Clients emit nothing on their own; tests drive every event.
	pub fn manual() -> Self {
		Self {
			scripted: false,
			initialize_error: Mutex::new(None),
			clients: Mutex::new(HashMap::new()),
		}
	}

	/// Makes `initialize` fail on every client created from now on.
	pub fn set_initialize_error(&self, error: Option<&str>) {
		*self.initialize_error.lock() = error.map(str::to_string);
	}

	/// Most recently created client for `tenant`.
	pub fn latest(&self, tenant: &str) -> Option<Arc<FakeClient>> {
		self.clients.lock().get(tenant).and_then(|clients| clients.last().cloned())
	}

	/// Number of clients created for `tenant`.
	pub fn created(&self, tenant: &str) -> usize {
		self.clients.lock().get(tenant).map_or(0, Vec::len)
	}

	/// Total `initialize` calls across every client of `tenant`.
	pub fn initialize_calls(&self, tenant: &str) -> usize {
		self.clients
			.lock()
			.get(tenant)
			.map_or(0, |clients| clients.iter().map(|c| c.initialize_calls()).sum())
	}
}

impl Default for FakeFactory {
	fn default() -> Self {
		Self::new()
	}
}

impl ClientFactory for FakeFactory {
	fn create(&self, tenant: &str, auth_dir: &Path) -> Result<ClientHandle, ClientError> {
		let (client, events) = FakeClient::new(tenant, auth_dir, self.scripted);
		client.set_initialize_error(self.initialize_error.lock().as_deref());
		self.clients
			.lock()
			.entry(tenant.to_string())
			.or_default()
			.push(Arc::clone(&client));
		Ok(ClientHandle { client, events })
	}
}
