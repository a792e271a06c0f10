//! Document store contract and two implementations.
//!
//! The session manager writes tenant fields on state transitions and appends
//! captured messages; it never reads messages back.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use pairlink_protocol::{CapturedMessage, TenantDocument, TenantPatch};
use parking_lot::Mutex;
use tracing::warn;

use crate::error::{Error, Result};

#[async_trait]
pub trait DocumentStore: Send + Sync {
	/// Merges `patch` into the tenant's document, creating it if needed.
	async fn update_tenant(&self, tenant: &str, patch: &TenantPatch) -> Result<()>;

	async fn tenant(&self, tenant: &str) -> Result<Option<TenantDocument>>;

	/// Appends a captured message and returns the id assigned to it.
	async fn append_message(&self, record: CapturedMessage) -> Result<String>;
}

/// In-process store, also used by tests to inspect writes.
#[derive(Default)]
pub struct MemoryStore {
	tenants: Mutex<HashMap<String, TenantDocument>>,
	patches: Mutex<Vec<(String, TenantPatch)>>,
	messages: Mutex<Vec<CapturedMessage>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every patch written for `tenant`, oldest first.
	pub fn patches(&self, tenant: &str) -> Vec<TenantPatch> {
		self.patches
			.lock()
			.iter()
			.filter(|(t, _)| t == tenant)
			.map(|(_, patch)| patch.clone())
			.collect()
	}

	pub fn document(&self, tenant: &str) -> Option<TenantDocument> {
		self.tenants.lock().get(tenant).cloned()
	}

	pub fn messages(&self) -> Vec<CapturedMessage> {
		self.messages.lock().clone()
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn update_tenant(&self, tenant: &str, patch: &TenantPatch) -> Result<()> {
		self.tenants.lock().entry(tenant.to_string()).or_default().apply(patch);
		self.patches.lock().push((tenant.to_string(), patch.clone()));
		Ok(())
	}

	async fn tenant(&self, tenant: &str) -> Result<Option<TenantDocument>> {
		Ok(self.document(tenant))
	}

	async fn append_message(&self, mut record: CapturedMessage) -> Result<String> {
		let mut messages = self.messages.lock();
		record.id = format!("msg-{}", messages.len() + 1);
		let id = record.id.clone();
		messages.push(record);
		Ok(id)
	}
}

/// JSON files under a root directory.
///
/// ```text
/// <root>/tenants/<tenant>.json     merged TenantDocument
/// <root>/messages/<tenant>.jsonl   one CapturedMessage per line
/// ```
pub struct FileStore {
	root: PathBuf,
	/// Serializes read-modify-write of tenant documents and appends.
	write_lock: Mutex<()>,
	next_id: AtomicU64,
}

impl FileStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			write_lock: Mutex::new(()),
			next_id: AtomicU64::new(1),
		}
	}

	fn tenant_path(&self, tenant: &str) -> PathBuf {
		self.root.join("tenants").join(format!("{tenant}.json"))
	}

	fn messages_path(&self, tenant: &str) -> PathBuf {
		self.root.join("messages").join(format!("{tenant}.jsonl"))
	}
}

#[async_trait]
impl DocumentStore for FileStore {
	async fn update_tenant(&self, tenant: &str, patch: &TenantPatch) -> Result<()> {
		let _guard = self.write_lock.lock();
		let path = self.tenant_path(tenant);
		// An unreadable document is left in place rather than replaced by the patch alone.
		let mut document: TenantDocument = load_json(&path)?.unwrap_or_default();
		document.apply(patch);
		save_json(&path, &document)
	}

	async fn tenant(&self, tenant: &str) -> Result<Option<TenantDocument>> {
		load_json(&self.tenant_path(tenant))
	}

	async fn append_message(&self, mut record: CapturedMessage) -> Result<String> {
		let seq = self.next_id.fetch_add(1, Ordering::SeqCst);
		record.id = format!("{}-{}-{seq}", record.tenant_id, record.created_at);

		let mut line = serde_json::to_vec(&record).map_err(|e| Error::Store(e.to_string()))?;
		line.push(b'\n');

		let _guard = self.write_lock.lock();
		let path = self.messages_path(&record.tenant_id);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		OpenOptions::new().create(true).append(true).open(&path)?.write_all(&line)?;
		Ok(record.id)
	}
}

/// `Ok(None)` when the file does not exist.
fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
	let content = match fs::read_to_string(path) {
		Ok(content) => content,
		Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(err) => return Err(err.into()),
	};
	serde_json::from_str(&content).map(Some).map_err(|err| {
		warn!(target: "pairlink.store", path = %path.display(), error = %err, "stored document is not valid JSON");
		Error::Store(format!("{}: {err}", path.display()))
	})
}

fn save_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	let content = serde_json::to_string_pretty(data).map_err(|e| Error::Store(e.to_string()))?;
	fs::write(path, content)?;
	Ok(())
}
