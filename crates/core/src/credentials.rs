//! Tenant-scoped credential directories.
//!
//! Each tenant's authentication material lives in `<root>/<tenant>`; the
//! contents are opaque and owned by that tenant's protocol client while a
//! session is resident.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Longest accepted tenant id.
pub const MAX_TENANT_ID_LEN: usize = 128;

/// Checks that `tenant` is usable as a directory name.
///
/// Accepts 1-128 characters from `[A-Za-z0-9_-]`.
pub fn validate_tenant_id(tenant: &str) -> Result<()> {
	let valid = !tenant.is_empty()
		&& tenant.len() <= MAX_TENANT_ID_LEN
		&& tenant.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
	if valid {
		Ok(())
	} else {
		Err(Error::InvalidTenant(tenant.to_string()))
	}
}

/// Result of [`CredentialStore::wipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeOutcome {
	Removed,
	/// Nothing to remove.
	Absent,
	/// Still locked after every attempt; left for the next restart to clean up.
	Locked,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
	root: PathBuf,
	wipe_attempts: u32,
	wipe_backoff: Duration,
}

impl CredentialStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			wipe_attempts: 3,
			wipe_backoff: Duration::from_secs(1),
		}
	}

	pub fn with_wipe_retry(mut self, attempts: u32, backoff: Duration) -> Self {
		self.wipe_attempts = attempts.max(1);
		self.wipe_backoff = backoff;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Directory holding `tenant`'s credentials. Callers validate the id first.
	pub fn path_for(&self, tenant: &str) -> PathBuf {
		self.root.join(tenant)
	}

	/// Whether persisted credentials exist for `tenant`.
	pub fn exists(&self, tenant: &str) -> bool {
		self.path_for(tenant).is_dir()
	}

	/// Tenants with a credential directory on disk, sorted.
	pub fn tenants(&self) -> Vec<String> {
		let entries = match std::fs::read_dir(&self.root) {
			Ok(entries) => entries,
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
			Err(e) => {
				warn!(target: "pairlink.credentials", root = %self.root.display(), error = %e, "cannot list credential directories");
				return Vec::new();
			}
		};

		let mut tenants: Vec<String> = entries
			.filter_map(|entry| entry.ok())
			.filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
			.filter_map(|entry| entry.file_name().into_string().ok())
			.filter(|name| validate_tenant_id(name).is_ok())
			.collect();
		tenants.sort();
		tenants
	}

	/// Recursively deletes `tenant`'s credential directory.
	///
	/// A missing directory is a no-op. Any other failure is treated as a
	/// transient lock and retried; running out of attempts logs a warning and
	/// reports [`WipeOutcome::Locked`] rather than failing.
	pub async fn wipe(&self, tenant: &str) -> WipeOutcome {
		self.wipe_with(tenant, |path| tokio::fs::remove_dir_all(path)).await
	}

	async fn wipe_with<F, Fut>(&self, tenant: &str, mut remove: F) -> WipeOutcome
	where
		F: FnMut(PathBuf) -> Fut,
		Fut: Future<Output = io::Result<()>>,
	{
		let path = self.path_for(tenant);
		let mut attempt = 1;
		loop {
			match remove(path.clone()).await {
				Ok(()) => {
					info!(target: "pairlink.credentials", tenant, path = %path.display(), "credentials wiped");
					return WipeOutcome::Removed;
				}
				Err(e) if e.kind() == io::ErrorKind::NotFound => {
					debug!(target: "pairlink.credentials", tenant, "no credentials to wipe");
					return WipeOutcome::Absent;
				}
				Err(e) if attempt >= self.wipe_attempts => {
					warn!(
						target: "pairlink.credentials",
						tenant,
						attempts = attempt,
						error = %e,
						"credential directory still locked; leaving it for the next restart"
					);
					return WipeOutcome::Locked;
				}
				Err(e) => {
					debug!(target: "pairlink.credentials", tenant, attempt, error = %e, "wipe failed, retrying");
					attempt += 1;
					tokio::time::sleep(self.wipe_backoff).await;
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tenant_ids_are_validated() {
		assert!(validate_tenant_id("coach-1").is_ok());
		assert!(validate_tenant_id("Coach_2").is_ok());
		assert!(validate_tenant_id("").is_err());
		assert!(validate_tenant_id("../etc").is_err());
		assert!(validate_tenant_id("a/b").is_err());
		assert!(validate_tenant_id(&"x".repeat(MAX_TENANT_ID_LEN)).is_ok());
		assert!(validate_tenant_id(&"x".repeat(MAX_TENANT_ID_LEN + 1)).is_err());
	}

	#[test]
	fn paths_are_tenant_scoped() {
		let store = CredentialStore::new("/var/sessions");
		assert_eq!(store.path_for("coach-1"), PathBuf::from("/var/sessions/coach-1"));
		assert_ne!(store.path_for("coach-1"), store.path_for("coach-10"));
	}

	#[test]
	fn lists_only_valid_directories() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::create_dir(dir.path().join("coach-2")).unwrap();
		std::fs::create_dir(dir.path().join("coach-1")).unwrap();
		std::fs::create_dir(dir.path().join("not valid")).unwrap();
		std::fs::write(dir.path().join("stray-file"), "").unwrap();

		let store = CredentialStore::new(dir.path());
		assert_eq!(store.tenants(), vec!["coach-1".to_string(), "coach-2".to_string()]);
		assert!(CredentialStore::new(dir.path().join("missing")).tenants().is_empty());
	}

	#[tokio::test]
	async fn wipe_removes_directory_and_tolerates_absence() {
		let dir = tempfile::tempdir().unwrap();
		let store = CredentialStore::new(dir.path());
		std::fs::create_dir_all(store.path_for("coach-1").join("nested")).unwrap();
		std::fs::write(store.path_for("coach-1").join("nested/creds.json"), "{}").unwrap();

		assert_eq!(store.wipe("coach-1").await, WipeOutcome::Removed);
		assert!(!store.exists("coach-1"));
		assert_eq!(store.wipe("coach-1").await, WipeOutcome::Absent);
	}

	#[tokio::test(start_paused = true)]
	async fn locked_directory_is_retried_then_given_up() {
		let store = CredentialStore::new("/unused").with_wipe_retry(3, Duration::from_secs(1));
		let mut calls = 0;
		let outcome = store
			.wipe_with("coach-1", |_| {
				calls += 1;
				std::future::ready(Err(io::Error::new(io::ErrorKind::PermissionDenied, "busy")))
			})
			.await;
		assert_eq!(outcome, WipeOutcome::Locked);
		assert_eq!(calls, 3);
	}

	#[tokio::test(start_paused = true)]
	async fn transient_lock_clears_on_retry() {
		let store = CredentialStore::new("/unused");
		let mut calls = 0;
		let outcome = store
			.wipe_with("coach-1", |_| {
				calls += 1;
				std::future::ready(if calls < 2 {
					Err(io::Error::new(io::ErrorKind::ResourceBusy, "busy"))
				} else {
					Ok(())
				})
			})
			.await;
		assert_eq!(outcome, WipeOutcome::Removed);
		assert_eq!(calls, 2);
	}

	#[tokio::test]
	async fn wipe_logs_under_credentials_target() {
		use std::sync::{Arc, Mutex};

		use tracing::Subscriber;
		use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

		struct Targets(Arc<Mutex<Vec<String>>>);

		impl<S: Subscriber> Layer<S> for Targets {
			fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
				self.0.lock().unwrap().push(event.metadata().target().to_string());
			}
		}

		let seen = Arc::new(Mutex::new(Vec::new()));
		let subscriber = tracing_subscriber::registry().with(Targets(Arc::clone(&seen)));
		let _guard = tracing::subscriber::set_default(subscriber);

		let dir = tempfile::tempdir().unwrap();
		let store = CredentialStore::new(dir.path());
		std::fs::create_dir_all(store.path_for("coach-1")).unwrap();
		store.wipe("coach-1").await;
		store.wipe("coach-1").await;

		assert_eq!(*seen.lock().unwrap(), vec!["pairlink.credentials", "pairlink.credentials"]);
	}
}
