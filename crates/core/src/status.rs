//! Status/query facade for polling callers.

use std::collections::BTreeSet;

use pairlink_protocol::{SessionStatus, TenantOverview};
use tracing::{debug, info, warn};

use crate::credentials::validate_tenant_id;
use crate::error::Result;
use crate::manager::{REASON_PROBE_FAILED, SessionIntent, SessionManager};
use crate::registry::SessionState;

/// Removes a tenant from the resuming set when the resume task ends.
struct ResumeGuard {
	manager: SessionManager,
	tenant: String,
}

impl Drop for ResumeGuard {
	fn drop(&mut self) {
		self.manager.inner.resuming.lock().remove(&self.tenant);
	}
}

impl SessionManager {
	/// Current status of `tenant` for a poller.
	///
	/// Reports a resident entry as-is, after re-probing a `Ready` handle.
	/// Without a resident entry, a tenant with credentials on disk is resumed
	/// in the background and reported as initializing; any other tenant is
	/// reported idle and nothing is started.
	pub async fn status(&self, tenant: &str) -> Result<SessionStatus> {
		validate_tenant_id(tenant)?;

		if let Some(view) = self.inner.registry.view(tenant) {
			if view.snapshot.state != SessionState::Ready || self.probe(tenant, &view).await {
				return Ok(view.snapshot.status());
			}
			info!(target: "pairlink.session", tenant, "ready session failed liveness probe; demoting");
			let _guard = self.inner.registry.lock_tenant(tenant).await;
			self.mark_disconnected_locked(tenant, view.snapshot.generation, REASON_PROBE_FAILED)
				.await;
			return Ok(SessionStatus::idle());
		}

		if self.inner.resuming.lock().contains(tenant) {
			return Ok(SessionStatus::initializing(None));
		}

		if !self.inner.credentials.exists(tenant) {
			return Ok(SessionStatus::idle());
		}

		if !self.inner.resuming.lock().insert(tenant.to_string()) {
			return Ok(SessionStatus::initializing(None));
		}
		debug!(target: "pairlink.session", tenant, "credentials found; resuming in background");
		let guard = ResumeGuard {
			manager: self.clone(),
			tenant: tenant.to_string(),
		};
		tokio::spawn(async move {
			let result = guard.manager.request_session(&guard.tenant, SessionIntent::Passive).await;
			if let Err(err) = result {
				warn!(target: "pairlink.session", tenant = %guard.tenant, error = %err, "background resume failed");
			}
			drop(guard);
		});

		Ok(SessionStatus::initializing(None))
	}

	/// Status of every tenant that is resident or has credentials on disk,
	/// merged with its persisted document.
	pub async fn status_all(&self) -> Result<Vec<TenantOverview>> {
		let tenants: BTreeSet<String> = self
			.inner
			.registry
			.tenants()
			.into_iter()
			.chain(self.inner.credentials.tenants())
			.collect();

		let mut overview = Vec::with_capacity(tenants.len());
		for tenant in tenants {
			let status = self.status(&tenant).await?;
			let document = match self.inner.store.tenant(&tenant).await {
				Ok(document) => document.unwrap_or_default(),
				Err(err) => {
					warn!(target: "pairlink.session", tenant = %tenant, error = %err, "failed to read tenant document");
					Default::default()
				}
			};
			overview.push(TenantOverview {
				connected: status.is_ready,
				connecting: status.is_initializing,
				has_qr_code: status.qr_code.is_some(),
				tenant_id: tenant,
				document,
			});
		}
		Ok(overview)
	}
}
