//! Tenant document fields written on session state transitions.
//!
//! [`TenantPatch`] is what the session manager writes; [`TenantDocument`] is
//! the merged view a store keeps per tenant. In a patch, `None` leaves a field
//! untouched and `Some(None)` clears it.

use serde::{Deserialize, Serialize};

use crate::event::ClientInfo;

/// Disconnect reason written when the tenant asked to disconnect.
pub const REASON_USER_DISCONNECT: &str = "user_disconnect";
/// Disconnect reason written when credentials were wiped on request.
pub const REASON_SESSION_RESET: &str = "session_reset";
/// Disconnect reason written when credentials were rejected.
pub const REASON_AUTH_FAILURE: &str = "auth_failure";

/// Partial update of a tenant document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connected: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connecting: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connecting_started_at: Option<Option<u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connected_at: Option<Option<u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub disconnected_at: Option<Option<u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub disconnect_reason: Option<Option<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone_number: Option<Option<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<Option<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub qr_generated_at: Option<Option<u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub qr_scanned_at: Option<Option<u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_seen: Option<Option<u64>>,
}

impl TenantPatch {
	/// Initialization of a client handle has started.
	pub fn connecting_started(now: u64) -> Self {
		Self {
			connecting: Some(true),
			connecting_started_at: Some(Some(now)),
			..Self::default()
		}
	}

	/// A fresh pairing code was issued.
	pub fn pairing_code_issued(now: u64) -> Self {
		Self {
			qr_generated_at: Some(Some(now)),
			..Self::default()
		}
	}

	/// Credentials were accepted.
	pub fn authenticated(now: u64) -> Self {
		Self {
			qr_scanned_at: Some(Some(now)),
			..Self::default()
		}
	}

	/// The transport is ready; records the identity the peer assigned.
	pub fn ready(now: u64, info: &ClientInfo) -> Self {
		Self {
			connected: Some(true),
			connecting: Some(false),
			connecting_started_at: Some(None),
			connected_at: Some(Some(now)),
			phone_number: info.wid.clone().map(Some),
			display_name: info.pushname.clone().map(Some),
			last_seen: Some(Some(now)),
			..Self::default()
		}
	}

	/// The transport was lost or torn down.
	pub fn disconnected(now: u64, reason: impl Into<String>) -> Self {
		Self {
			connected: Some(false),
			connecting: Some(false),
			connecting_started_at: Some(None),
			disconnected_at: Some(Some(now)),
			disconnect_reason: Some(Some(reason.into())),
			..Self::default()
		}
	}

	/// Initialization failed before the session became ready.
	pub fn connecting_failed() -> Self {
		Self {
			connecting: Some(false),
			connecting_started_at: Some(None),
			..Self::default()
		}
	}

	/// Credentials were wiped; clears everything tied to the old pairing.
	pub fn wiped(now: u64, reason: impl Into<String>) -> Self {
		Self {
			connected: Some(false),
			connecting: Some(false),
			connecting_started_at: Some(None),
			connected_at: Some(None),
			disconnected_at: Some(Some(now)),
			disconnect_reason: Some(Some(reason.into())),
			phone_number: Some(None),
			display_name: Some(None),
			qr_generated_at: Some(None),
			qr_scanned_at: Some(None),
			last_seen: Some(None),
		}
	}
}

/// Merged tenant fields as persisted by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDocument {
	#[serde(default)]
	pub connected: bool,
	#[serde(default)]
	pub connecting: bool,
	#[serde(default)]
	pub connecting_started_at: Option<u64>,
	#[serde(default)]
	pub connected_at: Option<u64>,
	#[serde(default)]
	pub disconnected_at: Option<u64>,
	#[serde(default)]
	pub disconnect_reason: Option<String>,
	#[serde(default)]
	pub phone_number: Option<String>,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub qr_generated_at: Option<u64>,
	#[serde(default)]
	pub qr_scanned_at: Option<u64>,
	#[serde(default)]
	pub last_seen: Option<u64>,
}

impl TenantDocument {
	/// Applies `patch` in place.
	pub fn apply(&mut self, patch: &TenantPatch) {
		fn set<T: Clone>(field: &mut T, value: &Option<T>) {
			if let Some(value) = value {
				*field = value.clone();
			}
		}

		set(&mut self.connected, &patch.connected);
		set(&mut self.connecting, &patch.connecting);
		set(&mut self.connecting_started_at, &patch.connecting_started_at);
		set(&mut self.connected_at, &patch.connected_at);
		set(&mut self.disconnected_at, &patch.disconnected_at);
		set(&mut self.disconnect_reason, &patch.disconnect_reason);
		set(&mut self.phone_number, &patch.phone_number);
		set(&mut self.display_name, &patch.display_name);
		set(&mut self.qr_generated_at, &patch.qr_generated_at);
		set(&mut self.qr_scanned_at, &patch.qr_scanned_at);
		set(&mut self.last_seen, &patch.last_seen);
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn untouched_fields_are_not_serialized() {
		let value = serde_json::to_value(TenantPatch::authenticated(5)).unwrap();
		assert_eq!(value, json!({"qrScannedAt": 5}));
	}

	#[test]
	fn cleared_fields_serialize_as_null() {
		let value = serde_json::to_value(TenantPatch::wiped(9, REASON_SESSION_RESET)).unwrap();
		assert_eq!(value["phoneNumber"], serde_json::Value::Null);
		assert_eq!(value["disconnectReason"], "session_reset");
	}

	#[test]
	fn apply_sets_and_clears() {
		let mut doc = TenantDocument::default();
		let info = ClientInfo {
			wid: Some("905551234567".into()),
			pushname: Some("Coach".into()),
		};
		doc.apply(&TenantPatch::ready(10, &info));
		assert!(doc.connected);
		assert_eq!(doc.phone_number.as_deref(), Some("905551234567"));
		assert_eq!(doc.connected_at, Some(10));

		doc.apply(&TenantPatch::disconnected(20, "NAVIGATION"));
		assert!(!doc.connected);
		assert_eq!(doc.phone_number.as_deref(), Some("905551234567"));
		assert_eq!(doc.disconnect_reason.as_deref(), Some("NAVIGATION"));

		doc.apply(&TenantPatch::wiped(30, REASON_AUTH_FAILURE));
		assert_eq!(doc.phone_number, None);
		assert_eq!(doc.connected_at, None);
		assert_eq!(doc.disconnected_at, Some(30));
	}

	#[test]
	fn ready_without_identity_keeps_existing_number() {
		let mut doc = TenantDocument {
			phone_number: Some("1".into()),
			..TenantDocument::default()
		};
		doc.apply(&TenantPatch::ready(1, &ClientInfo::default()));
		assert_eq!(doc.phone_number.as_deref(), Some("1"));
	}
}
