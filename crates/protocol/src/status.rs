//! Polling payloads returned to status and connect callers.

use serde::{Deserialize, Serialize};

use crate::tenant::TenantDocument;

/// Snapshot of one tenant's session as seen by a poller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
	pub is_ready: bool,
	pub is_initializing: bool,
	/// Displayable pairing code, present only while awaiting pairing.
	pub qr_code: Option<String>,
}

impl SessionStatus {
	/// Status of a tenant with nothing resident and nothing starting.
	pub fn idle() -> Self {
		Self::default()
	}

	/// Status reported while a session is being brought up.
	pub fn initializing(qr_code: Option<String>) -> Self {
		Self {
			is_ready: false,
			is_initializing: true,
			qr_code,
		}
	}

	/// Status of a fully established session.
	pub fn ready() -> Self {
		Self {
			is_ready: true,
			is_initializing: false,
			qr_code: None,
		}
	}
}

/// Response body of the status and connect endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
	pub success: bool,
	#[serde(flatten)]
	pub status: SessionStatus,
}

impl From<SessionStatus> for StatusResponse {
	fn from(status: SessionStatus) -> Self {
		Self { success: true, status }
	}
}

/// One row of the all-tenants overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOverview {
	pub tenant_id: String,
	pub connected: bool,
	pub connecting: bool,
	pub has_qr_code: bool,
	/// Fields last persisted for this tenant.
	#[serde(default)]
	pub document: TenantDocument,
}

/// Response body of the all-tenants overview endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
	pub success: bool,
	pub tenants: Vec<TenantOverview>,
}

/// Request body naming a single tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRequest {
	pub tenant_id: String,
}

/// Request body of the send endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
	pub tenant_id: String,
	/// Peer address or phone number; defaults to the tenant's own number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	pub body: String,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl Ack {
	pub fn ok(message: impl Into<String>) -> Self {
		Self {
			success: true,
			message: Some(message.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn status_response_is_flat_camel_case() {
		let body = StatusResponse::from(SessionStatus::initializing(Some("data:x".into())));
		assert_eq!(
			serde_json::to_value(&body).unwrap(),
			json!({"success": true, "isReady": false, "isInitializing": true, "qrCode": "data:x"})
		);
	}

	#[test]
	fn idle_status_serializes_null_code() {
		let value = serde_json::to_value(SessionStatus::idle()).unwrap();
		assert_eq!(value["qrCode"], serde_json::Value::Null);
	}
}
