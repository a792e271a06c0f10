//! Events emitted by a protocol client and the payloads they carry.

use serde::{Deserialize, Serialize};

/// Lifecycle or message event emitted by a protocol client.
///
/// On the bridge wire this is `{"event": "<name>", "data": {...}}`; unit
/// variants may omit `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
	/// A fresh raw pairing code. Supersedes any earlier code.
	Qr { code: String },
	/// Credentials were accepted; the readiness handshake follows.
	Authenticated,
	/// Transport fully established.
	Ready,
	/// Credentials were rejected or are corrupted.
	AuthFailure {
		#[serde(default)]
		message: String,
	},
	/// Transport lost.
	Disconnected {
		#[serde(default)]
		reason: String,
	},
	/// Inbound message from a peer.
	Message(MessagePayload),
	/// Any message created on this account, including ones sent from the
	/// tenant's own device.
	MessageCreate(MessagePayload),
}

impl ClientEvent {
	/// Short name used in logs.
	pub fn name(&self) -> &'static str {
		match self {
			ClientEvent::Qr { .. } => "qr",
			ClientEvent::Authenticated => "authenticated",
			ClientEvent::Ready => "ready",
			ClientEvent::AuthFailure { .. } => "auth_failure",
			ClientEvent::Disconnected { .. } => "disconnected",
			ClientEvent::Message(_) => "message",
			ClientEvent::MessageCreate(_) => "message_create",
		}
	}

	/// Returns true for the two message-capture events.
	pub fn is_message(&self) -> bool {
		matches!(self, ClientEvent::Message(_) | ClientEvent::MessageCreate(_))
	}
}

/// A protocol message as reported by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
	/// Client-assigned message id, used for media lookups.
	pub id: String,
	pub from: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<String>,
	#[serde(default)]
	pub body: String,
	/// Seconds since the epoch as reported by the remote side.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<u64>,
	#[serde(default)]
	pub from_me: bool,
	#[serde(default)]
	pub is_group: bool,
	#[serde(default)]
	pub has_media: bool,
}

/// Identity reported by a connected client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
	/// Peer-assigned identity (the account's phone number).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub wid: Option<String>,
	/// Display name chosen by the account owner.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pushname: Option<String>,
}

impl ClientInfo {
	/// A handle is considered live only while it reports a non-empty identity.
	pub fn has_identity(&self) -> bool {
		self.wid.as_deref().is_some_and(|wid| !wid.is_empty())
	}
}

/// Downloaded message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
	pub mimetype: String,
	/// Base64-encoded bytes.
	pub data: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
}

impl MediaPayload {
	/// Renders the payload as an inline `data:` URL.
	pub fn to_data_url(&self) -> String {
		format!("data:{};base64,{}", self.mimetype, self.data)
	}
}

/// Contact details for a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pushname: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub avatar_url: Option<String>,
}

impl Contact {
	/// Saved name, falling back to the peer's own display name.
	pub fn display_name(&self) -> Option<&str> {
		self.name.as_deref().or(self.pushname.as_deref())
	}
}
