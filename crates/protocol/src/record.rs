//! Captured message records appended to the message archive.

use serde::{Deserialize, Serialize};

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
	/// Sent by a peer to the tenant.
	Inbound,
	/// Sent by the tenant, from this session or their own device.
	Outbound,
}

/// One captured message. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedMessage {
	/// Archive-assigned id; empty until appended.
	#[serde(default)]
	pub id: String,
	pub tenant_id: String,
	pub direction: Direction,
	/// The other party: sender for inbound, recipient for outbound.
	pub peer: String,
	pub from: Option<String>,
	pub to: Option<String>,
	pub body: String,
	/// Milliseconds since the epoch.
	pub timestamp: u64,
	pub is_group: bool,
	pub is_media: bool,
	/// Inlined `data:` URL when the media fetch succeeded.
	pub media: Option<String>,
	pub peer_name: Option<String>,
	pub peer_avatar: Option<String>,
	/// Milliseconds since the epoch at capture time.
	pub created_at: u64,
}
