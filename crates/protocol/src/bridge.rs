//! Frames exchanged with the bridge process over stdio.
//!
//! One JSON object per line in each direction:
//!
//! 1. The host writes [`BridgeRequest`] frames with a unique `id`
//! 2. The bridge answers each request with a [`BridgeResponse`] carrying the same `id`
//! 3. The bridge pushes [`ClientEvent`] frames (no `id`) whenever the remote session changes
//!
//! [`BridgeFrame`] is the untagged union the host uses to tell responses from events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::ClientEvent;

/// Method names understood by the bridge.
pub mod method {
	pub const INITIALIZE: &str = "initialize";
	pub const GET_INFO: &str = "getInfo";
	pub const SEND_MESSAGE: &str = "sendMessage";
	pub const DOWNLOAD_MEDIA: &str = "downloadMedia";
	pub const GET_CONTACT: &str = "getContact";
	pub const DESTROY: &str = "destroy";
}

/// Request sent from the host to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRequest {
	/// Correlation id, unique per connection.
	pub id: u32,
	/// Method name, see [`method`].
	pub method: String,
	/// Method parameters as a JSON object.
	#[serde(default)]
	pub params: Value,
}

/// Response sent from the bridge for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeResponse {
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<BridgeError>,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeError {
	pub message: String,
	/// Error class reported by the bridge (e.g. `"TimeoutError"`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Any frame read from the bridge's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeFrame {
	/// Has an `id` field.
	Response(BridgeResponse),
	/// Has an `event` field.
	Event(ClientEvent),
	/// Anything else; logged and dropped by the host.
	Unknown(Value),
}

/// Parameters of [`method::SEND_MESSAGE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
	pub chat_id: String,
	pub body: String,
}

/// Parameters of [`method::DOWNLOAD_MEDIA`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadMediaParams {
	pub message_id: String,
}

/// Parameters of [`method::GET_CONTACT`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetContactParams {
	pub peer: String,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn response_frame_is_detected_by_id() {
		let frame: BridgeFrame = serde_json::from_value(json!({"id": 7, "result": {"ok": true}})).unwrap();
		match frame {
			BridgeFrame::Response(resp) => {
				assert_eq!(resp.id, 7);
				assert!(resp.error.is_none());
			}
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn error_response_keeps_name() {
		let frame: BridgeFrame =
			serde_json::from_value(json!({"id": 3, "error": {"message": "boom", "name": "TimeoutError"}})).unwrap();
		let BridgeFrame::Response(resp) = frame else {
			panic!("expected response");
		};
		let err = resp.error.unwrap();
		assert_eq!(err.message, "boom");
		assert_eq!(err.name.as_deref(), Some("TimeoutError"));
	}

	#[test]
	fn event_frame_is_detected_by_event_tag() {
		let frame: BridgeFrame = serde_json::from_value(json!({"event": "qr", "data": {"code": "2@abc"}})).unwrap();
		match frame {
			BridgeFrame::Event(ClientEvent::Qr { code }) => assert_eq!(code, "2@abc"),
			other => panic!("expected qr event, got {other:?}"),
		}
	}

	#[test]
	fn unknown_frame_is_preserved() {
		let frame: BridgeFrame = serde_json::from_value(json!({"hello": "world"})).unwrap();
		assert!(matches!(frame, BridgeFrame::Unknown(_)));
	}

	#[test]
	fn send_message_params_use_camel_case() {
		let params = SendMessageParams {
			chat_id: "905551234567@c.us".into(),
			body: "hi".into(),
		};
		let value = serde_json::to_value(&params).unwrap();
		assert_eq!(value["chatId"], "905551234567@c.us");
	}
}
