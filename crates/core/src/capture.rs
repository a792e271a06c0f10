//! Message capture sink.
//!
//! Turns `message` (inbound) and self-originated `message_create` (outbound)
//! events into [`CapturedMessage`] records and appends them to the archive.
//! Capture is best effort: nothing here returns an error to the caller.

use std::sync::Arc;

use pairlink_protocol::{CapturedMessage, ClientEvent, Direction, MessagePayload, is_broadcast, now_ms};
use tracing::{debug, warn};

use crate::client::ProtocolClient;
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct MessageCaptureSink {
	store: Arc<dyn DocumentStore>,
}

impl MessageCaptureSink {
	pub fn new(store: Arc<dyn DocumentStore>) -> Self {
		Self { store }
	}

	/// Captures `event` for `tenant`, returning the archive id on success.
	pub async fn capture(&self, tenant: &str, client: &dyn ProtocolClient, event: &ClientEvent) -> Option<String> {
		let (mut record, payload) = normalize(tenant, event, now_ms())?;

		if payload.has_media {
			match client.download_media(&payload.id).await {
				Ok(media) => record.media = Some(media.to_data_url()),
				Err(err) => {
					warn!(target: "pairlink.capture", tenant, message_id = %payload.id, error = %err, "media fetch failed; keeping text only");
				}
			}
		}

		match client.contact(&record.peer).await {
			Ok(Some(contact)) => {
				record.peer_name = contact.display_name().map(str::to_string);
				record.peer_avatar = contact.avatar_url;
			}
			Ok(None) => {}
			Err(err) => debug!(target: "pairlink.capture", tenant, error = %err, "contact lookup failed"),
		}

		match self.store.append_message(record).await {
			Ok(id) => {
				debug!(target: "pairlink.capture", tenant, id = %id, "message captured");
				Some(id)
			}
			Err(err) => {
				warn!(target: "pairlink.capture", tenant, error = %err, "failed to archive message");
				None
			}
		}
	}
}

/// Builds the record for a capturable event, or `None` if it is not captured.
///
/// Inbound records come from `message` events sent by someone else; outbound
/// records come from `message_create` events this account sent. Broadcast
/// pseudo-peers are skipped.
fn normalize<'a>(tenant: &str, event: &'a ClientEvent, now: u64) -> Option<(CapturedMessage, &'a MessagePayload)> {
	let (direction, payload, peer) = match event {
		ClientEvent::Message(payload) if !payload.from_me => (Direction::Inbound, payload, payload.from.clone()),
		ClientEvent::MessageCreate(payload) if payload.from_me => (Direction::Outbound, payload, payload.to.clone()?),
		_ => return None,
	};

	if is_broadcast(&peer) || is_broadcast(&payload.from) {
		debug!(target: "pairlink.capture", tenant, peer = %peer, "broadcast message skipped");
		return None;
	}

	let record = CapturedMessage {
		id: String::new(),
		tenant_id: tenant.to_string(),
		direction,
		peer,
		from: Some(payload.from.clone()),
		to: payload.to.clone(),
		body: payload.body.clone(),
		timestamp: payload.timestamp.map(|secs| secs * 1000).unwrap_or(now),
		is_group: payload.is_group,
		is_media: payload.has_media,
		media: None,
		peer_name: None,
		peer_avatar: None,
		created_at: now,
	};
	Some((record, payload))
}
