//! Protocol client handle abstraction.
//!
//! A [`ProtocolClient`] is the capability object wrapping the remote protocol
//! for one tenant. Its callback-style events are delivered on the channel in
//! [`ClientHandle`] so the session manager can process them in one place.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pairlink_protocol::{ClientEvent, ClientInfo, Contact, MediaPayload};
use tokio::sync::mpsc;

use crate::error::ClientError;

/// Operations the session manager needs from one tenant's protocol client.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
	/// Starts the client. Long-running; progress is reported through events.
	async fn initialize(&self) -> Result<(), ClientError>;

	/// Identity the remote side assigned, or `None` if the handle has none.
	async fn info(&self) -> Result<Option<ClientInfo>, ClientError>;

	async fn send_message(&self, chat_id: &str, body: &str) -> Result<(), ClientError>;

	async fn download_media(&self, message_id: &str) -> Result<MediaPayload, ClientError>;

	async fn contact(&self, peer: &str) -> Result<Option<Contact>, ClientError>;

	/// Tears the client down. Safe to call more than once.
	async fn destroy(&self) -> Result<(), ClientError>;
}

/// A freshly created client together with its event stream.
pub struct ClientHandle {
	pub client: Arc<dyn ProtocolClient>,
	pub events: mpsc::UnboundedReceiver<ClientEvent>,
}

/// Creates protocol clients bound to a tenant's credential directory.
pub trait ClientFactory: Send + Sync {
	/// Builds a client without starting it.
	fn create(&self, tenant: &str, auth_dir: &Path) -> Result<ClientHandle, ClientError>;
}
