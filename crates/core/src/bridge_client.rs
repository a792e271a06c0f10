//! [`ProtocolClient`] backed by a bridge child process.
//!
//! Each client owns one bridge process started with the tenant's credential
//! directory. Requests go through a [`Connection`]; bridge events are
//! forwarded to the channel returned by [`BridgeFactory::create`].

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pairlink_protocol::{
	ClientEvent, ClientInfo, Contact, DownloadMediaParams, GetContactParams, MediaPayload, SendMessageParams, method,
};
use pairlink_runtime::{BridgeCommand, BridgeLocation, BridgeProcess, Connection, PipeTransport};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::{ClientFactory, ClientHandle, ProtocolClient};
use crate::error::ClientError;

/// Creates one [`BridgeClient`] per session.
#[derive(Debug, Clone)]
pub struct BridgeFactory {
	location: BridgeLocation,
	request_timeout: Duration,
}

impl BridgeFactory {
	pub fn new(location: BridgeLocation, request_timeout: Duration) -> Self {
		Self {
			location,
			request_timeout,
		}
	}
}

impl ClientFactory for BridgeFactory {
	fn create(&self, tenant: &str, auth_dir: &Path) -> Result<ClientHandle, ClientError> {
		let (events_tx, events) = mpsc::unbounded_channel();
		let client = BridgeClient {
			tenant: tenant.to_string(),
			command: BridgeCommand::new(self.location.clone(), tenant, auth_dir),
			events_tx,
			request_timeout: self.request_timeout,
			connection: Mutex::new(None),
			process: Mutex::new(None),
			destroyed: AtomicBool::new(false),
		};
		Ok(ClientHandle {
			client: Arc::new(client),
			events,
		})
	}
}

pub struct BridgeClient {
	tenant: String,
	command: BridgeCommand,
	events_tx: mpsc::UnboundedSender<ClientEvent>,
	request_timeout: Duration,
	connection: Mutex<Option<Arc<Connection>>>,
	process: Mutex<Option<BridgeProcess>>,
	destroyed: AtomicBool,
}

impl BridgeClient {
	fn connection(&self) -> Result<Arc<Connection>, ClientError> {
		if self.destroyed.load(Ordering::SeqCst) {
			return Err(ClientError::Destroyed);
		}
		self.connection.lock().clone().ok_or(ClientError::NotInitialized)
	}

	async fn call<P, R>(&self, name: &'static str, params: &P) -> Result<R, ClientError>
	where
		P: Serialize,
		R: DeserializeOwned,
	{
		let connection = self.connection()?;
		let params = serde_json::to_value(params).map_err(|source| ClientError::Decode { method: name, source })?;
		let result = connection
			.send_request_timeout(name, params, self.request_timeout)
			.await?;
		serde_json::from_value(result).map_err(|source| ClientError::Decode { method: name, source })
	}
}

#[async_trait]
impl ProtocolClient for BridgeClient {
	async fn initialize(&self) -> Result<(), ClientError> {
		if self.connection.lock().is_some() {
			return Err(ClientError::Failed("client already initialized".into()));
		}

		debug!(target: "pairlink.bridge", tenant = %self.tenant, "launching bridge");
		let mut process = BridgeProcess::launch(&self.command).await?;
		let (stdin, stdout) = process
			.take_stdio()
			.ok_or_else(|| pairlink_runtime::Error::LaunchFailed("bridge stdio unavailable".into()))?;

		let (transport, message_rx) = PipeTransport::new(stdin, stdout);
		let parts = transport.into_transport_parts(message_rx);
		let connection = Arc::new(Connection::new(parts, self.events_tx.clone()));

		let conn_for_loop = Arc::clone(&connection);
		tokio::spawn(async move {
			conn_for_loop.run().await;
		});

		if self.destroyed.load(Ordering::SeqCst) {
			connection.mark_closing();
			let _ = process.kill().await;
			return Err(ClientError::Destroyed);
		}
		*self.connection.lock() = Some(Arc::clone(&connection));
		*self.process.lock() = Some(process);

		// No timeout: the bridge answers once the protocol client has started,
		// which can include a pairing wait.
		connection.send_request(method::INITIALIZE, Value::Object(Default::default())).await?;
		debug!(target: "pairlink.bridge", tenant = %self.tenant, "bridge initialized");
		Ok(())
	}

	async fn info(&self) -> Result<Option<ClientInfo>, ClientError> {
		self.call(method::GET_INFO, &Value::Object(Default::default())).await
	}

	async fn send_message(&self, chat_id: &str, body: &str) -> Result<(), ClientError> {
		let params = SendMessageParams {
			chat_id: chat_id.to_string(),
			body: body.to_string(),
		};
		let _: Value = self.call(method::SEND_MESSAGE, &params).await?;
		Ok(())
	}

	async fn download_media(&self, message_id: &str) -> Result<MediaPayload, ClientError> {
		let params = DownloadMediaParams {
			message_id: message_id.to_string(),
		};
		self.call(method::DOWNLOAD_MEDIA, &params).await
	}

	async fn contact(&self, peer: &str) -> Result<Option<Contact>, ClientError> {
		let params = GetContactParams { peer: peer.to_string() };
		self.call(method::GET_CONTACT, &params).await
	}

	async fn destroy(&self) -> Result<(), ClientError> {
		if self.destroyed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}

		let connection = self.connection.lock().take();
		if let Some(connection) = connection {
			connection.mark_closing();
			if !connection.is_closed() {
				if let Err(err) = connection
					.send_request_timeout(method::DESTROY, Value::Object(Default::default()), self.request_timeout)
					.await
				{
					debug!(target: "pairlink.bridge", tenant = %self.tenant, error = %err, "bridge destroy request failed");
				}
			}
		}

		let process = self.process.lock().take();
		if let Some(process) = process {
			process.shutdown().await?;
		}
		debug!(target: "pairlink.bridge", tenant = %self.tenant, "bridge destroyed");
		Ok(())
	}
}
