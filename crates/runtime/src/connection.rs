//! Request/response correlation over the bridge transport
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::send_request`] with a method and params
//! 2. Connection assigns a unique id and parks a oneshot sender under it
//! 3. The request is queued for the writer task
//! 4. The dispatch loop reads frames from the transport
//! 5. Responses complete the parked sender with the same id
//! 6. Events are forwarded, in order, to the event channel given at construction
//!
//! When the bridge's stdout closes, every pending request fails with
//! [`Error::ChannelClosed`] and, unless the bridge already reported one or the
//! connection was closed on purpose, a synthetic `disconnected` event with
//! reason [`REASON_BRIDGE_EXITED`] is emitted.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use pairlink_protocol::{BridgeError, BridgeFrame, BridgeRequest, ClientEvent};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::transport::{PipeTransportReceiver, PipeTransportSender, TransportParts};

/// Disconnect reason emitted when the bridge's output ends unexpectedly.
pub const REASON_BRIDGE_EXITED: &str = "bridge_exited";

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<TokioMutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// RAII guard ensuring callback cleanup when a request future is dropped.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		let id = self.id;
		let callbacks = Arc::clone(&self.callbacks);

		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			handle.spawn(async move {
				if callbacks.lock().await.remove(&id).is_some() {
					debug!(target: "pairlink.bridge", id, "removed orphaned callback");
				}
			});
		}
	}
}

/// Future returned by [`Connection::send_request`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Halves taken exactly once by [`Connection::run`].
struct RunParts {
	sender: PipeTransportSender,
	receiver: PipeTransportReceiver,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

/// Line-delimited JSON connection to one bridge process.
pub struct Connection {
	last_id: AtomicU32,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<Value>,
	run_parts: TokioMutex<Option<RunParts>>,
	events_tx: mpsc::UnboundedSender<ClientEvent>,
	/// Set once the bridge reported `disconnected` itself.
	saw_disconnect: AtomicBool,
	/// Set by [`Connection::mark_closing`]; suppresses the synthetic disconnect.
	closing: AtomicBool,
	/// Set once the dispatch loop has ended.
	closed: AtomicBool,
}

impl Connection {
	/// Creates a connection that forwards bridge events to `events_tx`.
	pub fn new(parts: TransportParts, events_tx: mpsc::UnboundedSender<ClientEvent>) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(TokioMutex::new(HashMap::new())),
			outbound_tx,
			run_parts: TokioMutex::new(Some(RunParts {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
			events_tx,
			saw_disconnect: AtomicBool::new(false),
			closing: AtomicBool::new(false),
			closed: AtomicBool::new(false),
		}
	}

	/// Sends a request and awaits its response.
	pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
		if self.closed.load(Ordering::SeqCst) {
			return Err(Error::ChannelClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		debug!(target: "pairlink.bridge", id, method, "request");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().await.insert(id, tx);
		let guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		// The loop may have drained callbacks between the check above and the insert.
		if self.closed.load(Ordering::SeqCst) {
			return Err(Error::ChannelClosed);
		}

		let request = BridgeRequest {
			id,
			method: method.to_string(),
			params,
		};
		if self.outbound_tx.send(serde_json::to_value(&request)?).is_err() {
			error!(target: "pairlink.bridge", id, "failed to queue request: outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Like [`Connection::send_request`], failing with [`Error::Timeout`] after `timeout`.
	pub async fn send_request_timeout(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
		match tokio::time::timeout(timeout, self.send_request(method, params)).await {
			Ok(result) => result,
			Err(_) => Err(Error::Timeout(format!("{method} did not answer within {timeout:?}"))),
		}
	}

	/// Marks the connection as being torn down on purpose.
	pub fn mark_closing(&self) {
		self.closing.store(true, Ordering::SeqCst);
	}

	/// Whether the dispatch loop has ended.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Runs the dispatch loop until the bridge's output ends.
	///
	/// Only the first call does anything.
	pub async fn run(self: &Arc<Self>) {
		let Some(parts) = self.run_parts.lock().await.take() else {
			warn!(target: "pairlink.bridge", "connection loop already started");
			return;
		};
		let RunParts {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		} = parts;

		let reader_handle = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				error!(target: "pairlink.bridge", error = %e, "transport read error");
			}
		});

		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					error!(target: "pairlink.bridge", error = %e, "transport write error");
					break;
				}
			}
		});

		while let Some(value) = message_rx.recv().await {
			match serde_json::from_value::<BridgeFrame>(value) {
				Ok(frame) => {
					if let Err(e) = self.dispatch_internal(frame).await {
						warn!(target: "pairlink.bridge", error = %e, "error dispatching frame");
					}
				}
				Err(e) => warn!(target: "pairlink.bridge", error = %e, "failed to parse frame"),
			}
		}

		let _ = reader_handle.await;
		writer_handle.abort();
		self.finish().await;
	}

	async fn finish(&self) {
		self.closed.store(true, Ordering::SeqCst);

		let pending: Vec<_> = self.callbacks.lock().await.drain().collect();
		if !pending.is_empty() {
			debug!(target: "pairlink.bridge", count = pending.len(), "failing pending requests");
		}
		for (_, callback) in pending {
			let _ = callback.send(Err(Error::ChannelClosed));
		}

		if self.closing.load(Ordering::SeqCst) || self.saw_disconnect.load(Ordering::SeqCst) {
			return;
		}
		warn!(target: "pairlink.bridge", "bridge output ended without a disconnect");
		let _ = self.events_tx.send(ClientEvent::Disconnected {
			reason: REASON_BRIDGE_EXITED.to_string(),
		});
	}

	/// Dispatch an incoming frame (test-only public version)
	#[cfg(test)]
	pub(crate) async fn dispatch(&self, frame: BridgeFrame) -> Result<()> {
		self.dispatch_internal(frame).await
	}

	async fn dispatch_internal(&self, frame: BridgeFrame) -> Result<()> {
		match frame {
			BridgeFrame::Response(response) => {
				let callback = self
					.callbacks
					.lock()
					.await
					.remove(&response.id)
					.ok_or_else(|| Error::ProtocolError(format!("no pending request with id={}", response.id)))?;

				let result = match response.error {
					Some(error) => Err(remote_error(error)),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(result);
				Ok(())
			}
			BridgeFrame::Event(event) => {
				debug!(target: "pairlink.bridge", event = event.name(), "event");
				if matches!(event, ClientEvent::Disconnected { .. }) {
					self.saw_disconnect.store(true, Ordering::SeqCst);
				}
				self.events_tx.send(event).map_err(|_| Error::ChannelClosed)
			}
			BridgeFrame::Unknown(value) => {
				debug!(target: "pairlink.bridge", frame = %value, "unknown frame ignored");
				Ok(())
			}
		}
	}
}

fn remote_error(error: BridgeError) -> Error {
	Error::Remote {
		name: error.name.unwrap_or_else(|| "Error".to_string()),
		message: error.message,
	}
}
