//! Newline-delimited JSON transport over a pair of byte streams.
//!
//! Each frame is one JSON value terminated by `\n`. Blank lines are skipped;
//! lines that are not valid JSON are logged and dropped so one bad frame does
//! not take the bridge down.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::error::{Error, Result};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Transport bound to the bridge's stdin (writes) and stdout (reads).
pub struct PipeTransport {
	writer: BoxedWriter,
	reader: BoxedReader,
	message_tx: mpsc::UnboundedSender<Value>,
}

/// Transport split into the halves [`crate::Connection`] drives.
pub struct TransportParts {
	pub sender: PipeTransportSender,
	pub receiver: PipeTransportReceiver,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

impl PipeTransport {
	/// Creates a transport and the channel incoming frames are delivered on.
	pub fn new<W, R>(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>)
	where
		W: AsyncWrite + Send + Unpin + 'static,
		R: AsyncRead + Send + Unpin + 'static,
	{
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				writer: Box::new(writer),
				reader: Box::new(reader),
				message_tx,
			},
			message_rx,
		)
	}

	pub fn into_parts(self) -> (PipeTransportSender, PipeTransportReceiver) {
		(
			PipeTransportSender { writer: self.writer },
			PipeTransportReceiver {
				reader: self.reader,
				message_tx: self.message_tx,
			},
		)
	}

	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender,
			receiver,
			message_rx,
		}
	}
}

/// Write half.
pub struct PipeTransportSender {
	writer: BoxedWriter,
}

impl PipeTransportSender {
	/// Writes one frame and flushes.
	pub async fn send(&mut self, message: Value) -> Result<()> {
		let mut line = serde_json::to_vec(&message)?;
		line.push(b'\n');
		trace!(target: "pairlink.bridge", bytes = line.len(), "frame out");
		self.writer
			.write_all(&line)
			.await
			.map_err(|e| Error::TransportError(format!("write failed: {e}")))?;
		self.writer
			.flush()
			.await
			.map_err(|e| Error::TransportError(format!("flush failed: {e}")))?;
		Ok(())
	}
}

/// Read half.
pub struct PipeTransportReceiver {
	reader: BoxedReader,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl PipeTransportReceiver {
	/// Reads frames until EOF or until the message channel is dropped.
	///
	/// Returns `Ok(())` on a clean end of stream.
	pub async fn run(self) -> Result<()> {
		let mut lines = BufReader::new(self.reader).lines();
		while let Some(line) = lines
			.next_line()
			.await
			.map_err(|e| Error::TransportError(format!("read failed: {e}")))?
		{
			let line = line.trim();
			if line.is_empty() {
				continue;
			}
			match serde_json::from_str::<Value>(line) {
				Ok(value) => {
					trace!(target: "pairlink.bridge", bytes = line.len(), "frame in");
					if self.message_tx.send(value).is_err() {
						break;
					}
				}
				Err(e) => {
					warn!(target: "pairlink.bridge", error = %e, "dropping malformed frame");
				}
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests;
