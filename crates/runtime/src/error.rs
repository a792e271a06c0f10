//! Error types for the bridge runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the bridge process.
#[derive(Debug, Error)]
pub enum Error {
	/// Node executable or bridge script could not be located.
	#[error("Bridge not found: {0}")]
	BridgeNotFound(String),

	/// Failed to launch the bridge process.
	#[error("Failed to launch bridge: {0}")]
	LaunchFailed(String),

	/// Transport-level error (stdio communication).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Frame could not be interpreted.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// The bridge reported an error for a request.
	#[error("{name}: {message}")]
	Remote {
		/// Error class reported by the bridge (e.g. "TimeoutError", "Error")
		name: String,
		message: String,
	},

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Timeout waiting for a response.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The bridge went away while a request was pending.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}

impl Error {
	/// Returns true if this is a timeout, local or remote.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout(_) => true,
			Error::Remote { name, .. } => name == "TimeoutError",
			_ => false,
		}
	}

	/// Returns true if the bridge is gone.
	pub fn is_closed(&self) -> bool {
		matches!(self, Error::ChannelClosed | Error::TransportError(_))
	}
}
