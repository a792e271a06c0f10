use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a protocol client handle.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error(transparent)]
	Bridge(#[from] pairlink_runtime::Error),

	#[error("client has not been initialized")]
	NotInitialized,

	#[error("client has been destroyed")]
	Destroyed,

	#[error("unexpected reply to {method}: {source}")]
	Decode {
		method: &'static str,
		#[source]
		source: serde_json::Error,
	},

	#[error("{0}")]
	Failed(String),
}

#[derive(Debug, Error)]
pub enum Error {
	/// No `Ready` session exists; poll status and retry.
	#[error("session for tenant {tenant} is not ready")]
	NotReady { tenant: String },

	/// The session was ready but the send itself failed.
	#[error("send failed: {0}")]
	Transport(#[source] ClientError),

	/// The client handle could not be created or driven.
	#[error("client error: {0}")]
	Client(#[source] ClientError),

	#[error("invalid tenant id: {0:?}")]
	InvalidTenant(String),

	#[error("invalid peer address: {0:?}")]
	InvalidPeer(String),

	#[error("pairing code could not be encoded: {0}")]
	Pairing(String),

	#[error("store error: {0}")]
	Store(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl Error {
	pub fn is_not_ready(&self) -> bool {
		matches!(self, Error::NotReady { .. })
	}
}
