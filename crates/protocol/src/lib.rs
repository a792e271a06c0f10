//! Wire types for pairlink.
//!
//! This crate contains the serde-serializable shapes shared by the bridge
//! process, the session manager, and the HTTP service:
//!
//! - [`bridge`]: line-delimited JSON frames exchanged with the bridge process
//! - [`event`]: lifecycle and message events emitted by a protocol client
//! - [`status`]: the polling payload returned to status/connect callers
//! - [`record`]: captured message records appended to the archive
//! - [`tenant`]: document-store patches written on state transitions
//! - [`peer`]: peer address normalization
//!
//! Types here are pure data. Behaviour lives in `pairlink`.

pub mod bridge;
pub mod event;
pub mod peer;
pub mod record;
pub mod status;
pub mod tenant;

pub use bridge::*;
pub use event::*;
pub use peer::*;
pub use record::*;
pub use status::*;
pub use tenant::*;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}
