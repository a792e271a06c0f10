//! Timing constants for the session manager.

use std::time::Duration;

/// Delays, retry bounds and windows used by [`crate::SessionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
	/// Wait between a `disconnected` event and the single reconnection attempt.
	pub reconnect_delay: Duration,
	/// Wait after destroying a handle before its credential directory is wiped
	/// or handed to a new handle.
	pub settle_delay: Duration,
	/// Attempts made to remove a credential directory that is still locked.
	pub wipe_attempts: u32,
	pub wipe_backoff: Duration,
	/// An `Initializing` session with no pairing code after this long is logged as stalled.
	pub stall_window: Duration,
	/// A successful liveness probe is trusted for this long.
	pub probe_ttl: Duration,
	pub probe_attempts: u32,
	pub probe_backoff: Duration,
	/// Bound on a single identity probe; a slower handle counts as a failed attempt.
	pub probe_timeout: Duration,
	/// Per-request timeout for bridge calls other than `initialize`.
	pub request_timeout: Duration,
}

impl Default for ManagerConfig {
	fn default() -> Self {
		Self {
			reconnect_delay: Duration::from_secs(5),
			settle_delay: Duration::from_secs(1),
			wipe_attempts: 3,
			wipe_backoff: Duration::from_secs(1),
			stall_window: Duration::from_secs(30),
			probe_ttl: Duration::from_secs(2),
			probe_attempts: 2,
			probe_backoff: Duration::from_millis(200),
			probe_timeout: Duration::from_millis(500),
			request_timeout: Duration::from_secs(30),
		}
	}
}
