//! pairlink: multi-tenant messaging session manager
//!
//! Keeps at most one live protocol session per tenant and drives it through
//! pairing, credential persistence, liveness probing, and reconnection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pairlink::{BridgeFactory, CredentialStore, FileStore, ManagerConfig, SessionManager};
//!
//! let location = pairlink_runtime::locate_bridge(None, None)?;
//! let config = ManagerConfig::default();
//! let manager = SessionManager::new(
//!     Arc::new(BridgeFactory::new(location, config.request_timeout)),
//!     CredentialStore::new(".pairlink/sessions"),
//!     Arc::new(FileStore::new(".pairlink/store")),
//!     config,
//! );
//!
//! // Starts pairing; poll status for the pairing code.
//! manager.connect("coach-1").await?;
//! let status = manager.status("coach-1").await?;
//! ```
//!
//! # Modules
//!
//! - [`manager`]: lifecycle controller, send, pairing subscriptions
//! - [`status`]: polling facade with lazy resume
//! - [`registry`]: per-tenant entries, states and lifecycle locks
//! - [`credentials`]: per-tenant credential directories
//! - [`store`]: tenant documents and the message archive
//! - [`capture`]: message capture sink
//! - [`pairing`]: pairing-code encoding and observers
//! - [`bridge_client`]: the bridge-process client
//! - [`testing`]: in-process client for tests

pub mod bridge_client;
pub mod capture;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod pairing;
pub mod registry;
pub mod status;
pub mod store;
pub mod testing;

pub use bridge_client::{BridgeClient, BridgeFactory};
pub use capture::MessageCaptureSink;
pub use client::{ClientFactory, ClientHandle, ProtocolClient};
pub use config::ManagerConfig;
pub use credentials::{CredentialStore, MAX_TENANT_ID_LEN, WipeOutcome, validate_tenant_id};
pub use error::{ClientError, Error, Result};
pub use manager::{REASON_HANDLER_ERROR, REASON_PROBE_FAILED, SessionIntent, SessionManager};
pub use pairing::{PairingObserver, PairingSubscription, encode_pairing_code};
pub use registry::{SessionSnapshot, SessionState};
pub use store::{DocumentStore, FileStore, MemoryStore};
