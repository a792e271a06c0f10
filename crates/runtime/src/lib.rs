//! pairlink runtime - bridge process lifecycle, transport, and correlation
//!
//! This crate provides the low-level plumbing for talking to the external
//! bridge process that drives the remote messaging protocol:
//!
//! - **Driver lookup**: Locating the node executable and bridge script
//! - **Process**: Spawning, verifying, and killing the bridge child process
//! - **Transport**: Newline-delimited JSON over the child's stdio pipes
//! - **Connection**: Request/response correlation and event forwarding
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   pairlink   │  BridgeClient (ProtocolClient impl)
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │ Conn   │  │  id correlation, events
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  line-delimited pipes
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Proc   │  │  child process
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod connection;
pub mod driver;
pub mod error;
pub mod process;
pub mod transport;

pub use connection::{Connection, REASON_BRIDGE_EXITED};
pub use driver::{BridgeLocation, locate_bridge};
pub use error::{Error, Result};
pub use process::{BridgeCommand, BridgeProcess};
pub use transport::{PipeTransport, PipeTransportReceiver, PipeTransportSender, TransportParts};
