//! Bridge driver lookup
//!
//! Locates the node executable and the bridge script that wraps the remote
//! protocol library.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment override for the node executable.
pub const NODE_EXE_ENV: &str = "PAIRLINK_NODE_EXE";
/// Environment override for the bridge script.
pub const BRIDGE_SCRIPT_ENV: &str = "PAIRLINK_BRIDGE_SCRIPT";

/// Resolved executable and script used to spawn a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeLocation {
	pub node: PathBuf,
	pub script: PathBuf,
}

/// Locates the bridge.
///
/// The node executable is searched in order:
/// 1. `node` argument (explicit configuration)
/// 2. `PAIRLINK_NODE_EXE` environment variable
/// 3. `node` on `PATH`
///
/// The script comes from the `script` argument or `PAIRLINK_BRIDGE_SCRIPT`
/// and must exist.
///
/// # Errors
///
/// Returns `Error::BridgeNotFound` if either piece cannot be located.
pub fn locate_bridge(node: Option<&Path>, script: Option<&Path>) -> Result<BridgeLocation> {
	let script = script
		.map(Path::to_path_buf)
		.or_else(|| std::env::var_os(BRIDGE_SCRIPT_ENV).map(PathBuf::from))
		.ok_or_else(|| Error::BridgeNotFound(format!("no bridge script configured (set {BRIDGE_SCRIPT_ENV})")))?;
	if !script.is_file() {
		return Err(Error::BridgeNotFound(format!("bridge script {} does not exist", script.display())));
	}

	if let Some(node) = node {
		if node.is_file() {
			debug!(target: "pairlink.bridge", node = %node.display(), "using configured node");
			return Ok(BridgeLocation {
				node: node.to_path_buf(),
				script,
			});
		}
		warn!(
			target: "pairlink.bridge",
			node = %node.display(),
			"configured node executable does not exist; falling back"
		);
	}

	if let Some(node) = std::env::var_os(NODE_EXE_ENV).map(PathBuf::from) {
		if node_is_usable(&node) {
			debug!(target: "pairlink.bridge", node = %node.display(), "using {NODE_EXE_ENV}");
			return Ok(BridgeLocation { node, script });
		}
		warn!(
			target: "pairlink.bridge",
			node = %node.display(),
			"{NODE_EXE_ENV} is set but node is not runnable; falling back"
		);
	}

	match which::which("node") {
		Ok(node) if node_is_usable(&node) => {
			debug!(target: "pairlink.bridge", node = %node.display(), "using node from PATH");
			Ok(BridgeLocation { node, script })
		}
		Ok(node) => Err(Error::BridgeNotFound(format!("node at {} is not runnable", node.display()))),
		Err(err) => Err(Error::BridgeNotFound(format!("node not found on PATH: {err}"))),
	}
}

fn node_is_usable(node: &Path) -> bool {
	Command::new(node)
		.arg("--version")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.map(|status| status.success())
		.unwrap_or(false)
}
