//! Bridge process management
//!
//! Launches the node bridge for one tenant and owns the child process for the
//! lifetime of that tenant's client handle.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::driver::BridgeLocation;
use crate::error::{Error, Result};

/// How long a freshly spawned bridge must survive before it counts as started.
const SPAWN_CHECK_DELAY: Duration = Duration::from_millis(100);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const KILL_TIMEOUT: Duration = Duration::from_millis(500);

/// Everything needed to start one bridge.
#[derive(Debug, Clone)]
pub struct BridgeCommand {
	pub location: BridgeLocation,
	pub tenant: String,
	/// Credential directory handed to the bridge.
	pub auth_dir: PathBuf,
}

impl BridgeCommand {
	pub fn new(location: BridgeLocation, tenant: impl Into<String>, auth_dir: impl AsRef<Path>) -> Self {
		Self {
			location,
			tenant: tenant.into(),
			auth_dir: auth_dir.as_ref().to_path_buf(),
		}
	}

	fn command(&self) -> Command {
		let mut cmd = Command::new(&self.location.node);
		cmd.arg(&self.location.script)
			.arg("--client-id")
			.arg(&self.tenant)
			.arg("--data-path")
			.arg(&self.auth_dir)
			.env("PAIRLINK_TENANT", &self.tenant)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);
		cmd
	}
}

/// A running bridge child process.
///
/// Stdio pipes are handed to the transport with [`BridgeProcess::take_stdio`];
/// the process itself stays here so it can be killed on teardown.
#[derive(Debug)]
pub struct BridgeProcess {
	tenant: String,
	child: Child,
}

impl BridgeProcess {
	/// Spawns the bridge and verifies it did not exit immediately.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the process fails to start or exits
	/// within the first 100ms.
	pub async fn launch(command: &BridgeCommand) -> Result<Self> {
		let mut child = command
			.command()
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("failed to spawn bridge: {e}")))?;

		tokio::time::sleep(SPAWN_CHECK_DELAY).await;

		match child.try_wait() {
			Ok(Some(status)) => {
				return Err(Error::LaunchFailed(format!("bridge exited immediately with status: {status}")));
			}
			Ok(None) => {}
			Err(e) => {
				return Err(Error::LaunchFailed(format!("failed to check bridge status: {e}")));
			}
		}

		debug!(target: "pairlink.bridge", tenant = %command.tenant, pid = ?child.id(), "bridge started");

		Ok(Self {
			tenant: command.tenant.clone(),
			child,
		})
	}

	/// Takes the stdin/stdout pipes. Returns `None` after the first call.
	pub fn take_stdio(&mut self) -> Option<(ChildStdin, ChildStdout)> {
		let stdin = self.child.stdin.take()?;
		let stdout = self.child.stdout.take()?;
		Some((stdin, stdout))
	}

	/// Whether the child has exited.
	pub fn has_exited(&mut self) -> bool {
		!matches!(self.child.try_wait(), Ok(None))
	}

	/// Kills the bridge and waits up to five seconds for it to exit.
	pub async fn shutdown(mut self) -> Result<()> {
		drop(self.child.stdin.take());
		drop(self.child.stdout.take());

		if let Err(e) = self.child.start_kill() {
			// Already exited.
			debug!(target: "pairlink.bridge", tenant = %self.tenant, error = %e, "bridge kill skipped");
		}

		match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait()).await {
			Ok(Ok(status)) => {
				debug!(target: "pairlink.bridge", tenant = %self.tenant, %status, "bridge stopped");
				Ok(())
			}
			Ok(Err(e)) => Err(Error::LaunchFailed(format!("failed to wait for bridge: {e}"))),
			Err(_) => {
				warn!(target: "pairlink.bridge", tenant = %self.tenant, "bridge did not exit within 5 seconds");
				Err(Error::Timeout("bridge shutdown".into()))
			}
		}
	}

	/// Force kills the bridge without waiting for a clean exit.
	pub async fn kill(mut self) -> Result<()> {
		self.child
			.kill()
			.await
			.map_err(|e| Error::LaunchFailed(format!("failed to kill bridge: {e}")))?;
		let _ = tokio::time::timeout(KILL_TIMEOUT, self.child.wait()).await;
		Ok(())
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;

	fn shell_bridge(script: &str) -> (tempfile::TempDir, BridgeCommand) {
		let dir = tempfile::tempdir().unwrap();
		let script_path = dir.path().join("bridge.sh");
		std::fs::write(&script_path, script).unwrap();
		let location = BridgeLocation {
			node: PathBuf::from("/bin/sh"),
			script: script_path,
		};
		let auth = dir.path().join("auth");
		(dir, BridgeCommand::new(location, "tenant-a", auth))
	}

	#[tokio::test]
	async fn immediate_exit_is_a_launch_failure() {
		let (_dir, command) = shell_bridge("exit 3\n");
		let err = BridgeProcess::launch(&command).await.unwrap_err();
		assert!(matches!(err, Error::LaunchFailed(_)), "unexpected error: {err:?}");
	}

	#[tokio::test]
	async fn long_running_bridge_can_be_shut_down() {
		let (_dir, command) = shell_bridge("exec cat\n");
		let mut process = BridgeProcess::launch(&command).await.unwrap();
		assert!(process.take_stdio().is_some());
		assert!(process.take_stdio().is_none());
		assert!(!process.has_exited());
		process.shutdown().await.unwrap();
	}
}
