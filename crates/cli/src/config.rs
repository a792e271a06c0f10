//! Service configuration: optional JSON file overlaid with command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use pairlink::ManagerConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_SESSIONS_DIR: &str = ".pairlink/sessions";
pub const DEFAULT_STORE_DIR: &str = ".pairlink/store";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ServiceConfig {
	pub bind: SocketAddr,
	/// One credential subdirectory per tenant.
	pub sessions_dir: PathBuf,
	/// Tenant documents and the message archive.
	pub store_dir: PathBuf,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub node: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bridge_script: Option<PathBuf>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reconnect_delay_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub settle_delay_ms: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
	fn default() -> Self {
		Self {
			bind: SocketAddr::from(([127, 0, 0, 1], 8787)),
			sessions_dir: PathBuf::from(DEFAULT_SESSIONS_DIR),
			store_dir: PathBuf::from(DEFAULT_STORE_DIR),
			node: None,
			bridge_script: None,
			reconnect_delay_ms: None,
			settle_delay_ms: None,
			request_timeout_ms: None,
		}
	}
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
	pub bind: Option<SocketAddr>,
	pub sessions_dir: Option<PathBuf>,
	pub store_dir: Option<PathBuf>,
	pub node: Option<PathBuf>,
	pub bridge_script: Option<PathBuf>,
}

impl ServiceConfig {
	/// Reads `path`, or returns the defaults when no file is given.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		let Some(path) = path else {
			return Ok(Self::default());
		};
		let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
		serde_json::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
	}

	pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
		if let Some(bind) = overrides.bind {
			self.bind = bind;
		}
		if let Some(dir) = overrides.sessions_dir {
			self.sessions_dir = dir;
		}
		if let Some(dir) = overrides.store_dir {
			self.store_dir = dir;
		}
		if overrides.node.is_some() {
			self.node = overrides.node;
		}
		if overrides.bridge_script.is_some() {
			self.bridge_script = overrides.bridge_script;
		}
		self
	}

	/// Session manager timings with any configured overrides applied.
	pub fn manager_config(&self) -> ManagerConfig {
		let mut config = ManagerConfig::default();
		if let Some(ms) = self.reconnect_delay_ms {
			config.reconnect_delay = Duration::from_millis(ms);
		}
		if let Some(ms) = self.settle_delay_ms {
			config.settle_delay = Duration::from_millis(ms);
		}
		if let Some(ms) = self.request_timeout_ms {
			config.request_timeout = Duration::from_millis(ms);
		}
		config
	}
}
