#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::client::DEFAULT_SERVER;
use crate::config::ConfigOverrides;
use crate::output::OutputFormat;

/// Root CLI for pairlink.
#[derive(Parser, Debug)]
#[command(name = "pairlink")]
#[command(about = "Multi-tenant messaging session service and client")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: json (default) or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "json")]
	pub format: OutputFormat,

	/// Base URL of a running service (client commands only)
	#[arg(long, global = true, value_name = "URL", env = "PAIRLINK_SERVER", default_value = DEFAULT_SERVER)]
	pub server: String,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the HTTP service in the foreground.
	Serve(ServeArgs),
	/// Show a tenant's session status, resuming it if credentials exist.
	Status(TenantArgs),
	/// Start or join a tenant's session.
	Connect(TenantArgs),
	/// Send a text message from a tenant's session.
	Send(SendArgs),
	/// Tear down a tenant's session, keeping its credentials.
	Disconnect(TenantArgs),
	/// Tear down a tenant's session and wipe its credentials.
	Reset(TenantArgs),
	/// List every known tenant.
	StatusAll,
}

#[derive(Args, Debug, Clone)]
pub struct TenantArgs {
	/// Tenant id
	#[arg(value_name = "TENANT")]
	pub tenant: String,
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
	/// Tenant id
	#[arg(value_name = "TENANT")]
	pub tenant: String,

	/// Message text
	#[arg(value_name = "BODY")]
	pub body: String,

	/// Recipient phone number or chat address (defaults to the tenant's own number)
	#[arg(long, value_name = "PEER")]
	pub to: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
	/// JSON config file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Listen address
	#[arg(long, value_name = "ADDR")]
	pub bind: Option<SocketAddr>,

	/// Credential root, one subdirectory per tenant
	#[arg(long, value_name = "DIR")]
	pub sessions_dir: Option<PathBuf>,

	/// Document store directory
	#[arg(long, value_name = "DIR")]
	pub store_dir: Option<PathBuf>,

	/// Node.js executable for the protocol bridge (else PAIRLINK_NODE_EXE, then PATH)
	#[arg(long, value_name = "PATH")]
	pub node: Option<PathBuf>,

	/// Protocol bridge script (else PAIRLINK_BRIDGE_SCRIPT)
	#[arg(long, value_name = "PATH")]
	pub bridge_script: Option<PathBuf>,
}

impl ServeArgs {
	pub fn overrides(&self) -> ConfigOverrides {
		ConfigOverrides {
			bind: self.bind,
			sessions_dir: self.sessions_dir.clone(),
			store_dir: self.store_dir.clone(),
			node: self.node.clone(),
			bridge_script: self.bridge_script.clone(),
		}
	}
}

fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}
