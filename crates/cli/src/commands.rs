//! Subcommand dispatch.

use pairlink_protocol::SendRequest;
use tracing::debug;

use crate::cli::{Cli, Commands, ServeArgs};
use crate::client::ServiceClient;
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::server;

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	let server = cli.server;
	let client = || {
		debug!(target: "pairlink.http", server = %server, "client command");
		ServiceClient::new(&server)
	};

	match cli.command {
		Commands::Serve(args) => return serve(args).await,
		Commands::Status(args) => output::print_result(&client()?.status(&args.tenant).await?, format),
		Commands::Connect(args) => output::print_result(&client()?.connect(&args.tenant).await?, format),
		Commands::Send(args) => {
			let request = SendRequest {
				tenant_id: args.tenant,
				to: args.to,
				body: args.body,
			};
			output::print_result(&client()?.send(&request).await?, format);
		}
		Commands::Disconnect(args) => output::print_result(&client()?.disconnect(&args.tenant).await?, format),
		Commands::Reset(args) => output::print_result(&client()?.reset(&args.tenant).await?, format),
		Commands::StatusAll => output::print_result(&client()?.status_all().await?, format),
	}
	Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
	let config = ServiceConfig::load(args.config.as_deref())?.apply(args.overrides());
	debug!(target: "pairlink.http", ?config, "resolved service config");
	server::serve(config).await?;
	Ok(())
}
