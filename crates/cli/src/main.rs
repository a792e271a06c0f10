use clap::Parser;
use pairlink_cli::cli::Cli;
use pairlink_cli::error::CliError;
use pairlink_cli::output::{self, OutputFormat};
use pairlink_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;

	if let Err(err) = commands::dispatch(cli, format).await {
		handle_error(err, format);
		std::process::exit(1);
	}
}

fn handle_error(err: CliError, format: OutputFormat) {
	let detail = err.to_detail();

	output::print_error_stderr(&detail);

	if format == OutputFormat::Json {
		output::print_error_json(&detail);
	}
}
