use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_send_with_peer() {
	let args = vec!["pairlink", "send", "coach-1", "hello there", "--to", "905551234567"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Send(args) => {
			assert_eq!(args.tenant, "coach-1");
			assert_eq!(args.body, "hello there");
			assert_eq!(args.to.as_deref(), Some("905551234567"));
		}
		_ => panic!("Expected Send command"),
	}
}

#[test]
fn parse_send_defaults_to_self() {
	let cli = Cli::try_parse_from(["pairlink", "send", "coach-1", "note"]).unwrap();

	match cli.command {
		Commands::Send(args) => assert_eq!(args.to, None),
		_ => panic!("Expected Send command"),
	}
}

#[test]
fn parse_tenant_commands() {
	let cli = Cli::try_parse_from(["pairlink", "status", "coach-1"]).unwrap();
	assert!(matches!(cli.command, Commands::Status(ref args) if args.tenant == "coach-1"));

	let cli = Cli::try_parse_from(["pairlink", "connect", "coach-1"]).unwrap();
	assert!(matches!(cli.command, Commands::Connect(_)));

	let cli = Cli::try_parse_from(["pairlink", "reset", "coach-1"]).unwrap();
	assert!(matches!(cli.command, Commands::Reset(_)));

	let cli = Cli::try_parse_from(["pairlink", "status-all"]).unwrap();
	assert!(matches!(cli.command, Commands::StatusAll));
}

#[test]
fn tenant_is_required() {
	assert!(Cli::try_parse_from(["pairlink", "disconnect"]).is_err());
}

#[test]
fn parse_serve_overrides() {
	let args = vec![
		"pairlink",
		"serve",
		"--config",
		"/etc/pairlink.json",
		"--bind",
		"0.0.0.0:9000",
		"--sessions-dir",
		"/srv/sessions",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Serve(args) => {
			assert_eq!(args.config, Some(PathBuf::from("/etc/pairlink.json")));
			let overrides = args.overrides();
			assert_eq!(overrides.bind.map(|addr| addr.port()), Some(9000));
			assert_eq!(overrides.sessions_dir, Some(PathBuf::from("/srv/sessions")));
			assert_eq!(overrides.store_dir, None);
		}
		_ => panic!("Expected Serve command"),
	}
}

#[test]
fn global_flags_after_subcommand() {
	let cli = Cli::try_parse_from(["pairlink", "status-all", "-vv", "-f", "text", "--server", "http://10.0.0.2:8787"]).unwrap();
	assert_eq!(cli.verbose, 2);
	assert_eq!(cli.format, OutputFormat::Text);
	assert_eq!(cli.server, "http://10.0.0.2:8787");
}

#[test]
fn invalid_bind_is_rejected() {
	assert!(Cli::try_parse_from(["pairlink", "serve", "--bind", "not-an-address"]).is_err());
}
