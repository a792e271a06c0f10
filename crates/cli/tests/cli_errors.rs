//! Error output of the `pairlink` binary.

use std::process::{Command, Output};

use serde_json::{Value, json};

fn run(args: &[&str]) -> (Output, Value) {
	let output = Command::new(env!("CARGO_BIN_EXE_pairlink"))
		.env_remove("PAIRLINK_SERVER")
		.env_remove("RUST_LOG")
		.args(args)
		.output()
		.expect("failed to execute pairlink");

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let parsed = serde_json::from_str::<Value>(&stdout).unwrap_or_else(|_| json!({ "raw": stdout }));
	(output, parsed)
}

#[test]
fn invalid_tenant_fails_before_any_request() {
	let (output, json) = run(&["--server", "http://127.0.0.1:1", "status", "../etc"]);

	assert!(!output.status.success());
	assert_eq!(json["success"], false);
	assert_eq!(json["error"]["code"], "invalid_input");

	let stderr = String::from_utf8_lossy(&output.stderr);
	assert!(stderr.contains("Error [invalid_input]"), "stderr was: {stderr}");
}

#[test]
fn unreachable_service_is_reported() {
	let (output, json) = run(&["--server", "http://127.0.0.1:1", "status-all"]);

	assert!(!output.status.success());
	assert_eq!(json["error"]["code"], "unreachable");
	let msg = json["error"]["message"].as_str().unwrap_or_default();
	assert!(msg.contains("127.0.0.1:1"), "expected the server url in: {msg}");
}

#[test]
fn text_format_keeps_stdout_clean_on_error() {
	let (output, json) = run(&["-f", "text", "--server", "http://127.0.0.1:1", "connect", "coach-1"]);

	assert!(!output.status.success());
	assert_eq!(json["raw"], "");
	assert!(String::from_utf8_lossy(&output.stderr).contains("Error [unreachable]"));
}
