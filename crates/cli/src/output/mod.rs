//! Output of client subcommands.
//!
//! JSON output is the service's response body, pretty-printed, so scripts see
//! the same shape whether they call the HTTP API or the CLI. On failure the
//! JSON form is the service error body:
//!
//! ```json
//! { "success": false, "error": { "code": "not_ready", "message": "..." } }
//! ```

#[cfg(test)]
mod tests;

use std::fmt::Write as _;
use std::io::{self, Write};

use pairlink_protocol::{Ack, OverviewResponse, StatusResponse};
use serde::Serialize;

use crate::error::{ErrorBody, ErrorDetail};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Pretty JSON (default)
	#[default]
	Json,
	/// Human-readable text
	Text,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

/// Text rendering of a response body.
pub trait RenderText {
	fn render_text(&self) -> String;
}

impl RenderText for StatusResponse {
	fn render_text(&self) -> String {
		let status = &self.status;
		let state = if status.is_ready {
			"ready"
		} else if status.is_initializing {
			"initializing"
		} else {
			"idle"
		};
		let mut out = format!("state: {state}");
		if let Some(code) = &status.qr_code {
			let _ = write!(out, "\npairing code: {code}");
		}
		out
	}
}

impl RenderText for OverviewResponse {
	fn render_text(&self) -> String {
		if self.tenants.is_empty() {
			return "no tenants".to_string();
		}
		let mut out = String::new();
		for (i, tenant) in self.tenants.iter().enumerate() {
			if i > 0 {
				out.push('\n');
			}
			let state = if tenant.connected {
				"connected"
			} else if tenant.connecting {
				"connecting"
			} else {
				"offline"
			};
			let _ = write!(out, "{}\t{state}", tenant.tenant_id);
			if tenant.has_qr_code {
				out.push_str("\tawaiting pairing");
			}
			if let Some(phone) = &tenant.document.phone_number {
				let _ = write!(out, "\t{phone}");
			}
		}
		out
	}
}

impl RenderText for Ack {
	fn render_text(&self) -> String {
		self.message.clone().unwrap_or_else(|| "ok".to_string())
	}
}

/// Prints a successful response body to stdout.
pub fn print_result<T: Serialize + RenderText>(result: &T, format: OutputFormat) {
	let mut stdout = io::stdout().lock();
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				let _ = writeln!(stdout, "{json}");
			}
		}
		OutputFormat::Text => {
			let _ = writeln!(stdout, "{}", result.render_text());
		}
	}
}

/// Prints the JSON error body to stdout (for scripts).
pub fn print_error_json(error: &ErrorDetail) {
	let body = ErrorBody::new(error.code, &error.message);
	if let Ok(json) = serde_json::to_string_pretty(&body) {
		println!("{json}");
	}
}

/// Print an error to stderr (for humans)
pub fn print_error_stderr(error: &ErrorDetail) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}
