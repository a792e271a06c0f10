use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Stable machine-readable error codes shared by the service and the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
	InvalidInput,
	NotFound,
	/// No ready session; poll status and retry.
	NotReady,
	/// The session was ready but the remote side rejected the send.
	TransportFailed,
	InternalError,
	/// The service could not be reached (client side only).
	Unreachable,
}

impl ErrorCode {
	pub fn status(self) -> StatusCode {
		match self {
			ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
			ErrorCode::NotFound => StatusCode::NOT_FOUND,
			ErrorCode::NotReady => StatusCode::CONFLICT,
			ErrorCode::TransportFailed => StatusCode::BAD_GATEWAY,
			ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
			ErrorCode::Unreachable => StatusCode::SERVICE_UNAVAILABLE,
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::InvalidInput => write!(f, "invalid_input"),
			ErrorCode::NotFound => write!(f, "not_found"),
			ErrorCode::NotReady => write!(f, "not_ready"),
			ErrorCode::TransportFailed => write!(f, "transport_failed"),
			ErrorCode::InternalError => write!(f, "internal_error"),
			ErrorCode::Unreachable => write!(f, "unreachable"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
	pub code: ErrorCode,
	pub message: String,
}

/// `{ "success": false, "error": { "code", "message" } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
	pub success: bool,
	pub error: ErrorDetail,
}

impl ErrorBody {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			success: false,
			error: ErrorDetail {
				code,
				message: message.into(),
			},
		}
	}
}

/// Failure of an HTTP handler.
#[derive(Debug, Error)]
pub enum ServiceError {
	#[error("{0}")]
	InvalidInput(String),

	#[error("{0}")]
	NotFound(String),

	#[error(transparent)]
	Session(#[from] pairlink::Error),
}

impl ServiceError {
	pub fn code(&self) -> ErrorCode {
		match self {
			ServiceError::InvalidInput(_) => ErrorCode::InvalidInput,
			ServiceError::NotFound(_) => ErrorCode::NotFound,
			ServiceError::Session(err) => match err {
				pairlink::Error::NotReady { .. } => ErrorCode::NotReady,
				pairlink::Error::Transport(_) => ErrorCode::TransportFailed,
				pairlink::Error::InvalidTenant(_) | pairlink::Error::InvalidPeer(_) => ErrorCode::InvalidInput,
				pairlink::Error::Client(_) | pairlink::Error::Pairing(_) | pairlink::Error::Store(_) | pairlink::Error::Io(_) => {
					ErrorCode::InternalError
				}
			},
		}
	}
}

impl IntoResponse for ServiceError {
	fn into_response(self) -> Response {
		let code = self.code();
		let message = self.to_string();
		match code {
			ErrorCode::InternalError => error!(target: "pairlink.http", code = %code, error = %message, "request failed"),
			_ => warn!(target: "pairlink.http", code = %code, error = %message, "request rejected"),
		}
		(code.status(), Json(ErrorBody::new(code, message))).into_response()
	}
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Failure of a CLI subcommand.
#[derive(Debug, Error)]
pub enum CliError {
	/// The service answered with an error body.
	#[error("{message}")]
	Service { code: ErrorCode, message: String },

	#[error("cannot reach pairlink service at {url}: {source}")]
	Unreachable {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("{0}")]
	InvalidInput(String),

	#[error(transparent)]
	Http(#[from] reqwest::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// Error code and message for structured output.
	pub fn to_detail(&self) -> ErrorDetail {
		let code = match self {
			CliError::Service { code, .. } => *code,
			CliError::Unreachable { .. } => ErrorCode::Unreachable,
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Http(_) | CliError::Io(_) | CliError::Json(_) | CliError::Anyhow(_) => ErrorCode::InternalError,
		};
		ErrorDetail {
			code,
			message: self.to_string(),
		}
	}
}
