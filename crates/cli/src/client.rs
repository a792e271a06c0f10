//! HTTP client for a running pairlink service.

use std::time::Duration;

use pairlink_protocol::{Ack, OverviewResponse, SendRequest, StatusResponse, TenantRequest};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{CliError, ErrorBody, ErrorCode, Result};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ServiceClient {
	http: reqwest::Client,
	base: String,
}

impl ServiceClient {
	pub fn new(base: &str) -> Result<Self> {
		let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
		Ok(Self {
			http,
			base: base.trim_end_matches('/').to_string(),
		})
	}

	pub async fn status(&self, tenant: &str) -> Result<StatusResponse> {
		let path = format!("/status/{}", checked_tenant(tenant)?);
		self.execute(self.request(Method::GET, &path)).await
	}

	pub async fn connect(&self, tenant: &str) -> Result<StatusResponse> {
		let path = format!("/connect/{}", checked_tenant(tenant)?);
		self.execute(self.request(Method::POST, &path)).await
	}

	pub async fn send(&self, request: &SendRequest) -> Result<Ack> {
		checked_tenant(&request.tenant_id)?;
		self.execute(self.request(Method::POST, "/send").json(request)).await
	}

	pub async fn disconnect(&self, tenant: &str) -> Result<Ack> {
		let body = TenantRequest {
			tenant_id: checked_tenant(tenant)?.to_string(),
		};
		self.execute(self.request(Method::POST, "/disconnect").json(&body)).await
	}

	pub async fn reset(&self, tenant: &str) -> Result<Ack> {
		let body = TenantRequest {
			tenant_id: checked_tenant(tenant)?.to_string(),
		};
		self.execute(self.request(Method::POST, "/reset-session").json(&body)).await
	}

	pub async fn status_all(&self) -> Result<OverviewResponse> {
		self.execute(self.request(Method::GET, "/status-all")).await
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.http.request(method, format!("{}{path}", self.base))
	}

	async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
		let response = request.send().await.map_err(|source| {
			if source.is_connect() || source.is_timeout() {
				CliError::Unreachable {
					url: self.base.clone(),
					source,
				}
			} else {
				CliError::Http(source)
			}
		})?;
		decode(response).await
	}
}

/// Tenant ids go into URL paths, so reject anything the service would.
fn checked_tenant(tenant: &str) -> Result<&str> {
	pairlink::validate_tenant_id(tenant).map_err(|err| CliError::InvalidInput(err.to_string()))?;
	Ok(tenant)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
	let status = response.status();
	let bytes = response.bytes().await?;
	debug!(target: "pairlink.http", status = status.as_u16(), len = bytes.len(), "service response");

	if status.is_success() {
		return Ok(serde_json::from_slice(&bytes)?);
	}
	match serde_json::from_slice::<ErrorBody>(&bytes) {
		Ok(body) => Err(CliError::Service {
			code: body.error.code,
			message: body.error.message,
		}),
		Err(_) => Err(CliError::Service {
			code: ErrorCode::InternalError,
			message: format!("service returned {status}: {}", String::from_utf8_lossy(&bytes)),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn base_url_is_normalized() {
		let client = ServiceClient::new("http://localhost:8787/").unwrap();
		assert_eq!(client.base, "http://localhost:8787");
	}

	#[test]
	fn tenant_ids_are_checked_before_sending() {
		assert!(checked_tenant("coach-1").is_ok());
		assert!(matches!(checked_tenant("../admin"), Err(CliError::InvalidInput(_))));
	}
}
