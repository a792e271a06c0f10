use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use pairlink_protocol::{Ack, OverviewResponse, SendRequest, StatusResponse, TenantRequest};
use tracing::debug;

use super::AppState;
use crate::error::ServiceError;

type Reply<T> = Result<Json<T>, ServiceError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
	payload
		.map(|Json(value)| value)
		.map_err(|rejection| ServiceError::InvalidInput(rejection.body_text()))
}

pub(super) async fn status(State(state): State<AppState>, Path(tenant_id): Path<String>) -> Reply<StatusResponse> {
	debug!(target: "pairlink.http", tenant = %tenant_id, "status");
	let status = state.manager.status(&tenant_id).await?;
	Ok(Json(status.into()))
}

pub(super) async fn connect(State(state): State<AppState>, Path(tenant_id): Path<String>) -> Reply<StatusResponse> {
	debug!(target: "pairlink.http", tenant = %tenant_id, "connect");
	let snapshot = state.manager.connect(&tenant_id).await?;
	Ok(Json(snapshot.status().into()))
}

pub(super) async fn send(State(state): State<AppState>, payload: Result<Json<SendRequest>, JsonRejection>) -> Reply<Ack> {
	let request = body(payload)?;
	debug!(target: "pairlink.http", tenant = %request.tenant_id, to = ?request.to, "send");
	match request.to.as_deref() {
		Some(to) => state.manager.send(&request.tenant_id, to, &request.body).await?,
		None => state.manager.send_to_self(&request.tenant_id, &request.body).await?,
	}
	Ok(Json(Ack::ok("message sent")))
}

pub(super) async fn disconnect(State(state): State<AppState>, payload: Result<Json<TenantRequest>, JsonRejection>) -> Reply<Ack> {
	let request = body(payload)?;
	state.manager.disconnect(&request.tenant_id).await?;
	Ok(Json(Ack::ok("session disconnected")))
}

pub(super) async fn reset(State(state): State<AppState>, payload: Result<Json<TenantRequest>, JsonRejection>) -> Reply<Ack> {
	let request = body(payload)?;
	state.manager.reset(&request.tenant_id).await?;
	Ok(Json(Ack::ok("session reset; connect again to pair")))
}

pub(super) async fn status_all(State(state): State<AppState>) -> Reply<OverviewResponse> {
	let tenants = state.manager.status_all().await?;
	Ok(Json(OverviewResponse { success: true, tenants }))
}
