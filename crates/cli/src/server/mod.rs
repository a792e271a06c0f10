//! HTTP surface of the session manager.
//!
//! ```text
//! GET       /health
//! GET       /status/{tenantId}
//! GET|POST  /connect/{tenantId}
//! POST      /send
//! POST      /disconnect
//! POST      /reset-session
//! GET       /status-all
//! GET       /pairing/{tenantId}/events   (server-sent events)
//! ```

mod events;
mod routes;
#[cfg(test)]
mod tests;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use pairlink::{BridgeFactory, CredentialStore, FileStore, SessionManager};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServiceConfig;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
	pub manager: SessionManager,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(|| async { "OK" }))
		.route("/status/{tenant_id}", get(routes::status))
		.route("/connect/{tenant_id}", get(routes::connect).post(routes::connect))
		.route("/send", post(routes::send))
		.route("/disconnect", post(routes::disconnect))
		.route("/reset-session", post(routes::reset))
		.route("/status-all", get(routes::status_all))
		.route("/pairing/{tenant_id}/events", get(events::pairing_events))
		.with_state(state)
}

/// Builds the production session manager from `config`.
pub fn build_manager(config: &ServiceConfig) -> Result<SessionManager> {
	let location = pairlink_runtime::locate_bridge(config.node.as_deref(), config.bridge_script.as_deref())
		.context("Failed to locate the protocol bridge")?;
	std::fs::create_dir_all(&config.sessions_dir)
		.with_context(|| format!("Failed to create sessions directory {}", config.sessions_dir.display()))?;

	let manager_config = config.manager_config();
	let factory = BridgeFactory::new(location, manager_config.request_timeout);
	Ok(SessionManager::new(
		Arc::new(factory),
		CredentialStore::new(&config.sessions_dir),
		Arc::new(FileStore::new(&config.store_dir)),
		manager_config,
	))
}

/// Runs the service until SIGINT/SIGTERM, then destroys every resident session.
pub async fn serve(config: ServiceConfig) -> Result<()> {
	let manager = build_manager(&config)?;
	run(manager, config.bind).await
}

pub async fn run(manager: SessionManager, bind: SocketAddr) -> Result<()> {
	let shutdown = shutdown_signal()?;
	let listener = TcpListener::bind(bind)
		.await
		.with_context(|| format!("Failed to bind {bind}"))?;
	info!(target: "pairlink.http", addr = %bind, "pairlink service listening");

	let app = router(AppState {
		manager: manager.clone(),
	});
	let result = axum::serve(listener, app.into_make_service())
		.with_graceful_shutdown(shutdown)
		.await
		.context("HTTP server error");

	manager.shutdown_all().await;
	info!(target: "pairlink.http", "pairlink service stopped");
	result
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
	let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

	Ok(async move {
		tokio::select! {
			_ = sigterm.recv() => info!(target: "pairlink.http", "received SIGTERM, shutting down"),
			_ = sigint.recv() => info!(target: "pairlink.http", "received SIGINT, shutting down"),
		}
	})
}

#[cfg(windows)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
	Ok(async {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!(target: "pairlink.http", "received Ctrl+C, shutting down");
		}
	})
}
