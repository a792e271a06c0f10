use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use futures::StreamExt;
use pairlink::testing::{FakeFactory, seed_credentials};
use pairlink::{CredentialStore, ManagerConfig, MemoryStore, SessionManager, SessionState};
use pairlink_protocol::ClientEvent;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use super::{AppState, router};

struct TestApp {
	dir: TempDir,
	factory: Arc<FakeFactory>,
	manager: SessionManager,
	app: Router,
}

fn test_app(factory: FakeFactory) -> TestApp {
	let dir = TempDir::new().unwrap();
	let factory = Arc::new(factory);
	let manager = SessionManager::new(
		factory.clone(),
		CredentialStore::new(dir.path().join("sessions")),
		Arc::new(MemoryStore::new()),
		ManagerConfig::default(),
	);
	let app = router(AppState {
		manager: manager.clone(),
	});
	TestApp {
		dir,
		factory,
		manager,
		app,
	}
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
	let request = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => request
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string()))
			.unwrap(),
		None => request.body(Body::empty()).unwrap(),
	};
	let response = app.clone().oneshot(request).await.unwrap();
	let status = response.status();
	let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
	let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
	(status, value)
}

async fn wait_for_state(manager: &SessionManager, tenant: &str, state: SessionState) {
	for _ in 0..200 {
		if manager.snapshot(tenant).is_some_and(|s| s.state == state) {
			return;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("{tenant} never reached {state}");
}

#[tokio::test]
async fn health_is_ok() {
	let t = test_app(FakeFactory::new());
	let (status, body) = call(&t.app, Method::GET, "/health", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn status_of_unknown_tenant_is_idle() {
	let t = test_app(FakeFactory::new());
	let (status, body) = call(&t.app, Method::GET, "/status/coach-1", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		body,
		json!({"success": true, "isReady": false, "isInitializing": false, "qrCode": null})
	);
	assert_eq!(t.factory.created("coach-1"), 0);
}

#[tokio::test]
async fn connect_starts_session_with_get_or_post() {
	let t = test_app(FakeFactory::manual());

	let (status, body) = call(&t.app, Method::POST, "/connect/coach-1", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["isInitializing"], true);
	assert_eq!(body["qrCode"], Value::Null);

	let (status, _) = call(&t.app, Method::GET, "/connect/coach-1", None).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(t.factory.created("coach-1"), 1);

	t.factory.latest("coach-1").unwrap().issue_code();
	wait_for_state(&t.manager, "coach-1", SessionState::AwaitingPairing).await;
	let (_, body) = call(&t.app, Method::GET, "/status/coach-1", None).await;
	assert!(body["qrCode"].as_str().unwrap().starts_with("data:image/svg+xml;base64,"));
}

#[tokio::test]
async fn invalid_tenant_is_rejected() {
	let t = test_app(FakeFactory::new());
	let (status, body) = call(&t.app, Method::GET, "/status/bad%20id", None).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["success"], false);
	assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn send_without_ready_session_is_not_ready() {
	let t = test_app(FakeFactory::new());
	let (status, body) = call(
		&t.app,
		Method::POST,
		"/send",
		Some(json!({"tenantId": "coach-1", "to": "905551234567", "body": "hi"})),
	)
	.await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(body["error"]["code"], "not_ready");
}

#[tokio::test]
async fn send_reaches_ready_session() {
	let t = test_app(FakeFactory::new());
	seed_credentials(&t.dir.path().join("sessions").join("coach-1"), "905551112233").unwrap();
	t.manager.connect("coach-1").await.unwrap();
	wait_for_state(&t.manager, "coach-1", SessionState::Ready).await;

	let (status, body) = call(
		&t.app,
		Method::POST,
		"/send",
		Some(json!({"tenantId": "coach-1", "to": "+90 555 123 45 67", "body": "hi"})),
	)
	.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], true);

	let (status, _) = call(&t.app, Method::POST, "/send", Some(json!({"tenantId": "coach-1", "body": "note"}))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(
		t.factory.latest("coach-1").unwrap().sent(),
		vec![
			("905551234567@c.us".to_string(), "hi".to_string()),
			("905551112233@c.us".to_string(), "note".to_string()),
		]
	);

	t.factory.latest("coach-1").unwrap().set_fail_sends(true);
	let (status, body) = call(
		&t.app,
		Method::POST,
		"/send",
		Some(json!({"tenantId": "coach-1", "to": "905551234567", "body": "again"})),
	)
	.await;
	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(body["error"]["code"], "transport_failed");
}

#[tokio::test]
async fn malformed_body_is_invalid_input() {
	let t = test_app(FakeFactory::new());
	let (status, body) = call(&t.app, Method::POST, "/send", Some(json!({"tenantId": "coach-1"}))).await;
	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn disconnect_and_reset_acknowledge() {
	let t = test_app(FakeFactory::manual());
	t.manager.connect("coach-1").await.unwrap();

	let (status, body) = call(&t.app, Method::POST, "/disconnect", Some(json!({"tenantId": "coach-1"}))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], true);
	assert!(t.manager.snapshot("coach-1").is_none());

	let (status, _) = call(&t.app, Method::POST, "/reset-session", Some(json!({"tenantId": "coach-1"}))).await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn status_all_lists_tenants() {
	let t = test_app(FakeFactory::manual());
	t.manager.connect("coach-b").await.unwrap();
	std::fs::create_dir_all(t.dir.path().join("sessions").join("coach-a")).unwrap();

	let (status, body) = call(&t.app, Method::GET, "/status-all", None).await;
	assert_eq!(status, StatusCode::OK);
	let ids: Vec<&str> = body["tenants"]
		.as_array()
		.unwrap()
		.iter()
		.map(|t| t["tenantId"].as_str().unwrap())
		.collect();
	assert_eq!(ids, ["coach-a", "coach-b"]);
}

#[tokio::test]
async fn pairing_events_require_resident_session() {
	let t = test_app(FakeFactory::new());
	let (status, body) = call(&t.app, Method::GET, "/pairing/coach-1/events", None).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn pairing_events_stream_current_code() {
	let t = test_app(FakeFactory::manual());
	t.manager.connect("coach-1").await.unwrap();
	t.factory.latest("coach-1").unwrap().emit(ClientEvent::Qr { code: "abc".into() });
	wait_for_state(&t.manager, "coach-1", SessionState::AwaitingPairing).await;

	let request = Request::builder().uri("/pairing/coach-1/events").body(Body::empty()).unwrap();
	let response = t.app.clone().oneshot(request).await.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

	let mut frames = response.into_body().into_data_stream();
	let frame = frames.next().await.unwrap().unwrap();
	let text = String::from_utf8_lossy(&frame);
	assert!(text.contains("event: pairing_code"));
	assert!(text.contains("data: data:image/svg+xml;base64,"));
}
