use pairlink_protocol::{SessionStatus, TenantDocument, TenantOverview};

use super::*;
use crate::error::ErrorCode;

fn overview(tenant_id: &str, connected: bool, connecting: bool, has_qr_code: bool) -> TenantOverview {
	TenantOverview {
		tenant_id: tenant_id.into(),
		connected,
		connecting,
		has_qr_code,
		document: TenantDocument::default(),
	}
}

#[test]
fn status_text_names_the_state() {
	assert_eq!(StatusResponse::from(SessionStatus::idle()).render_text(), "state: idle");
	assert_eq!(StatusResponse::from(SessionStatus::ready()).render_text(), "state: ready");

	let pairing = StatusResponse::from(SessionStatus::initializing(Some("data:image/svg+xml;base64,AAAA".into())));
	assert_eq!(
		pairing.render_text(),
		"state: initializing\npairing code: data:image/svg+xml;base64,AAAA"
	);
}

#[test]
fn overview_text_has_one_line_per_tenant() {
	let mut ready = overview("coach-a", true, false, false);
	ready.document.phone_number = Some("905551112233".into());
	let response = OverviewResponse {
		success: true,
		tenants: vec![ready, overview("coach-b", false, true, true), overview("coach-c", false, false, false)],
	};

	assert_eq!(
		response.render_text(),
		"coach-a\tconnected\t905551112233\ncoach-b\tconnecting\tawaiting pairing\ncoach-c\toffline"
	);
}

#[test]
fn empty_overview_text() {
	let response = OverviewResponse {
		success: true,
		tenants: vec![],
	};
	assert_eq!(response.render_text(), "no tenants");
}

#[test]
fn ack_text_falls_back_to_ok() {
	assert_eq!(Ack::ok("message sent").render_text(), "message sent");
	let bare = Ack {
		success: true,
		message: None,
	};
	assert_eq!(bare.render_text(), "ok");
}

#[test]
fn json_is_the_default_format() {
	assert_eq!(OutputFormat::default(), OutputFormat::Json);
	assert_eq!(OutputFormat::Text.to_string(), "text");
}

#[test]
fn error_detail_serializes_like_service_errors() {
	let detail = ErrorDetail {
		code: ErrorCode::Unreachable,
		message: "cannot reach pairlink service".into(),
	};
	let body = serde_json::to_value(ErrorBody::new(detail.code, &detail.message)).unwrap();
	assert_eq!(body["error"]["code"], "unreachable");
	assert_eq!(body["success"], false);
}
