//! Pairing-code stream over server-sent events.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures::{Stream, StreamExt};
use pairlink::{PairingObserver, PairingSubscription};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use super::AppState;
use crate::error::ServiceError;

/// SSE event name carrying an encoded pairing code.
pub const PAIRING_CODE_EVENT: &str = "pairing_code";

/// Pairing codes for one subscriber. Dropping the stream unsubscribes; the
/// stream ends once the session entry it observes is gone.
pub struct PairingStream {
	codes: UnboundedReceiverStream<String>,
	_subscription: PairingSubscription,
}

impl Stream for PairingStream {
	type Item = Result<Event, Infallible>;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.get_mut()
			.codes
			.poll_next_unpin(cx)
			.map(|code| code.map(|code| Ok(Event::default().event(PAIRING_CODE_EVENT).data(code))))
	}
}

pub(super) async fn pairing_events(
	State(state): State<AppState>,
	Path(tenant_id): Path<String>,
) -> Result<Sse<KeepAliveStream<PairingStream>>, ServiceError> {
	let (tx, rx) = mpsc::unbounded_channel();
	let observer: PairingObserver = Arc::new(move |code: &str| {
		let _ = tx.send(code.to_string());
	});

	let subscription = state
		.manager
		.subscribe_pairing(&tenant_id, observer)
		.await?
		.ok_or_else(|| ServiceError::NotFound(format!("no session for tenant {tenant_id}; connect first")))?;
	debug!(target: "pairlink.http", tenant = %tenant_id, subscription = subscription.id(), "pairing stream opened");

	let stream = PairingStream {
		codes: UnboundedReceiverStream::new(rx),
		_subscription: subscription,
	};
	Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
