//! Pairing-code encoding and observer fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use parking_lot::Mutex;
use qrcode::QrCode;
use qrcode::render::svg;

use crate::error::{Error, Result};

/// Smallest rendered edge of an encoded pairing code, in pixels.
const MIN_DIMENSION: u32 = 300;

/// Encodes a raw pairing code as a displayable `data:image/svg+xml` URL.
pub fn encode_pairing_code(raw: &str) -> Result<String> {
	let code = QrCode::new(raw.as_bytes()).map_err(|e| Error::Pairing(e.to_string()))?;
	let image = code
		.render::<svg::Color>()
		.min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
		.build();
	Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

/// Callback notified with each new encoded pairing code.
pub type PairingObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// Unique identifier for pairing observers.
pub type ObserverId = u64;

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

type ObserverMap = Mutex<IndexMap<ObserverId, PairingObserver>>;

/// Observers registered on one session entry, in registration order.
#[derive(Clone, Default)]
pub struct PairingObservers {
	inner: Arc<ObserverMap>,
}

impl PairingObservers {
	pub fn register(&self, observer: PairingObserver) -> PairingSubscription {
		let id = NEXT_OBSERVER_ID.fetch_add(1, Ordering::SeqCst);
		self.inner.lock().insert(id, observer);
		PairingSubscription {
			id,
			observers: Some(Arc::downgrade(&self.inner)),
		}
	}

	/// Calls every observer with `code`.
	///
	/// Observers run on the caller's task, outside the map lock, so an
	/// observer may register or drop subscriptions.
	pub fn notify(&self, code: &str) {
		let observers: Vec<PairingObserver> = self.inner.lock().values().cloned().collect();
		for observer in observers {
			observer(code);
		}
	}

	pub fn len(&self) -> usize {
		self.inner.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl std::fmt::Debug for PairingObservers {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PairingObservers").field("len", &self.len()).finish()
	}
}

/// RAII handle that unregisters a pairing observer on drop.
///
/// Holds a weak reference to the entry's observer set, so dropping it after
/// the entry was replaced or removed is a no-op.
pub struct PairingSubscription {
	id: ObserverId,
	observers: Option<Weak<ObserverMap>>,
}

impl PairingSubscription {
	pub fn id(&self) -> ObserverId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		self.remove();
	}

	fn remove(&mut self) {
		if let Some(map) = self.observers.take().and_then(|weak| weak.upgrade()) {
			map.lock().shift_remove(&self.id);
		}
	}
}

impl Drop for PairingSubscription {
	fn drop(&mut self) {
		self.remove();
	}
}

impl std::fmt::Debug for PairingSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PairingSubscription")
			.field("id", &self.id)
			.field("active", &self.observers.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn recorder() -> (Arc<Mutex<Vec<String>>>, PairingObserver) {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let observer: PairingObserver = Arc::new(move |code: &str| sink.lock().push(code.to_string()));
		(seen, observer)
	}

	#[test]
	fn encoded_code_is_an_svg_data_url() {
		let encoded = encode_pairing_code("2@abcdef,ghijkl,mnopqr==").unwrap();
		let payload = encoded.strip_prefix("data:image/svg+xml;base64,").unwrap();
		let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
		assert!(svg.contains("<svg"));
	}

	#[test]
	fn distinct_codes_encode_differently() {
		assert_ne!(encode_pairing_code("first").unwrap(), encode_pairing_code("second").unwrap());
	}

	#[test]
	fn observers_are_notified_in_order() {
		let observers = PairingObservers::default();
		let (seen, observer) = recorder();
		let _sub = observers.register(observer);

		observers.notify("one");
		observers.notify("two");
		assert_eq!(*seen.lock(), vec!["one".to_string(), "two".to_string()]);
	}

	#[test]
	fn dropping_subscription_unregisters() {
		let observers = PairingObservers::default();
		let (seen, observer) = recorder();
		let sub = observers.register(observer);
		assert_eq!(observers.len(), 1);

		drop(sub);
		assert!(observers.is_empty());
		observers.notify("late");
		assert!(seen.lock().is_empty());
	}

	#[test]
	fn unsubscribe_after_set_is_gone_is_noop() {
		let observers = PairingObservers::default();
		let (_seen, observer) = recorder();
		let sub = observers.register(observer);
		drop(observers);
		sub.unsubscribe();
	}
}
