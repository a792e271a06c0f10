//! Peer address helpers.

/// Suffix of an individual (non-group) chat address.
pub const INDIVIDUAL_SUFFIX: &str = "@c.us";

/// Pseudo-peer used for status broadcasts.
pub const STATUS_BROADCAST: &str = "status@broadcast";

/// Normalizes a user-supplied peer into a chat address.
///
/// Addresses that already carry an `@` suffix are kept as-is; anything else
/// is treated as a phone number, stripped of every non-digit and suffixed
/// with [`INDIVIDUAL_SUFFIX`]. Returns `None` when no digits remain.
pub fn chat_address(peer: &str) -> Option<String> {
	let peer = peer.trim();
	if peer.contains('@') {
		return Some(peer.to_string());
	}
	let digits: String = peer.chars().filter(char::is_ascii_digit).collect();
	if digits.is_empty() {
		None
	} else {
		Some(format!("{digits}{INDIVIDUAL_SUFFIX}"))
	}
}

/// Returns true for broadcast and status pseudo-peers that are never captured.
pub fn is_broadcast(peer: &str) -> bool {
	peer == STATUS_BROADCAST || peer.ends_with("@broadcast")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn phone_numbers_are_stripped_and_suffixed() {
		assert_eq!(chat_address("+90 555 123-45-67").as_deref(), Some("905551234567@c.us"));
		assert_eq!(chat_address("905551234567").as_deref(), Some("905551234567@c.us"));
	}

	#[test]
	fn existing_addresses_are_kept() {
		assert_eq!(chat_address("12345-678@g.us").as_deref(), Some("12345-678@g.us"));
	}

	#[test]
	fn empty_peers_are_rejected() {
		assert_eq!(chat_address("  "), None);
		assert_eq!(chat_address("abc"), None);
	}

	#[test]
	fn broadcast_peers_are_detected() {
		assert!(is_broadcast("status@broadcast"));
		assert!(is_broadcast("12345@broadcast"));
		assert!(!is_broadcast("905551234567@c.us"));
	}
}
