//! Broadcast notification fired when a session can no longer be refreshed.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use tokio::sync::broadcast::{self, Receiver, Sender};
// self
use crate::_prelude::*;

/// Event delivered to every subscriber after a terminal refresh failure.
///
/// Consumers typically react by forcing a sign-out or redirecting to the login page. The
/// serialized form carries `occurredAt` as a Unix timestamp so it can be forwarded to a UI as is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFailure {
	/// HTTP status returned by the refresh endpoint, when one was received.
	pub status: Option<u16>,
	/// Human-readable reason derived from the refresh error.
	pub message: String,
	/// Instant the stored credentials were purged.
	#[serde(with = "time::serde::timestamp")]
	pub occurred_at: OffsetDateTime,
}

/// Cloneable handle to a client's auth-failure broadcast channel.
#[derive(Clone, Debug)]
pub struct AuthFailureSignal {
	sender: Sender<AuthFailure>,
	emitted: Arc<AtomicU64>,
}
impl AuthFailureSignal {
	const CAPACITY: usize = 16;

	/// Subscribes to future auth-failure events.
	///
	/// Events emitted before the subscription are not replayed.
	pub fn subscribe(&self) -> Receiver<AuthFailure> {
		self.sender.subscribe()
	}

	/// Total number of events emitted over the lifetime of the signal.
	pub fn emitted(&self) -> u64 {
		self.emitted.load(Ordering::Relaxed)
	}

	pub(crate) fn emit(&self, event: AuthFailure) {
		self.emitted.fetch_add(1, Ordering::Relaxed);
		// Sending only fails when nobody is listening.
		let _ = self.sender.send(event);
	}
}
impl Default for AuthFailureSignal {
	fn default() -> Self {
		let (sender, _) = broadcast::channel(Self::CAPACITY);

		Self { sender, emitted: Default::default() }
	}
}
