//! Spans and events; every helper is a no-op without the `tracing` feature.

// self
use crate::{_prelude::*, obs::OpKind};

#[cfg(feature = "tracing")]
pub(super) async fn in_span<F>(kind: OpKind, stage: &'static str, op: F) -> F::Output
where
	F: Future,
{
	use tracing::Instrument;

	op.instrument(tracing::info_span!("tengra_client.op", op = kind.as_str(), stage)).await
}

#[cfg(not(feature = "tracing"))]
pub(super) async fn in_span<F>(_: OpKind, _: &'static str, op: F) -> F::Output
where
	F: Future,
{
	op.await
}

/// A `401` queued behind the refresh already in flight.
pub(crate) fn debug_refresh_joined(position: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(position, "joined in-flight session refresh");
	#[cfg(not(feature = "tracing"))]
	let _ = position;
}

/// A failed refresh purged the stored session.
pub(crate) fn warn_session_purged(status: Option<u16>, reason: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(status, reason, "session refresh failed; stored credentials purged");
	#[cfg(not(feature = "tracing"))]
	let _ = (status, reason);
}
