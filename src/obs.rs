//! Instrumentation for client operations.
//!
//! Every request, refresh, and replay runs through [`observe`], which wraps it in a
//! `tengra_client.op` span (feature `tracing`) and bumps `tengra_client_op_total{op, outcome}`
//! (feature `metrics`). Without either feature the helpers compile down to plain awaits.

mod counter;
mod span;

pub(crate) use span::{debug_refresh_joined, warn_session_purged};

// self
use crate::_prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OpKind {
	Request,
	Refresh,
	Replay,
}
impl OpKind {
	#[cfg_attr(not(any(feature = "metrics", feature = "tracing")), allow(dead_code))]
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Request => "request",
			Self::Refresh => "refresh",
			Self::Replay => "replay",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OpOutcome {
	Attempt,
	Success,
	Failure,
}
impl OpOutcome {
	#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}

/// Runs `op` inside its span and counts the attempt plus its outcome.
pub(crate) async fn observe<T, E, F>(kind: OpKind, stage: &'static str, op: F) -> Result<T, E>
where
	F: Future<Output = Result<T, E>>,
{
	counter::record(kind, OpOutcome::Attempt);

	let result = span::in_span(kind, stage, op).await;
	let outcome = if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure };

	counter::record(kind, outcome);

	result
}
