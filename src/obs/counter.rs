// self
use crate::obs::{OpKind, OpOutcome};

#[cfg(feature = "metrics")]
pub(super) fn record(kind: OpKind, outcome: OpOutcome) {
	metrics::counter!(
		"tengra_client_op_total",
		"op" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
}

#[cfg(not(feature = "metrics"))]
pub(super) fn record(_: OpKind, _: OpOutcome) {}
