//! Client-level error types shared across requests, refreshes, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Explicit refresh attempt failed; stored credentials have been purged.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Response body did not match the requested shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Access token claims could not be decoded.
	#[error(transparent)]
	Claims(#[from] crate::auth::ClaimsError),

	/// No usable session: nothing to refresh, or the refresh this call joined did not succeed.
	#[error("Session is not authenticated or could not be renewed.")]
	Unauthenticated,
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Raw value that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Request path cannot be resolved against the base URL.
	#[error("Request path `{path}` cannot be resolved.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value contains characters HTTP does not allow.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] ::http::header::InvalidHeaderValue),
	/// Request body could not be encoded as JSON.
	#[error("Request body could not be encoded as JSON.")]
	BodyEncode(#[source] serde_json::Error),
}

/// Failures that prevent a response from arriving.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Reasons a session refresh did not yield a new access token.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the session with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// Refresh endpoint returned JSON that does not match `{ token, refreshToken? }`.
	#[error("Refresh endpoint returned malformed JSON.")]
	Malformed {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Refresh endpoint returned an empty access token.
	#[error("Refresh endpoint returned an empty access token.")]
	MissingToken,
	/// Refresh call failed before a response arrived.
	#[error("Refresh call failed at the transport layer.")]
	Transport(#[source] TransportError),
	/// Rotated credentials could not be persisted.
	#[error("Rotated credentials could not be persisted.")]
	Storage(#[source] crate::store::StoreError),
	/// Refresh request could not be constructed.
	#[error("Refresh request could not be constructed.")]
	Request(#[source] ConfigError),
}
impl RefreshError {
	/// HTTP status reported by the refresh endpoint, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status } => Some(*status),
			_ => None,
		}
	}
}

/// Response decoding failures raised by [`crate::http::ApiResponse::json`].
#[derive(Debug, ThisError)]
#[error("Response body with HTTP {status} could not be decoded.")]
pub struct DecodeError {
	/// HTTP status code of the decoded response.
	pub status: u16,
	/// Structured parsing failure.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
}
