//! Unverified JWT claim inspection for access tokens.
//!
//! The backend signs its access tokens; this module only peeks at the payload so callers can
//! show the signed-in role or schedule a refresh ahead of expiry. Nothing here validates a
//! signature, so decoded claims must never drive authorization decisions.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Errors raised while decoding access token claims.
#[derive(Debug, ThisError)]
pub enum ClaimsError {
	/// Token does not have the `header.payload.signature` layout.
	#[error("Access token is not a JWT.")]
	NotJwt,
	/// Payload segment is not valid base64url.
	#[error("Access token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// Payload segment is not a JSON object.
	#[error("Access token payload is not valid JSON.")]
	Json(#[from] serde_json::Error),
}

/// Claims carried by a Tengra access token.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AccessClaims {
	/// Subject (user identifier).
	#[serde(default)]
	pub sub: Option<String>,
	/// Platform role, such as `admin` or `user`.
	#[serde(default)]
	pub role: Option<String>,
	/// Expiry as seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<i64>,
	/// Any claims not modeled above.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}
impl AccessClaims {
	/// Decodes the payload segment of `token` without verifying its signature.
	pub fn decode(token: &TokenSecret) -> Result<Self, ClaimsError> {
		let mut segments = token.expose().split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
			_ => return Err(ClaimsError::NotJwt),
		};
		// Some issuers keep the padding even though JWTs are unpadded base64url.
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;

		Ok(serde_json::from_slice(&bytes)?)
	}

	/// Expiry instant, when the token declares one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}

	/// Returns `true` once `now` has reached the declared expiry.
	///
	/// Tokens without an `exp` claim never report expiry.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at().is_some_and(|expires_at| now >= expires_at)
	}
}
