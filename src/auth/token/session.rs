//! Access/refresh token pair persisted between requests.

// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, ClaimsError, TokenSecret},
};

/// Credentials held in client-side storage under the `authToken` and `refreshToken` keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
	/// Bearer token attached to outgoing requests.
	#[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
	pub access_token: Option<TokenSecret>,
	/// Long-lived token exchanged for a new access token on `401`.
	#[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
}
impl SessionCredentials {
	/// Creates a full credential pair, as returned by a sign-in.
	pub fn new(
		access_token: impl Into<TokenSecret>,
		refresh_token: impl Into<TokenSecret>,
	) -> Self {
		Self { access_token: Some(access_token.into()), refresh_token: Some(refresh_token.into()) }
	}

	/// Creates credentials that carry only an access token.
	pub fn access_only(access_token: impl Into<TokenSecret>) -> Self {
		Self { access_token: Some(access_token.into()), refresh_token: None }
	}

	/// Returns `true` when neither token is present.
	pub fn is_empty(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_none()
	}

	/// Replaces the access token and, when provided, the refresh token.
	///
	/// A refresh endpoint that does not rotate the refresh token leaves the current one in place.
	pub fn rotate(&self, access_token: TokenSecret, refresh_token: Option<TokenSecret>) -> Self {
		Self {
			access_token: Some(access_token),
			refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
		}
	}

	/// Decodes the unverified claims carried by the access token, if any.
	pub fn access_claims(&self) -> Option<Result<AccessClaims, ClaimsError>> {
		self.access_token.as_ref().map(AccessClaims::decode)
	}
}
