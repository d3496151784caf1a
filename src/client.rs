//! Authenticated client that injects bearer tokens and recovers from expired sessions.
//!
//! [`TengraClient::request`] attaches the stored access token, and when the backend answers
//! `401` it renews the session through the refresh endpoint before retrying the call once.
//! Concurrent `401`s share a single refresh; see [`refresh`] for the state machine.

pub mod refresh;

pub use refresh::{RefreshMetrics, RefreshPhase};

// crates.io
use ::http::{Method, StatusCode, header::AUTHORIZATION};
use tokio::sync::broadcast::Receiver;
// self
use crate::{
	_prelude::*,
	auth::{AccessClaims, AuthFailure, AuthFailureSignal, SessionCredentials, TokenSecret},
	config::ClientConfig,
	http::{ApiResponse, HttpTransport, RequestOptions},
	obs::{self, OpKind},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestTengraClient = TengraClient<ReqwestTransport>;

/// Authenticated REST client for a single backend origin.
///
/// The client owns the transport, the token store, and the refresh state machine. Clones share
/// all three, so every clone participates in the same single-flight refresh and observes the
/// same auth-failure signal. Independent instances never coordinate with each other.
pub struct TengraClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Backend origin and endpoint paths.
	pub config: ClientConfig,
	/// HTTP transport used for every outbound request, including refreshes.
	pub transport: Arc<C>,
	/// Persistent storage for the access/refresh token pair.
	pub store: Arc<dyn TokenStore>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	signal: AuthFailureSignal,
	refresh_state: Arc<Mutex<refresh::RefreshState>>,
}
impl<C> TengraClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<C>>,
	) -> Self {
		Self {
			config,
			transport: transport.into(),
			store,
			refresh_metrics: Default::default(),
			signal: Default::default(),
			refresh_state: Default::default(),
		}
	}

	/// Subscribes to the broadcast fired after a terminal refresh failure.
	pub fn auth_failures(&self) -> Receiver<AuthFailure> {
		self.signal.subscribe()
	}

	/// Handle to the auth-failure signal shared by this client and its clones.
	pub fn auth_failure_signal(&self) -> &AuthFailureSignal {
		&self.signal
	}

	/// Current phase of the refresh state machine.
	pub fn refresh_phase(&self) -> RefreshPhase {
		self.refresh_state.lock().phase()
	}

	/// Stores credentials issued by a sign-in.
	pub async fn sign_in(&self, credentials: SessionCredentials) -> Result<()> {
		Ok(self.store.save(credentials).await?)
	}

	/// Deletes the stored credentials without firing the auth-failure signal.
	pub async fn sign_out(&self) -> Result<()> {
		Ok(self.store.clear().await?)
	}

	/// Loads the stored credentials.
	pub async fn session(&self) -> Result<SessionCredentials> {
		Ok(self.store.load().await?)
	}

	/// Decodes the unverified claims of the stored access token, if one is present.
	pub async fn session_claims(&self) -> Result<Option<AccessClaims>> {
		let credentials = self.store.load().await?;

		Ok(credentials.access_claims().transpose()?)
	}

	/// Issues a `GET` request.
	pub async fn get(&self, path: &str) -> Result<ApiResponse> {
		self.request(path, RequestOptions::new(Method::GET)).await
	}

	/// Issues a `POST` request with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(path, RequestOptions::new(Method::POST).json(body)?).await
	}

	/// Issues a `PUT` request with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<ApiResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(path, RequestOptions::new(Method::PUT).json(body)?).await
	}

	/// Issues a `DELETE` request.
	pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
		self.request(path, RequestOptions::new(Method::DELETE)).await
	}

	/// Performs a request, renewing the session and retrying once if the backend answers `401`.
	///
	/// Any non-`401` status is returned as-is. A `401` comes back unchanged when no refresh token
	/// is stored or when the refresh fails. Transport errors propagate without retries.
	pub async fn request(&self, path: &str, options: RequestOptions) -> Result<ApiResponse> {
		obs::observe(OpKind::Request, "request", async move {
			let url = self.config.resolve(path)?;
			let credentials = self.store.load().await?;
			let sent = if options.has_authorization() { None } else { credentials.access_token };
			let response = self.send(&url, &options, sent.as_ref()).await?;

			if response.status() != StatusCode::UNAUTHORIZED {
				return Ok(response);
			}

			match self.renew_after_unauthorized(sent.as_ref()).await? {
				Some(token) => self.replay(&url, &options, &token).await,
				None => Ok(response),
			}
		})
		.await
	}

	async fn send(
		&self,
		url: &Url,
		options: &RequestOptions,
		token: Option<&TokenSecret>,
	) -> Result<ApiResponse> {
		let bearer = token.map(TokenSecret::bearer_header).transpose()?;
		let request = options.to_request(url, bearer)?;

		Ok(self.transport.execute(request).await?.into())
	}

	async fn replay(
		&self,
		url: &Url,
		options: &RequestOptions,
		token: &TokenSecret,
	) -> Result<ApiResponse> {
		obs::observe(OpKind::Replay, "replay", async move {
			// The renewed token replaces whatever authorization the first attempt carried.
			let options = options.clone().header(AUTHORIZATION, token.bearer_header()?);

			self.send(url, &options, None).await
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl TengraClient<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}

	/// Creates a client for the backend named by `TENGRA_API_URL`.
	pub fn from_env(store: Arc<dyn TokenStore>) -> Result<Self> {
		Ok(Self::new(ClientConfig::from_env()?, store))
	}
}
impl<C> Clone for TengraClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			store: self.store.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			signal: self.signal.clone(),
			refresh_state: self.refresh_state.clone(),
		}
	}
}
impl<C> Debug for TengraClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TengraClient")
			.field("config", &self.config)
			.field("refresh_phase", &self.refresh_phase())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
