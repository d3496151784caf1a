//! Single-flight session refresh.
//!
//! Each client instance owns a [`RefreshState`] that is either idle or refreshing. The first
//! request to observe a `401` while idle leads the refresh: it posts the stored refresh token to
//! the refresh endpoint, persists the rotated credentials, and wakes every request that queued
//! up behind it in FIFO order. A failed refresh purges both tokens and fires the auth-failure
//! signal exactly once; queued requests then return their own `401`.
//!
//! The state lock is synchronous and never held across an `.await`. Waiters hold a oneshot
//! receiver, and the leader holds a [`RefreshLease`] whose drop always returns the machine to
//! idle, so a leader future dropped mid-refresh cannot wedge the client.
//!
//! Store reads are asynchronous, so a request can read its credentials while a refresh is in
//! flight and only reach [`take_turn`] after that refresh finished. The new leader therefore
//! re-reads the store once it holds the lease and adopts an access token that already replaced
//! the one its request was rejected with, instead of spending a refresh token that was rotated.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::Method;
use tokio::sync::oneshot::{self, Receiver, Sender};
// self
use crate::{
	_prelude::*,
	auth::{AuthFailure, SessionCredentials, TokenSecret},
	client::TengraClient,
	error::RefreshError,
	http::{HttpTransport, RequestOptions},
	obs::{self, OpKind},
};

type Waiter = Sender<Option<TokenSecret>>;

/// Observable phase of a client's refresh state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No refresh is in flight.
	Idle,
	/// A refresh is in flight; further `401`s queue behind it.
	Refreshing,
}

#[derive(Debug, Default)]
pub(crate) enum RefreshState {
	#[default]
	Idle,
	Refreshing {
		waiters: VecDeque<Waiter>,
	},
}
impl RefreshState {
	pub(crate) fn phase(&self) -> RefreshPhase {
		match self {
			Self::Idle => RefreshPhase::Idle,
			Self::Refreshing { .. } => RefreshPhase::Refreshing,
		}
	}
}

/// What a request that just saw `401` should do next.
pub(crate) enum RefreshTurn {
	/// Idle and no refresh token stored; keep the `401`.
	Unavailable,
	/// This request leads the refresh.
	Lead(RefreshLease),
	/// Another request is refreshing; wait for its outcome.
	Wait(Receiver<Option<TokenSecret>>),
}

/// Exclusive right to run the in-flight refresh.
///
/// Dropping the lease notifies every waiter with the resolved token (or `None`) in queue order,
/// then returns the state machine to idle.
pub(crate) struct RefreshLease {
	state: Arc<Mutex<RefreshState>>,
	token: Option<TokenSecret>,
}
impl RefreshLease {
	pub(crate) fn resolve(mut self, token: Option<TokenSecret>) {
		self.token = token;
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		let mut state = self.state.lock();

		if let RefreshState::Refreshing { waiters } = &mut *state {
			for waiter in waiters.drain(..) {
				// A waiter whose request was dropped no longer listens.
				let _ = waiter.send(self.token.clone());
			}
		}

		*state = RefreshState::Idle;
	}
}

/// Joins the in-flight refresh or claims the lead.
pub(crate) fn take_turn(
	state: &Arc<Mutex<RefreshState>>,
	refresh_token: Option<TokenSecret>,
	metrics: &RefreshMetrics,
) -> RefreshTurn {
	let mut guard = state.lock();

	if let RefreshState::Refreshing { waiters } = &mut *guard {
		let (tx, rx) = oneshot::channel();

		waiters.push_back(tx);
		metrics.record_queued();
		obs::debug_refresh_joined(waiters.len());

		return RefreshTurn::Wait(rx);
	}

	if !refresh_token.is_some_and(|token| !token.is_blank()) {
		return RefreshTurn::Unavailable;
	}

	*guard = RefreshState::Refreshing { waiters: VecDeque::new() };

	RefreshTurn::Lead(RefreshLease { state: state.clone(), token: None })
}

/// How a lease holder concluded its turn.
enum Settled {
	/// Another refresh already stored a newer access token.
	Adopted(TokenSecret),
	/// The refresh endpoint was called.
	Refreshed(Result<TokenSecret, RefreshError>),
	/// Nothing left to refresh with.
	Empty,
}

/// The stored access token, when it differs from the one the failed attempt carried.
fn superseded(sent: Option<&TokenSecret>, credentials: &SessionCredentials) -> Option<TokenSecret> {
	let (sent, current) = (sent?, credentials.access_token.as_ref()?);

	(sent != current).then(|| current.clone())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
	token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
}

impl<C> TengraClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Forces a session refresh through the single-flight machinery.
	///
	/// Joins a refresh that is already in flight instead of starting a second one. A leading call
	/// uses the refresh token stored at the moment it takes the lead. Fails with
	/// [`Error::Unauthenticated`] when no refresh token is stored or when the joined refresh
	/// failed, and with [`Error::Refresh`] when this call led a refresh that failed, which also
	/// purges the store.
	pub async fn refresh_session(&self) -> Result<TokenSecret> {
		let credentials = self.store.load().await?;
		let turn = take_turn(&self.refresh_state, credentials.refresh_token, &self.refresh_metrics);

		match turn {
			RefreshTurn::Unavailable => Err(Error::Unauthenticated),
			RefreshTurn::Wait(rx) => rx.await.ok().flatten().ok_or(Error::Unauthenticated),
			RefreshTurn::Lead(lease) => {
				let credentials = self.store.load().await?;

				match self.settle_lead(lease, None, credentials).await {
					Settled::Adopted(token) => Ok(token),
					Settled::Refreshed(result) => Ok(result?),
					Settled::Empty => Err(Error::Unauthenticated),
				}
			},
		}
	}

	/// Resolves the token a `401`'d request should be retried with, if any.
	///
	/// `sent` is the access token the failed attempt carried. If the store already holds a
	/// different one, a refresh finished in the meantime and no new refresh is needed.
	pub(crate) async fn renew_after_unauthorized(
		&self,
		sent: Option<&TokenSecret>,
	) -> Result<Option<TokenSecret>> {
		let credentials = self.store.load().await?;

		if let Some(current) = superseded(sent, &credentials) {
			return Ok(Some(current));
		}

		let turn = take_turn(&self.refresh_state, credentials.refresh_token, &self.refresh_metrics);

		match turn {
			RefreshTurn::Unavailable => Ok(None),
			// A closed channel means the leader was dropped before resolving.
			RefreshTurn::Wait(rx) => Ok(rx.await.ok().flatten()),
			RefreshTurn::Lead(lease) => {
				let credentials = self.store.load().await?;

				match self.settle_lead(lease, sent, credentials).await {
					Settled::Adopted(token) => Ok(Some(token)),
					Settled::Refreshed(result) => Ok(result.ok()),
					Settled::Empty => Ok(None),
				}
			},
		}
	}

	/// Decides what the holder of a fresh lease does with the credentials it re-read.
	///
	/// The credentials read before taking the lead may predate a refresh that completed in
	/// between, so the leader works from `credentials` loaded after the state transition. A
	/// token that superseded `sent` is handed to the waiters as is, and the refresh runs only
	/// with the refresh token that is stored now.
	async fn settle_lead(
		&self,
		lease: RefreshLease,
		sent: Option<&TokenSecret>,
		credentials: SessionCredentials,
	) -> Settled {
		if let Some(current) = superseded(sent, &credentials) {
			lease.resolve(Some(current.clone()));

			return Settled::Adopted(current);
		}

		match credentials.refresh_token.filter(|token| !token.is_blank()) {
			Some(refresh_token) =>
				Settled::Refreshed(self.lead_refresh(lease, &refresh_token).await),
			None => {
				lease.resolve(None);

				Settled::Empty
			},
		}
	}

	async fn lead_refresh(
		&self,
		lease: RefreshLease,
		refresh_token: &TokenSecret,
	) -> Result<TokenSecret, RefreshError> {
		self.refresh_metrics.record_attempt();

		let result = obs::observe(
			OpKind::Refresh,
			"lead_refresh",
			self.exchange_refresh_token(refresh_token),
		)
		.await;

		match result {
			Ok(token) => {
				self.refresh_metrics.record_success();
				lease.resolve(Some(token.clone()));

				Ok(token)
			},
			Err(err) => {
				// The session is unrecoverable either way; a failed purge must not mask the cause.
				let _ = self.store.clear().await;
				let message = err.to_string();

				self.refresh_metrics.record_failure();
				obs::warn_session_purged(err.status(), &message);
				self.signal.emit(AuthFailure {
					status: err.status(),
					message,
					occurred_at: OffsetDateTime::now_utc(),
				});
				lease.resolve(None);

				Err(err)
			},
		}
	}

	async fn exchange_refresh_token(
		&self,
		refresh_token: &TokenSecret,
	) -> Result<TokenSecret, RefreshError> {
		let url = self.config.refresh_url().map_err(RefreshError::Request)?;
		let request = RequestOptions::new(Method::POST)
			.json(&RefreshRequest { refresh_token: refresh_token.expose() })
			.and_then(|options| options.to_request(&url, None))
			.map_err(RefreshError::Request)?;
		let response = self.transport.execute(request).await.map_err(RefreshError::Transport)?;

		if !response.status().is_success() {
			return Err(RefreshError::Rejected { status: response.status().as_u16() });
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());
		let body: RefreshResponse = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| RefreshError::Malformed { source })?;

		if body.token.is_blank() {
			return Err(RefreshError::MissingToken);
		}

		let current = self.store.load().await.map_err(RefreshError::Storage)?;
		let rotated_refresh = body.refresh_token.filter(|token| !token.is_blank());
		let mut rotated = current.rotate(body.token.clone(), rotated_refresh);

		if rotated.refresh_token.is_none() {
			rotated.refresh_token = Some(refresh_token.clone());
		}

		self.store.save(rotated).await.map_err(RefreshError::Storage)?;

		Ok(body.token)
	}
}
