//! Transport primitives for backend calls.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack, along
//! with [`RequestOptions`] for describing a call and [`ApiResponse`] for inspecting the result.
//! Requests and responses use the `http` crate's types with fully buffered bodies so a request
//! can be replayed after a token refresh.

// crates.io
use ::http::{
	HeaderMap, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue, RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, DecodeError, TransportError},
};

/// Fully buffered outbound request.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Fully buffered inbound response.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute backend requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a client, and the futures they return must be `Send` so callers can spawn client
/// calls onto multi-threaded executors. Transports report any HTTP status as a successful
/// response; only failures that prevent a response from arriving map to [`TransportError`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and buffers the full response body.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Method, headers, and body for a single backend call.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// HTTP method; `GET` unless overridden.
	pub method: Method,
	/// Caller-supplied headers. An `Authorization` header here suppresses bearer injection.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
}
impl RequestOptions {
	/// Creates options for the provided method.
	pub fn new(method: Method) -> Self {
		Self { method, ..Default::default() }
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and defaults the content type to `application/json`.
	pub fn json<B>(mut self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::BodyEncode)?);

		self.headers
			.entry(CONTENT_TYPE)
			.or_insert_with(|| HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Returns `true` when the caller supplied its own `Authorization` header.
	pub fn has_authorization(&self) -> bool {
		self.headers.contains_key(AUTHORIZATION)
	}

	/// Builds the outbound request for `url`, attaching `bearer` unless the caller set
	/// `Authorization` already.
	pub(crate) fn to_request(
		&self,
		url: &Url,
		bearer: Option<HeaderValue>,
	) -> Result<HttpRequest, ConfigError> {
		let mut request = ::http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;

		*request.headers_mut() = self.headers.clone();

		if let Some(bearer) = bearer
			&& !self.has_authorization()
		{
			request.headers_mut().insert(AUTHORIZATION, bearer);
		}

		Ok(request)
	}
}

/// Response returned to callers, with the body already buffered.
#[derive(Clone, Debug)]
pub struct ApiResponse(HttpResponse);
impl ApiResponse {
	/// HTTP status code.
	pub fn status(&self) -> StatusCode {
		self.0.status()
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status().is_success()
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		self.0.headers()
	}

	/// Raw response body.
	pub fn body(&self) -> &[u8] {
		self.0.body()
	}

	/// Response body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(self.body()).into_owned()
	}

	/// Decodes the body as JSON, reporting the path of the first mismatched field.
	pub fn json<T>(&self) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(self.body());

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			DecodeError { status: self.status().as_u16(), source }.into()
		})
	}

	/// `Retry-After` hint expressed as a relative duration, if present and in the future.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.headers())
	}

	/// Consumes the wrapper and returns the underlying response.
	pub fn into_inner(self) -> HttpResponse {
		self.0
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		Self(response)
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
