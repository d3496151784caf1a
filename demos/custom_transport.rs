//! Demonstrates plugging a non-reqwest transport into the client.
//!
//! 1. Implement [`HttpTransport`] so the transport turns an [`HttpRequest`] into an
//!    [`HttpResponse`], reporting only connection-level failures as [`TransportError`].
//! 2. Wrap it in `Arc` and pass it to [`TengraClient::with_transport`].
//! 3. The client handles bearer injection and refresh exactly as it does with reqwest.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use color_eyre::Result;
// self
use tengra_client::{
	auth::SessionCredentials,
	client::TengraClient,
	config::ClientConfig,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	http_types::{StatusCode, header::AUTHORIZATION},
	store::MemoryTokenStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = Arc::new(MemoryTokenStore::with_credentials(SessionCredentials::new(
		"stale-access",
		"demo-refresh",
	)));
	let config = ClientConfig::new("http://backend.invalid")?;
	let backend = Arc::new(MockBackend::default());
	let client: TengraClient<MockBackend> =
		TengraClient::with_transport(config.clone(), store.clone(), backend);
	let response = client.get("/projects").await?;

	println!("Mock backend answered {} with body {}.", response.status(), response.text());
	println!("Refresh attempts so far: {}.", client.refresh_metrics.attempts());

	let offline = MockBackend::default();

	offline.offline.store(true, Ordering::Relaxed);

	let offline_client: TengraClient<MockBackend> =
		TengraClient::with_transport(config, store, Arc::new(offline));

	match offline_client.get("/projects").await {
		Ok(_) => println!("Offline transport unexpectedly produced a response."),
		Err(e) => println!("Transport error surfaced unchanged: {e}."),
	}

	Ok(())
}

#[derive(Debug)]
struct BackendUnreachable;
impl Display for BackendUnreachable {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("backend.invalid is unreachable")
	}
}
impl StdError for BackendUnreachable {}

/// Accepts `Bearer fresh-access` and mints it from any refresh token.
#[derive(Default)]
struct MockBackend {
	offline: AtomicBool,
}
impl MockBackend {
	fn reply(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}
}
impl HttpTransport for MockBackend {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			if self.offline.load(Ordering::Relaxed) {
				return Err(TransportError::network(BackendUnreachable));
			}
			if request.uri().path() == "/auth/refresh" {
				return Ok(Self::reply(StatusCode::OK, r#"{"token":"fresh-access"}"#));
			}

			let authorized = request
				.headers()
				.get(AUTHORIZATION)
				.is_some_and(|value| value == "Bearer fresh-access");

			if authorized {
				Ok(Self::reply(StatusCode::OK, r#"[{"name":"tengra-engine"}]"#))
			} else {
				Ok(Self::reply(StatusCode::UNAUTHORIZED, r#"{"error":"expired"}"#))
			}
		})
	}
}
