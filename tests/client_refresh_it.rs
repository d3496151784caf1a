#![cfg(feature = "reqwest")]

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;
// self
use tengra_client::{
	auth::{SessionCredentials, TokenSecret},
	client::{RefreshPhase, ReqwestTengraClient},
	config::ClientConfig,
	error::Error,
	store::MemoryTokenStore,
};

const EXPIRED: &str = "access-expired";
const FRESH: &str = "access-fresh";
const REFRESH: &str = "refresh-valid";

fn build_client(
	server: &MockServer,
	credentials: SessionCredentials,
) -> (ReqwestTengraClient, Arc<MemoryTokenStore>) {
	let config =
		ClientConfig::new(&server.base_url()).expect("Mock server base URL should be valid.");
	let store = Arc::new(MemoryTokenStore::with_credentials(credentials));
	let client = ReqwestTengraClient::new(config, store.clone());

	(client, store)
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_retried() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/users").header("authorization", "Bearer access-expired");
			then.status(401).body("token expired");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh")
				.header("content-type", "application/json")
				.json_body(json!({ "refreshToken": REFRESH }));
			then.status(200).json_body(json!({ "token": FRESH }));
		})
		.await;
	let retried = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/users").header("authorization", "Bearer access-fresh");
			then.status(200).json_body(json!([{ "id": 1, "username": "tengra" }]));
		})
		.await;
	let response = client.get("/admin/users").await.expect("Refreshed request should succeed.");

	expired.assert_async().await;
	refresh.assert_async().await;
	retried.assert_async().await;

	assert_eq!(response.status(), 200);

	let users: serde_json::Value = response.json().expect("Retried body should be JSON.");

	assert_eq!(users[0]["username"], "tengra");
	// No rotated refresh token in the response keeps the existing one.
	assert_eq!(store.snapshot(), SessionCredentials::new(FRESH, REFRESH));
	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(client.refresh_metrics.successes(), 1);
	assert_eq!(client.refresh_phase(), RefreshPhase::Idle);
}

#[tokio::test]
async fn missing_refresh_token_returns_original_unauthorized() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::access_only(EXPIRED));
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/users");
			then.status(401).body("login required");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "token": FRESH }));
		})
		.await;
	let mut failures = client.auth_failures();
	let response = client.get("/admin/users").await.expect("A 401 is not a transport error.");

	protected.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;

	assert_eq!(response.status(), 401);
	assert_eq!(response.text(), "login required");
	assert_eq!(store.snapshot(), SessionCredentials::access_only(EXPIRED));
	assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn rotated_refresh_token_is_persisted() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));

	server
		.mock_async(|when, then| {
			when.method(PUT).path("/blogs/7").header("authorization", "Bearer access-expired");
			then.status(401);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.json_body(json!({ "token": FRESH, "refreshToken": "refresh-rotated" }));
		})
		.await;

	let retried = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path("/blogs/7")
				.header("authorization", "Bearer access-fresh")
				.json_body(json!({ "title": "Devlog #7" }));
			then.status(204);
		})
		.await;
	let response = client
		.put("/blogs/7", &json!({ "title": "Devlog #7" }))
		.await
		.expect("Refreshed update should succeed.");

	retried.assert_async().await;

	assert_eq!(response.status(), 204);
	assert_eq!(store.snapshot(), SessionCredentials::new(FRESH, "refresh-rotated"));
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
	const CONCURRENCY: usize = 5;

	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/analytics").header("authorization", "Bearer access-expired");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200)
				.delay(StdDuration::from_millis(300))
				.json_body(json!({ "token": FRESH }));
		})
		.await;
	let retried = server
		.mock_async(|when, then| {
			when.method(GET).path("/analytics").header("authorization", "Bearer access-fresh");
			then.status(200).json_body(json!({ "visits": 42 }));
		})
		.await;
	let handles = (0..CONCURRENCY)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.get("/analytics").await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let response = handle
			.await
			.expect("Request task should not panic.")
			.expect("Every queued request should be replayed successfully.");

		assert_eq!(response.status(), 200);
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(CONCURRENCY).await;
	retried.assert_calls_async(CONCURRENCY).await;

	assert_eq!(client.refresh_metrics.attempts(), 1);
	assert_eq!(store.snapshot().access_token, Some(TokenSecret::new(FRESH)));
	assert_eq!(client.refresh_phase(), RefreshPhase::Idle);
}

#[tokio::test]
async fn failed_refresh_purges_tokens_and_signals_once() {
	const CONCURRENCY: usize = 4;

	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));
	let protected = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin/audit-logs");
			then.status(401).body("expired");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(403).delay(StdDuration::from_millis(300)).body("refresh token revoked");
		})
		.await;
	let mut failures = client.auth_failures();
	let handles = (0..CONCURRENCY)
		.map(|_| {
			let client = client.clone();

			tokio::spawn(async move { client.get("/admin/audit-logs").await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let response = handle
			.await
			.expect("Request task should not panic.")
			.expect("Refresh failures surface as the original 401, not as errors.");

		assert_eq!(response.status(), 401);
		assert_eq!(response.text(), "expired");
	}

	refresh.assert_calls_async(1).await;
	protected.assert_calls_async(CONCURRENCY).await;

	assert!(store.snapshot().is_empty());

	let failure = failures.try_recv().expect("Auth failure should be broadcast.");

	assert_eq!(failure.status, Some(403));
	assert!(matches!(failures.try_recv(), Err(TryRecvError::Empty)));
	assert_eq!(client.auth_failure_signal().emitted(), 1);
	assert_eq!(client.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn malformed_refresh_response_is_terminal() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));

	server
		.mock_async(|when, then| {
			when.method(GET).path("/faq");
			then.status(401);
		})
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "accessToken": FRESH }));
		})
		.await;
	let mut failures = client.auth_failures();
	let response = client.get("/faq").await.expect("A 401 is not a transport error.");

	refresh.assert_async().await;

	assert_eq!(response.status(), 401);
	assert!(store.snapshot().is_empty());
	assert!(failures.try_recv().expect("Auth failure should be broadcast.").status.is_none());
}

#[tokio::test]
async fn explicit_refresh_reports_the_failure() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(401);
		})
		.await;

	let err = client.refresh_session().await.expect_err("Rejected refresh should surface.");

	assert!(matches!(err, Error::Refresh(ref inner) if inner.status() == Some(401)));
	assert!(store.snapshot().is_empty());

	let err = client.refresh_session().await.expect_err("Purged session cannot be refreshed.");

	assert!(matches!(err, Error::Unauthenticated));
	assert_eq!(client.refresh_metrics.attempts(), 1);
}

#[tokio::test]
async fn explicit_refresh_rotates_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_client(&server, SessionCredentials::new(EXPIRED, REFRESH));
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh").json_body(json!({ "refreshToken": REFRESH }));
			then.status(200).json_body(json!({ "token": FRESH }));
		})
		.await;
	let token = client.refresh_session().await.expect("Refresh should succeed.");

	refresh.assert_async().await;

	assert_eq!(token.expose(), FRESH);
	assert_eq!(store.snapshot(), SessionCredentials::new(FRESH, REFRESH));
}
