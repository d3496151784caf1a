#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use tengra_client::{
	auth::SessionCredentials,
	client::ReqwestTengraClient,
	config::ClientConfig,
	http::RequestOptions,
	http_types::{
		Method,
		header::{AUTHORIZATION, HeaderValue},
	},
	store::MemoryTokenStore,
};

fn build_client(server: &MockServer, credentials: SessionCredentials) -> ReqwestTengraClient {
	let config =
		ClientConfig::new(&server.base_url()).expect("Mock server base URL should be valid.");

	ReqwestTengraClient::new(config, Arc::new(MemoryTokenStore::with_credentials(credentials)))
}

#[tokio::test]
async fn stored_access_token_is_sent_as_bearer() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, SessionCredentials::new("access-1", "refresh-1"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/projects").header("authorization", "Bearer access-1");
			then.status(200).json_body(json!([]));
		})
		.await;
	let response = client.get("projects").await.expect("Authorized request should succeed.");

	mock.assert_async().await;

	assert!(response.is_success());
	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn caller_authorization_header_is_kept() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, SessionCredentials::new("access-1", "refresh-1"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/video/download").header("authorization", "Basic ZGVtbzpkZW1v");
			then.status(200).body("ok");
		})
		.await;
	let options = RequestOptions::new(Method::GET)
		.header(AUTHORIZATION, HeaderValue::from_static("Basic ZGVtbzpkZW1v"));
	let response =
		client.request("/video/download", options).await.expect("Request should succeed.");

	mock.assert_async().await;

	assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn absolute_urls_bypass_the_base_origin() {
	let backend = MockServer::start_async().await;
	let cdn = MockServer::start_async().await;
	let client = build_client(&backend, SessionCredentials::access_only("access-1"));
	let mock = cdn
		.mock_async(|when, then| {
			when.method(GET).path("/assets/logo.svg");
			then.status(200).body("<svg/>");
		})
		.await;
	let response = client
		.get(&cdn.url("/assets/logo.svg"))
		.await
		.expect("Absolute URL request should succeed.");

	mock.assert_async().await;

	assert_eq!(response.text(), "<svg/>");
}

#[tokio::test]
async fn post_sends_json_with_content_type() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, SessionCredentials::access_only("access-1"));
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/contact")
				.header("content-type", "application/json")
				.header("authorization", "Bearer access-1")
				.json_body(json!({ "email": "hi@tengra.studio", "message": "Hello" }));
			then.status(201).json_body(json!({ "id": "c-1" }));
		})
		.await;
	let response = client
		.post("/contact", &json!({ "email": "hi@tengra.studio", "message": "Hello" }))
		.await
		.expect("Contact submission should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn delete_and_error_statuses_pass_through() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, SessionCredentials::new("access-1", "refresh-1"));
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/forum/threads/3");
			then.status(403).body("forbidden");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh");
			then.status(200).json_body(json!({ "token": "unused" }));
		})
		.await;
	let response =
		client.delete("/forum/threads/3").await.expect("A 403 is not a transport error.");

	mock.assert_async().await;
	refresh.assert_calls_async(0).await;

	assert_eq!(response.status(), 403);
}
