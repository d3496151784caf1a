//! Lists admin users against a live backend, renewing the stored session when it has expired.
//!
//! 1. Point `TENGRA_API_URL` at the backend (defaults to `http://localhost:5000`).
//! 2. Point `TENGRA_SESSION_FILE` at a JSON file holding
//!    `{ "authToken": ..., "refreshToken": ... }`.
//! 3. Run with `RUST_LOG=tengra_client=debug` and the `tracing` feature to watch refresh spans.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use tengra_client::{client::ReqwestTengraClient, store::FileTokenStore};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let session_file =
		env::var("TENGRA_SESSION_FILE").unwrap_or_else(|_| ".tengra/session.json".into());
	let store = Arc::new(FileTokenStore::open(session_file)?);
	let client = ReqwestTengraClient::from_env(store)?;
	let mut failures = client.auth_failures();

	tokio::spawn(async move {
		while let Ok(failure) = failures.recv().await {
			eprintln!("Session expired ({}); please sign in again.", failure.message);
		}
	});

	if let Some(claims) = client.session_claims().await? {
		println!("Signed in as {:?} with role {:?}.", claims.sub, claims.role);
	}

	let response = client.get("/admin/users").await?;

	println!("GET /admin/users -> {}", response.status());
	println!("{}", response.text());

	Ok(())
}
