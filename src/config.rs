//! Backend origin and endpoint configuration.
//!
//! [`ClientConfig::from_env`] reads `TENGRA_API_URL` and falls back to the local development
//! backend. Paths handed to the client are appended to the base URL verbatim, so a base of
//! `https://api.tengra.studio/v1` plus `/admin/users` targets
//! `https://api.tengra.studio/v1/admin/users`.

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Origin (plus optional path prefix) every relative request path is appended to.
	pub base_url: Url,
	/// Path of the token refresh endpoint, relative to `base_url`.
	pub refresh_path: String,
}
impl ClientConfig {
	/// Environment variable holding the backend base URL.
	pub const BASE_URL_ENV: &'static str = "TENGRA_API_URL";
	/// Base URL used when no override is configured.
	pub const DEFAULT_BASE_URL: &'static str = "http://localhost:5000";
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";

	/// Creates a configuration for the provided base URL.
	pub fn new(base_url: &str) -> Result<Self, ConfigError> {
		let parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
			value: base_url.to_owned(),
			source,
		})?;

		if !matches!(parsed.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { scheme: parsed.scheme().to_owned() });
		}

		Ok(Self { base_url: parsed, refresh_path: Self::DEFAULT_REFRESH_PATH.into() })
	}

	/// Loads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads the configuration through an arbitrary key lookup.
	///
	/// Blank values are treated as unset.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let base = lookup(Self::BASE_URL_ENV)
			.map(|value| value.trim().to_owned())
			.filter(|value| !value.is_empty());

		Self::new(base.as_deref().unwrap_or(Self::DEFAULT_BASE_URL))
	}

	/// Overrides the refresh endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Resolves a request path into an absolute URL.
	///
	/// Absolute `http(s)://` URLs pass through untouched; anything else is appended to the
	/// base URL with exactly one `/` in between.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let target = if is_absolute(path) {
			path.to_owned()
		} else {
			format!(
				"{}/{}",
				self.base_url.as_str().trim_end_matches('/'),
				path.trim_start_matches('/')
			)
		};

		Url::parse(&target)
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.refresh_path)
	}
}

fn is_absolute(path: &str) -> bool {
	let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();

	lower.starts_with("http://") || lower.starts_with("https://")
}
