//! Thread-safe in-memory [`TokenStore`] for tests and short-lived tools.

// self
use crate::{
	_prelude::*,
	auth::SessionCredentials,
	store::{StoreFuture, TokenStore},
};

/// Keeps credentials in-process; everything is lost when the store is dropped.
#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore(Arc<RwLock<SessionCredentials>>);
impl MemoryTokenStore {
	/// Creates a store pre-seeded with `credentials`.
	pub fn with_credentials(credentials: SessionCredentials) -> Self {
		Self(Arc::new(RwLock::new(credentials)))
	}

	/// Returns a copy of the stored credentials without going through the async API.
	pub fn snapshot(&self) -> SessionCredentials {
		self.0.read().clone()
	}
}
impl TokenStore for MemoryTokenStore {
	fn load(&self) -> StoreFuture<'_, SessionCredentials> {
		let inner = self.0.clone();

		Box::pin(async move { Ok(inner.read().clone()) })
	}

	fn save(&self, credentials: SessionCredentials) -> StoreFuture<'_, ()> {
		let inner = self.0.clone();

		Box::pin(async move {
			*inner.write() = credentials;

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let inner = self.0.clone();

		Box::pin(async move {
			*inner.write() = SessionCredentials::default();

			Ok(())
		})
	}
}
