//! Storage contracts and built-in stores for session credentials.

pub mod file;
pub mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

// self
use crate::{_prelude::*, auth::SessionCredentials};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Client-side persistence for the access/refresh token pair.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Loads the stored credentials; missing tokens come back as `None` fields.
	fn load(&self) -> StoreFuture<'_, SessionCredentials>;

	/// Persists or replaces both tokens.
	fn save(&self, credentials: SessionCredentials) -> StoreFuture<'_, ()>;

	/// Deletes both tokens.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
