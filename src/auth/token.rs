//! Token secret wrappers and the persisted session credential pair.

pub mod secret;
pub mod session;
