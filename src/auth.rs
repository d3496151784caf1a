//! Session credentials, token secrets, claim inspection, and the auth-failure signal.

pub mod claims;
pub mod signal;
pub mod token;

pub use claims::*;
pub use signal::*;
pub use token::{secret::*, session::*};
