//! Session credentials, the opaque user profile, and redacting token wrappers.

pub mod profile;
pub mod secret;
pub mod session;

pub use profile::*;
pub use secret::*;
pub use session::*;
