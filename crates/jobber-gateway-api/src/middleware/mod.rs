//! Middleware layers
//!
//! ## Available Middleware
//!
//! - `session`: loads the signed session cookie and persists session updates
//! - `auth`: session credential verification and the authenticated-route gate

pub mod auth;
pub mod session;

// Re-exports
pub use auth::{attach_identity, check_authentication, verify_user};
pub use session::session_middleware;
