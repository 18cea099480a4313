//! HTTP request handlers

pub mod fallback;
pub mod health;

pub use fallback::not_found;
pub use health::health;
