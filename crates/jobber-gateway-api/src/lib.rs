//! # Jobber Gateway API
//!
//! HTTP edge of the Jobber API gateway. Loads the signed session cookie,
//! verifies the session credential on guarded routes and renders every
//! gateway error as structured JSON.
//!
//! Trust primitives live in `jobber_gateway_core`.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod session_store;
pub mod state;
pub mod telemetry;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use extract::CurrentUser;
pub use router::{authenticated, create_app, create_router_with_routes, create_router_with_state, identified};
pub use state::AppState;
