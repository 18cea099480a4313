//! Session cookie middleware.
//!
//! Inbound: a session whose cookie signature verifies is inserted into the
//! request extensions, where `SessionAuthenticator::verify` looks for it.
//!
//! Outbound: a handler that puts a [`Session`] into the response extensions
//! has it written back as `Set-Cookie` headers. A session without a
//! credential clears the cookies.

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jobber_gateway_core::Session;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(session) = state.sessions.load(request.headers()) {
        request.extensions_mut().insert(session);
    }

    let mut response = next.run(request).await;

    let Some(session) = response.extensions_mut().remove::<Session>() else {
        return response;
    };

    let cookies = if session.credential().is_some() {
        state.sessions.persist(&session)
    } else {
        state.sessions.clear()
    };

    match cookies {
        Ok(values) => {
            for value in values {
                response.headers_mut().append(SET_COOKIE, value);
            }
            response
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
