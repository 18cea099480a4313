//! Route configuration

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use jobber_gateway_core::GatewayError;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::handlers;
use crate::middleware::{attach_identity, check_authentication, session_middleware, verify_user};
use crate::state::AppState;

/// Create the gateway router with state.
///
/// ## Routes
/// - GET /gateway-health - Liveness probe
/// - anything else - 404 JSON
pub fn create_router_with_state(state: AppState) -> Router {
    create_router_with_routes(state, Router::new())
}

/// Create the gateway router with extra route groups merged in.
///
/// Every route, the fallback included, runs behind the session cookie
/// middleware and gets the security response headers. Use [`authenticated`]
/// and [`identified`] to guard groups.
pub fn create_router_with_routes(state: AppState, routes: Router<AppState>) -> Router {
    let router = Router::new()
        .route("/gateway-health", get(handlers::health))
        .merge(routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .with_state(state);

    with_security_headers(router)
}

/// Browser hardening headers, set unless a handler already chose a value.
fn security_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(
                "default-src 'self';base-uri 'self';font-src 'self' https: data:;\
                 form-action 'self';frame-ancestors 'self';img-src 'self' data:;\
                 object-src 'none';script-src 'self';script-src-attr 'none';\
                 style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
            ),
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("origin-agent-cluster"),
            HeaderValue::from_static("?1"),
        ),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("x-download-options"),
            HeaderValue::from_static("noopen"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN")),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
        (header::X_XSS_PROTECTION, HeaderValue::from_static("0")),
    ]
}

fn with_security_headers(router: Router) -> Router {
    security_headers()
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(name, value))
        })
}

/// Guard a route group: 401 without a valid session credential, 400 when
/// no identity reaches the handler.
pub fn authenticated(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    // Outermost layer runs first.
    routes
        .layer(middleware::from_fn(check_authentication))
        .layer(middleware::from_fn_with_state(state.clone(), verify_user))
}

/// Attach the caller's identity when there is one, never reject.
pub fn identified(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes.layer(middleware::from_fn_with_state(state.clone(), attach_identity))
}

/// Full application: router plus tracing, CORS, compression and body limit.
pub fn create_app(state: AppState, config: &GatewayConfig) -> Result<Router, GatewayError> {
    Ok(create_router_with_state(state)
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(CompressionLayer::new())
        .layer(cors_layer(config)?)
        .layer(TraceLayer::new_for_http()))
}

fn cors_layer(config: &GatewayConfig) -> Result<CorsLayer, GatewayError> {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let origin = config.client_url.trim();
    if origin.is_empty() {
        return Ok(cors);
    }

    let origin = HeaderValue::from_str(origin)
        .map_err(|e| GatewayError::Configuration(format!("invalid CLIENT_URL: {}", e)))?;
    Ok(cors.allow_origin(origin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Extension, Json};
    use http_body_util::BodyExt;
    use jobber_gateway_core::{
        ErrorResponse, ExpiryPolicy, ServiceClients, Session, SessionAuthenticator, SessionSecret,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt; // For `oneshot`

    use crate::extract::CurrentUser;
    use crate::session_store::SessionStore;

    const SESSION_SECRET: &str = "user-session-secret";

    fn test_state() -> AppState {
        let secret = SessionSecret::new(SESSION_SECRET).unwrap();
        AppState::new(
            SessionAuthenticator::new(&secret, ExpiryPolicy::default()),
            SessionStore::new(["key-one", "key-two"]).unwrap(),
            ServiceClients::default(),
        )
    }

    fn session_token(secret: &str) -> String {
        encode(
            &Header::default(),
            &json!({ "id": "42", "username": "buyer", "email": "buyer@jobber.example" }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    /// Request `Cookie` header value carrying `jwt`, signed with `keys`.
    fn session_cookie(keys: &[&str], jwt: &str) -> String {
        SessionStore::new(keys.iter().copied())
            .unwrap()
            .persist(&Session::with_jwt(jwt))
            .unwrap()
            .iter()
            .map(|value| value.to_str().unwrap().split(';').next().unwrap().to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    async fn me(CurrentUser(user): CurrentUser) -> Json<Value> {
        Json(json!({ "id": user.id.clone(), "username": user.username() }))
    }

    async fn greeting(request: axum::extract::Request) -> String {
        match SessionAuthenticator::require_authenticated(request.extensions()) {
            Ok(user) => format!("hello {}", user.user_id()),
            Err(_) => "hello guest".to_string(),
        }
    }

    async fn login() -> impl IntoResponse {
        (Extension(Session::with_jwt("signed.session.jwt")), StatusCode::OK)
    }

    async fn logout() -> impl IntoResponse {
        (Extension(Session::default()), StatusCode::OK)
    }

    fn test_app() -> Router {
        let state = test_state();
        let protected = authenticated(
            Router::new().route("/api/gateway/v1/auth/currentuser", get(me)),
            &state,
        );
        let personalised = identified(
            Router::new()
                .route("/api/gateway/v1/auth/search", get(greeting))
                .route("/api/gateway/v1/auth/profile", get(me)),
            &state,
        );
        let session = Router::new()
            .route("/api/gateway/v1/auth/signin", post(login))
            .route("/api/gateway/v1/auth/signout", post(logout));

        create_router_with_routes(state, protected.merge(personalised).merge(session))
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn error_body(response: axum::response::Response) -> ErrorResponse {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = test_app()
            .oneshot(get_request("/gateway-health", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_bytes(response).await,
            b"API Gateway service is healthy and OK."
        );
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = test_app()
            .oneshot(get_request("/notfound", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["message"], "The endpoint called does not exist");
    }

    #[tokio::test]
    async fn test_protected_route_with_valid_session() {
        let cookie = session_cookie(&["key-one"], &session_token(SESSION_SECRET));
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/currentuser", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["id"], "42");
        assert_eq!(body["username"], "buyer");
    }

    #[tokio::test]
    async fn test_protected_route_without_session() {
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/currentuser", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = error_body(response).await;
        assert_eq!(body.message, "Token is not available. Please login again.");
        assert_eq!(body.status_code, 401);
        assert_eq!(body.status, "error");
        assert_eq!(body.coming_from, "GatewayService SessionAuthenticator verify()");
    }

    #[tokio::test]
    async fn test_protected_route_with_foreign_token() {
        let cookie = session_cookie(&["key-one"], &session_token("inter-service-secret"));
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/currentuser", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_body(response).await.message,
            "Invalid token. Please login again."
        );
    }

    #[tokio::test]
    async fn test_tampered_cookie_signature() {
        let cookie = session_cookie(&["attacker-key"], &session_token(SESSION_SECRET));
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/currentuser", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_body(response).await.message,
            "Token is not available. Please login again."
        );
    }

    #[tokio::test]
    async fn test_cookie_signed_with_rotated_key() {
        let cookie = session_cookie(&["key-two"], &session_token(SESSION_SECRET));
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/currentuser", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_identified_route_allows_guests() {
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/search", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"hello guest");

        let cookie = session_cookie(&["key-one"], &session_token(SESSION_SECRET));
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/search", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, b"hello 42");
    }

    #[tokio::test]
    async fn test_current_user_without_identity_is_bad_request() {
        let response = test_app()
            .oneshot(get_request("/api/gateway/v1/auth/profile", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body.message, "Token is required for this route.");
        assert_eq!(
            body.coming_from,
            "GatewayService SessionAuthenticator require_authenticated()"
        );
    }

    #[tokio::test]
    async fn test_handler_session_is_persisted() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/gateway/v1/auth/signin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("session="));
        assert!(cookies[1].starts_with("session.sig="));
        assert!(cookies.iter().all(|cookie| cookie.contains("Secure")));
    }

    #[tokio::test]
    async fn test_empty_session_clears_cookies() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/gateway/v1/auth/signout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let cookies: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|cookie| cookie.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        for (uri, cookie) in [
            ("/gateway-health", None),
            ("/notfound", None),
            ("/api/gateway/v1/auth/currentuser", None),
        ] {
            let response = test_app().oneshot(get_request(uri, cookie)).await.unwrap();
            let headers = response.headers();

            assert_eq!(headers["x-content-type-options"], "nosniff");
            assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
            assert_eq!(
                headers["strict-transport-security"],
                "max-age=15552000; includeSubDomains"
            );
            assert_eq!(headers["referrer-policy"], "no-referrer");
            assert_eq!(headers["x-xss-protection"], "0");
            assert!(headers["content-security-policy"]
                .to_str()
                .unwrap()
                .starts_with("default-src 'self'"));
        }
    }

    #[tokio::test]
    async fn test_handler_header_not_overridden() {
        async fn framed() -> impl IntoResponse {
            ([(header::X_FRAME_OPTIONS, "DENY")], "framed")
        }

        let app = create_router_with_routes(test_state(), Router::new().route("/framed", get(framed)));
        let response = app.oneshot(get_request("/framed", None)).await.unwrap();

        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_unguarded_route_sets_no_cookie() {
        let response = test_app()
            .oneshot(get_request("/gateway-health", None))
            .await
            .unwrap();

        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
