//! Router builder for the blogsmith HTTP server

use std::sync::Arc;
use axum::{extract::Request, http::HeaderValue, middleware, Router};
use blogsmith_authz::OriginPolicy;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::Uuid;

use crate::middleware::{cors_layer, enforce_origin};

/// Builder for constructing the main HTTP router
///
/// Axum layers only wrap routes that already exist, so register routes and
/// modules first and add middleware afterwards. Each `with_*` call wraps
/// everything before it; the last one added sees the request first.
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Merge a module's router at the root of the service
    pub fn merge_module(mut self, module_router: Router) -> Self {
        self.router = self.router.merge(module_router);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware advertising the policy's origins
    pub fn with_cors(mut self, policy: &OriginPolicy) -> Self {
        self.router = self.router.layer(cors_layer(policy));
        self
    }

    /// Reject requests whose origin the policy denies
    ///
    /// Must be added after [`RouterBuilder::with_cors`] so that preflight
    /// requests from denied origins are rejected instead of answered.
    pub fn with_origin_guard(mut self, policy: Arc<OriginPolicy>) -> Self {
        self.router = self
            .router
            .layer(middleware::from_fn_with_state(policy, enforce_origin));
        self
    }

    /// Add request ID middleware, echoing the ID on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-ordered request IDs (UUID v7)
#[derive(Clone, Copy)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::now_v7().to_string().parse::<HeaderValue>().ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    fn policy() -> Arc<OriginPolicy> {
        Arc::new(OriginPolicy::new(["http://localhost:3000"], true))
    }

    fn guarded_router() -> Router {
        let policy = policy();
        RouterBuilder::new()
            .route("/ping", get(|| async { "pong" }))
            .with_cors(&policy)
            .with_origin_guard(policy)
            .with_request_id()
            .build()
    }

    #[tokio::test]
    async fn test_allowed_origin_gets_cors_headers() {
        let response = guarded_router()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_forbidden_without_cors_headers() {
        let response = guarded_router()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(header::ORIGIN, "https://evil.example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_preflight_from_disallowed_origin_is_rejected() {
        let response = guarded_router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/ping")
                    .header(header::ORIGIN, "https://evil.example.org")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let response = guarded_router()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }
}
