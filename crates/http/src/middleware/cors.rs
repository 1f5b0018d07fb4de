//! CORS middleware configuration.

use axum::http::{header, HeaderValue, Method};
use blogsmith_authz::OriginPolicy;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Create the CORS layer advertising exactly the allowed origins.
///
/// Origins that fail to parse as header values are skipped with a warning.
pub fn cors_layer(policy: &OriginPolicy) -> CorsLayer {
    let origins: Vec<HeaderValue> = policy
        .origins()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
