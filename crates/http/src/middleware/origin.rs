//! Origin guard: rejects disallowed browser origins before any handler runs.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use blogsmith_authz::{OriginDecision, OriginPolicy};

use crate::error::AppError;

pub async fn enforce_origin(
    State(policy): State<Arc<OriginPolicy>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let decision = match request.headers().get(header::ORIGIN) {
        None => policy.evaluate(None),
        Some(value) => match value.to_str() {
            Ok(origin) => policy.evaluate(Some(origin)),
            Err(_) => OriginDecision::Denied,
        },
    };

    if !decision.is_permitted() {
        return Err(AppError::origin_not_allowed());
    }

    Ok(next.run(request).await)
}
