//! Request guards applied in front of the route handlers.

pub mod client_ip;
pub mod cors;
pub mod origin;
pub mod rate_limit;

pub use client_ip::client_key;
pub use cors::cors_layer;
pub use origin::enforce_origin;
pub use rate_limit::{enforce_rate_limit, RateLimitState, RATE_LIMIT_MESSAGE};
