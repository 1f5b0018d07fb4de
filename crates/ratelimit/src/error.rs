use thiserror::Error;

/// Invalid limiter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("rate limit window must be longer than zero")]
    ZeroWindow,

    #[error("rate limit must admit at least one request per window")]
    ZeroCapacity,
}
