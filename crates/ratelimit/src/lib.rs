//! Fixed-window rate limiting keyed by client identity.
//!
//! Each key gets its own window, opened by the first request counted
//! against it. Within a window at most `max_requests` are admitted; the
//! window closes `window` after it opened and the next request starts a
//! fresh one.

mod clock;
mod error;
mod limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RateLimitError;
pub use limiter::{FixedWindowLimiter, RateDecision};
