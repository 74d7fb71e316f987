//! Engagement source implementations.
//!
//! - `HttpEngagementSource` - JSON-over-HTTP engagement API client
//! - `RateLimitedSource` - wraps any source with a request quota
//!
//! A scripted source for tests lives in [`crate::testing`].

pub mod http;
pub mod rate_limited;

pub use http::{parse_page, HttpEngagementSource};
pub use rate_limited::RateLimitedSource;
