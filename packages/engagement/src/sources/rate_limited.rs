//! Rate-limited source wrapper.
//!
//! Wraps any EngagementSource with a request quota using the governor crate.
//! This sits below the paginator's inter-page delay: the delay spaces pages
//! of one target, the quota caps requests across all workers sharing it.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{EngagementError, Result, SourceResult};
use crate::traits::source::{Cursor, EngagementSource, Page};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A source wrapper that enforces a shared request quota.
pub struct RateLimitedSource<S: EngagementSource> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
}

impl<S: EngagementSource> RateLimitedSource<S> {
    /// Allow at most `requests_per_second` fetches per second.
    pub fn new(source: S, requests_per_second: u32) -> Result<Self> {
        Ok(Self::with_quota(source, Quota::per_second(non_zero(
            requests_per_second,
            "requests_per_second",
        )?)))
    }

    /// Sustained rate with a burst allowance.
    pub fn with_burst(source: S, requests_per_second: u32, burst: u32) -> Result<Self> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?)
            .allow_burst(non_zero(burst, "burst")?);
        Ok(Self::with_quota(source, quota))
    }

    /// Create with a custom quota.
    pub fn with_quota(source: S, quota: Quota) -> Self {
        Self {
            inner: source,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn non_zero(value: u32, name: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| EngagementError::Config(format!("{name} must be > 0")))
}

#[async_trait]
impl<S: EngagementSource> EngagementSource for RateLimitedSource<S> {
    async fn fetch_page(&self, target_id: &str, cursor: Option<Cursor>) -> SourceResult<Page> {
        self.limiter.until_ready().await;
        self.inner.fetch_page(target_id, cursor).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
