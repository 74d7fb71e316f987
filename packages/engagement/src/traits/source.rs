//! The engagement source: the upstream capability that lists actors.
//!
//! The pipeline never owns an HTTP client or auth headers. Whatever talks to
//! the upstream is passed in as an `EngagementSource`, so tests, replays and
//! real APIs are interchangeable.
//!
//! # Contract
//!
//! `fetch_page(target_id, cursor)` returns the actors of one page in upstream
//! order and the cursor for the next page (or none when the upstream has no
//! more). Cursors are opaque: callers pass back exactly what they received and
//! never parse or construct them. Retry policy, if any, belongs to the
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SourceResult;
use crate::types::actor::ActorProfile;

/// Opaque pagination continuation token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a token received from the upstream.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for sending back to the upstream.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tokens can be long base64 blobs; keep logs readable.
        let preview: String = self.0.chars().take(12).collect();
        if self.0.chars().count() > 12 {
            write!(f, "Cursor({preview}…)")
        } else {
            write!(f, "Cursor({preview})")
        }
    }
}

/// One page of actors.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Actors in upstream order
    pub actors: Vec<ActorProfile>,

    /// Continuation token, absent when the upstream is done
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// A page with a continuation token.
    pub fn new(actors: Vec<ActorProfile>, next_cursor: Option<Cursor>) -> Self {
        Self {
            actors,
            next_cursor,
        }
    }

    /// A final page (no next cursor).
    pub fn last(actors: Vec<ActorProfile>) -> Self {
        Self::new(actors, None)
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

/// Upstream capability that lists the actors who engaged with a target.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementSource: Send + Sync {
    /// Fetch one page of actors. `cursor` is `None` for the first page.
    async fn fetch_page(&self, target_id: &str, cursor: Option<Cursor>) -> SourceResult<Page>;

    /// Source name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<S: EngagementSource + ?Sized> EngagementSource for std::sync::Arc<S> {
    async fn fetch_page(&self, target_id: &str, cursor: Option<Cursor>) -> SourceResult<Page> {
        (**self).fetch_page(target_id, cursor).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
