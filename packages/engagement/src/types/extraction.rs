//! Extraction results: the actors gathered for one target in one run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::actor::ActorProfile;

/// How an extraction ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Upstream signalled completion (empty page or no next cursor)
    Complete,

    /// The result cap was hit before upstream signalled completion
    Truncated,

    /// A page fetch failed; actors gathered before the failure are kept
    Incomplete {
        error: String,
        status: Option<u16>,
        malformed: bool,
    },

    /// The stop signal was observed between pages
    Cancelled,
}

/// Ordered actors extracted for one target.
///
/// `total_extracted` is derived from the actor sequence, so it can never
/// disagree with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Target the actors engaged with
    pub target_id: String,

    /// When the extraction started
    pub extracted_at: DateTime<Utc>,

    /// How the extraction ended
    pub status: ExtractionStatus,

    /// Number of successful page fetches
    pub pages_fetched: usize,

    /// Actors in upstream return order (not guaranteed chronological)
    actors: Vec<ActorProfile>,
}

impl ExtractionResult {
    /// Create a result from an ordered actor sequence.
    pub fn new(
        target_id: impl Into<String>,
        actors: Vec<ActorProfile>,
        status: ExtractionStatus,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            extracted_at: Utc::now(),
            status,
            pages_fetched: 0,
            actors,
        }
    }

    /// A complete result (convenience for tests and replays).
    pub fn complete(target_id: impl Into<String>, actors: Vec<ActorProfile>) -> Self {
        Self::new(target_id, actors, ExtractionStatus::Complete)
    }

    /// Set the extraction timestamp.
    pub fn with_extracted_at(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_at = at;
        self
    }

    /// Set the number of pages fetched.
    pub fn with_pages_fetched(mut self, pages: usize) -> Self {
        self.pages_fetched = pages;
        self
    }

    /// Actors in upstream order.
    pub fn actors(&self) -> &[ActorProfile] {
        &self.actors
    }

    /// Consume the result, yielding its actors.
    pub fn into_actors(self) -> Vec<ActorProfile> {
        self.actors
    }

    /// Number of actors extracted; always equals `actors().len()`.
    pub fn total_extracted(&self) -> usize {
        self.actors.len()
    }

    /// Whether a result cap stopped the extraction early.
    pub fn truncated(&self) -> bool {
        matches!(self.status, ExtractionStatus::Truncated)
    }

    /// Whether the extraction ended the way the upstream contract allows
    /// (complete or deliberately truncated).
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ExtractionStatus::Complete | ExtractionStatus::Truncated
        )
    }
}
