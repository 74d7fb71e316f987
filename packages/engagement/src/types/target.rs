//! Targets: the content items or accounts whose engagers are extracted.

use serde::{Deserialize, Serialize};

/// A content item or account being analyzed.
///
/// Immutable once constructed; the display metadata is informational only and
/// never influences pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Upstream identifier (media id, account id...)
    pub id: String,

    /// Owner of the content item, if known
    pub owner: Option<String>,

    /// Engagement count reported by the upstream before extraction
    pub engagement_hint: Option<u64>,
}

impl Target {
    /// Create a target with no display metadata.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: None,
            engagement_hint: None,
        }
    }

    /// Set the owner.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Set the engagement-count hint.
    pub fn with_engagement_hint(mut self, hint: u64) -> Self {
        self.engagement_hint = Some(hint);
        self
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
