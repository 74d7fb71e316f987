//! Actor profiles: snapshots of users who performed the engagement action.

use serde::{Deserialize, Serialize};

/// A snapshot of an engaging user at extraction time.
///
/// The identity key is `id`. Usernames change and must never be used to
/// deduplicate or join actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    /// Stable upstream id (unique per actor)
    pub id: String,

    /// Current handle
    pub username: String,

    /// Display name, if the upstream exposed one
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub follower_count: u64,

    #[serde(default)]
    pub following_count: u64,

    #[serde(default)]
    pub post_count: u64,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default)]
    pub is_business: bool,

    #[serde(default)]
    pub is_private: bool,

    /// Profile biography (empty string when absent)
    #[serde(default)]
    pub biography: String,

    /// Link shown on the profile
    #[serde(default)]
    pub external_url: Option<String>,
}

impl ActorProfile {
    /// Create a profile with zero counts and no flags set.
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            full_name: None,
            follower_count: 0,
            following_count: 0,
            post_count: 0,
            is_verified: false,
            is_business: false,
            is_private: false,
            biography: String::new(),
            external_url: None,
        }
    }

    /// Set follower and following counts.
    pub fn with_counts(mut self, followers: u64, following: u64) -> Self {
        self.follower_count = followers;
        self.following_count = following;
        self
    }

    /// Set the post count.
    pub fn with_posts(mut self, posts: u64) -> Self {
        self.post_count = posts;
        self
    }

    /// Mark as verified.
    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }

    /// Mark as a business account.
    pub fn business(mut self) -> Self {
        self.is_business = true;
        self
    }

    /// Mark as private.
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Set the biography.
    pub fn with_biography(mut self, bio: impl Into<String>) -> Self {
        self.biography = bio.into();
        self
    }

    /// Set the external URL.
    pub fn with_external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = Some(url.into());
        self
    }

    /// Set the display name.
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Whether the biography has any visible text.
    pub fn has_biography(&self) -> bool {
        !self.biography.trim().is_empty()
    }

    /// Whether the profile links out somewhere.
    pub fn has_external_url(&self) -> bool {
        self.external_url
            .as_deref()
            .is_some_and(|u| !u.trim().is_empty())
    }
}
