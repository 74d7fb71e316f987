//! Configuration types for pagination, classification and bulk runs.
//!
//! The classifier thresholds are calibration, not universal truth, so every
//! one of them is a named field that can be overridden (in code or from a
//! JSON file; missing keys fall back to the defaults).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds for the suspicion heuristic. Any one rule triggers suspicion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspicionThresholds {
    /// Usernames longer than this (in characters) are suspicious.
    pub max_username_len: usize,

    /// Usernames with more underscores than this are suspicious.
    pub max_underscores: usize,

    /// Following more than `follow_multiplier` × followers...
    pub follow_multiplier: u64,

    /// ...while having fewer followers than this is suspicious.
    pub follow_rule_max_followers: u64,

    /// Empty bio and zero posts with fewer followers than this is suspicious.
    pub empty_profile_max_followers: u64,

    /// Fewer posts than this...
    pub low_post_max_posts: u64,

    /// ...while following more than this is suspicious.
    pub low_post_min_following: u64,
}

impl Default for SuspicionThresholds {
    fn default() -> Self {
        Self {
            max_username_len: 25,
            max_underscores: 4,
            follow_multiplier: 10,
            follow_rule_max_followers: 50,
            empty_profile_max_followers: 10,
            low_post_max_posts: 3,
            low_post_min_following: 100,
        }
    }
}

/// Thresholds for the engagement-potential heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementThresholds {
    /// Inclusive follower band for organic accounts.
    pub min_followers: u64,
    pub max_followers: u64,

    /// Organic accounts need more posts than this.
    pub min_posts: u64,

    /// Organic accounts must follow fewer than this × their followers.
    pub max_following_multiplier: u64,

    /// Business accounts qualify with more followers than this.
    pub business_min_followers: u64,
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self {
            min_followers: 100,
            max_followers: 50_000,
            min_posts: 5,
            max_following_multiplier: 3,
            business_min_followers: 50,
        }
    }
}

/// Additive lead-score weights. The score is not capped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadWeights {
    /// Inclusive lower bound of the mid follower tier.
    pub mid_tier_min_followers: u64,
    /// Inclusive upper bound of the mid tier, exclusive lower bound of the upper tier.
    pub mid_tier_max_followers: u64,
    /// Inclusive upper bound of the upper tier; above it is the top tier.
    pub upper_tier_max_followers: u64,

    pub mid_tier_points: i64,
    pub upper_tier_points: i64,
    pub top_tier_points: i64,

    pub business_points: i64,
    pub verified_points: i64,
    pub external_url_points: i64,
    pub biography_points: i64,

    /// Awarded when following > 0 and followers / following exceeds `min_follower_ratio`.
    pub follower_ratio_points: i64,
    pub min_follower_ratio: f64,
}

impl Default for LeadWeights {
    fn default() -> Self {
        Self {
            mid_tier_min_followers: 1_000,
            mid_tier_max_followers: 10_000,
            upper_tier_max_followers: 50_000,
            mid_tier_points: 5,
            upper_tier_points: 3,
            top_tier_points: 1,
            business_points: 3,
            verified_points: 2,
            external_url_points: 2,
            biography_points: 1,
            follower_ratio_points: 2,
            min_follower_ratio: 1.0,
        }
    }
}

/// Full classifier calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub suspicion: SuspicionThresholds,
    pub engagement: EngagementThresholds,
    pub lead: LeadWeights,

    /// Non-suspicious actors scoring at least this become lead candidates.
    pub min_lead_score: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            suspicion: SuspicionThresholds::default(),
            engagement: EngagementThresholds::default(),
            lead: LeadWeights::default(),
            min_lead_score: 5,
        }
    }
}

impl ClassifierConfig {
    /// Create a config with default calibration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) JSON calibration.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set the minimum lead score.
    pub fn with_min_lead_score(mut self, score: i64) -> Self {
        self.min_lead_score = score;
        self
    }

    /// Replace the suspicion thresholds.
    pub fn with_suspicion(mut self, suspicion: SuspicionThresholds) -> Self {
        self.suspicion = suspicion;
        self
    }

    /// Replace the engagement thresholds.
    pub fn with_engagement(mut self, engagement: EngagementThresholds) -> Self {
        self.engagement = engagement;
        self
    }

    /// Replace the lead weights.
    pub fn with_lead_weights(mut self, lead: LeadWeights) -> Self {
        self.lead = lead;
        self
    }
}

/// Configuration for driving one target's pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatorConfig {
    /// Minimum delay between successive page fetches, in milliseconds.
    ///
    /// Rate-limit courtesy only; set to 0 for test doubles. Default: 1000.
    pub page_delay_ms: u64,

    /// Upper bound on a single page fetch, in milliseconds. Default: 30000.
    pub page_timeout_ms: u64,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: 1000,
            page_timeout_ms: 30_000,
        }
    }
}

impl PaginatorConfig {
    /// Create a config with default delay and timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inter-page delay.
    pub fn with_page_delay_ms(mut self, ms: u64) -> Self {
        self.page_delay_ms = ms;
        self
    }

    /// Set the per-page timeout.
    pub fn with_page_timeout_ms(mut self, ms: u64) -> Self {
        self.page_timeout_ms = ms;
        self
    }

    /// Disable the inter-page delay.
    pub fn without_delay(self) -> Self {
        self.with_page_delay_ms(0)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

/// Configuration for a bulk run over many targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Maximum targets in flight at once. Default: 4.
    pub concurrency_limit: usize,

    /// Result cap applied to every target (None = unbounded).
    pub per_target_cap: Option<usize>,

    /// Pagination policy shared by all workers
    pub paginator: PaginatorConfig,

    /// Classifier calibration shared by all workers
    pub classifier: ClassifierConfig,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 4,
            per_target_cap: None,
            paginator: PaginatorConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl BulkConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit (clamped to at least one worker).
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    /// Set the per-target result cap.
    pub fn with_per_target_cap(mut self, cap: Option<usize>) -> Self {
        self.per_target_cap = cap;
        self
    }

    /// Set the pagination policy.
    pub fn with_paginator(mut self, paginator: PaginatorConfig) -> Self {
        self.paginator = paginator;
        self
    }

    /// Set the classifier calibration.
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }
}
