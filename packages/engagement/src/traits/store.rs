//! Storage trait for actors, target membership and analytics history.
//!
//! Three logical tables back every implementation:
//! - `actors`: one row per actor id, refreshed on every re-extraction
//! - `actor_membership`: one row per (target_id, actor_id), never duplicated
//! - `target_analytics`: one immutable row per target per run (append-only)
//!
//! Persisting one target is atomic; a batch is not.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{actor::ActorProfile, extraction::ExtractionResult, summary::QualitySummary};

/// A (target, actor) membership row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub target_id: String,
    pub actor_id: String,

    /// When the pair was first seen; re-extraction does not move it
    pub extracted_at: DateTime<Utc>,
}

/// A denormalized analytics row for one target in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub run_id: Uuid,
    pub target_id: String,
    pub run_timestamp: DateTime<Utc>,
    pub total_extracted: usize,
    pub verified_count: usize,
    pub business_count: usize,
    pub private_count: usize,
    pub suspicious_count: usize,
    pub avg_follower_count: f64,
    pub lead_candidate_count: usize,

    /// Full summary snapshot as of this run
    pub summary: QualitySummary,
}

impl AnalyticsRecord {
    /// Build the analytics row for a summary.
    pub fn from_summary(
        run_id: Uuid,
        run_timestamp: DateTime<Utc>,
        summary: &QualitySummary,
    ) -> Self {
        Self {
            run_id,
            target_id: summary.target_id.clone(),
            run_timestamp,
            total_extracted: summary.total_extracted,
            verified_count: summary.verified_count,
            business_count: summary.business_count,
            private_count: summary.private_count,
            suspicious_count: summary.suspicious_count,
            avg_follower_count: summary.avg_follower_count,
            lead_candidate_count: summary.lead_candidate_count(),
            summary: summary.clone(),
        }
    }
}

/// What a single `upsert` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Membership rows that did not exist before
    pub new_memberships: usize,

    /// Actor rows inserted or refreshed
    pub actors_written: usize,
}

/// An actor engaging with several of the queried targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceOverlap {
    pub actor_id: String,

    /// Queried targets this actor engaged with, sorted
    pub target_ids: Vec<String>,
}

/// Deduplicating persistence for extraction runs.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Persist one target's extraction atomically.
    ///
    /// Existing (target, actor) pairs are left untouched, actor rows are
    /// refreshed, and one analytics row is appended.
    async fn upsert(
        &self,
        run_id: Uuid,
        result: &ExtractionResult,
        summary: &QualitySummary,
    ) -> StoreResult<UpsertOutcome>;

    /// Most recent summary for a target, optionally only from runs at or after `since`.
    async fn get_summary(
        &self,
        target_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<QualitySummary>>;

    /// Number of distinct actors recorded for a target.
    async fn membership_count(&self, target_id: &str) -> StoreResult<usize>;

    /// Membership rows for a target, ordered by actor id.
    async fn memberships(&self, target_id: &str) -> StoreResult<Vec<MembershipRecord>>;

    /// Latest stored profile for an actor.
    async fn actor(&self, actor_id: &str) -> StoreResult<Option<ActorProfile>>;

    /// All analytics rows for a target, oldest first.
    async fn analytics_history(&self, target_id: &str) -> StoreResult<Vec<AnalyticsRecord>>;

    /// Actors that engaged with at least `min_shared` of `target_ids`.
    ///
    /// Derived on demand from membership rows; nothing is stored.
    async fn audience_overlap(
        &self,
        target_ids: &[String],
        min_shared: usize,
    ) -> StoreResult<Vec<AudienceOverlap>>;
}

/// Group (target, actor) pairs by actor and keep actors seen in at least
/// `min_shared` of `target_ids`. Output is sorted by actor id.
pub fn overlap_from_pairs<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    target_ids: &[String],
    min_shared: usize,
) -> Vec<AudienceOverlap> {
    let wanted: BTreeSet<&str> = target_ids.iter().map(String::as_str).collect();
    let mut by_actor: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for (target_id, actor_id) in pairs {
        if wanted.contains(target_id) {
            by_actor.entry(actor_id).or_default().insert(target_id);
        }
    }

    let min_shared = min_shared.max(1);
    by_actor
        .into_iter()
        .filter(|(_, targets)| targets.len() >= min_shared)
        .map(|(actor_id, targets)| AudienceOverlap {
            actor_id: actor_id.to_string(),
            target_ids: targets.into_iter().map(str::to_string).collect(),
        })
        .collect()
}
