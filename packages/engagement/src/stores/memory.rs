//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{
    overlap_from_pairs, AnalyticsRecord, AudienceOverlap, EngagementStore, MembershipRecord,
    UpsertOutcome,
};
use crate::types::{actor::ActorProfile, extraction::ExtractionResult, summary::QualitySummary};

#[derive(Default)]
struct Tables {
    actors: HashMap<String, ActorProfile>,
    /// target_id -> actor_id -> first seen
    membership: HashMap<String, BTreeMap<String, DateTime<Utc>>>,
    analytics: Vec<AnalyticsRecord>,
}

/// In-memory storage for actors, membership and analytics.
///
/// All three tables sit behind one lock, so an upsert is atomic with respect
/// to readers. Data is lost on restart.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    /// Number of distinct actors stored across all targets.
    pub fn actor_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.actors.len())
    }

    /// Number of analytics rows across all targets.
    pub fn analytics_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.analytics.len())
    }

    /// Clear all stored data.
    pub fn clear(&self) -> StoreResult<()> {
        *self.write()? = Tables::default();
        Ok(())
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn upsert(
        &self,
        run_id: Uuid,
        result: &ExtractionResult,
        summary: &QualitySummary,
    ) -> StoreResult<UpsertOutcome> {
        if summary.target_id != result.target_id {
            return Err(StoreError::Rejected {
                target_id: result.target_id.clone(),
                reason: format!("summary belongs to {}", summary.target_id),
            });
        }

        let mut tables = self.write()?;
        let mut outcome = UpsertOutcome::default();

        for actor in result.actors() {
            tables.actors.insert(actor.id.clone(), actor.clone());
            outcome.actors_written += 1;

            let members = tables
                .membership
                .entry(result.target_id.clone())
                .or_default();
            if !members.contains_key(&actor.id) {
                members.insert(actor.id.clone(), result.extracted_at);
                outcome.new_memberships += 1;
            }
        }

        tables.analytics.push(AnalyticsRecord::from_summary(
            run_id,
            result.extracted_at,
            summary,
        ));

        Ok(outcome)
    }

    async fn get_summary(
        &self,
        target_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<QualitySummary>> {
        let tables = self.read()?;
        // Latest by run timestamp; on a tie the later append wins.
        Ok(tables
            .analytics
            .iter()
            .filter(|row| row.target_id == target_id)
            .filter(|row| since.map_or(true, |since| row.run_timestamp >= since))
            .max_by_key(|row| row.run_timestamp)
            .map(|row| row.summary.clone()))
    }

    async fn membership_count(&self, target_id: &str) -> StoreResult<usize> {
        Ok(self
            .read()?
            .membership
            .get(target_id)
            .map_or(0, BTreeMap::len))
    }

    async fn memberships(&self, target_id: &str) -> StoreResult<Vec<MembershipRecord>> {
        let tables = self.read()?;
        Ok(tables
            .membership
            .get(target_id)
            .map(|members| {
                members
                    .iter()
                    .map(|(actor_id, extracted_at)| MembershipRecord {
                        target_id: target_id.to_string(),
                        actor_id: actor_id.clone(),
                        extracted_at: *extracted_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn actor(&self, actor_id: &str) -> StoreResult<Option<ActorProfile>> {
        Ok(self.read()?.actors.get(actor_id).cloned())
    }

    async fn analytics_history(&self, target_id: &str) -> StoreResult<Vec<AnalyticsRecord>> {
        let mut rows: Vec<AnalyticsRecord> = self
            .read()?
            .analytics
            .iter()
            .filter(|row| row.target_id == target_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.run_timestamp);
        Ok(rows)
    }

    async fn audience_overlap(
        &self,
        target_ids: &[String],
        min_shared: usize,
    ) -> StoreResult<Vec<AudienceOverlap>> {
        let tables = self.read()?;
        let pairs = tables.membership.iter().flat_map(|(target_id, members)| {
            members
                .keys()
                .map(move |actor_id| (target_id.as_str(), actor_id.as_str()))
        });
        Ok(overlap_from_pairs(pairs, target_ids, min_shared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::summarize;
    use crate::types::config::ClassifierConfig;
    use chrono::Duration;

    fn result(target: &str, ids: &[&str]) -> ExtractionResult {
        let actors = ids
            .iter()
            .map(|id| ActorProfile::new(*id, format!("user_{id}")).with_counts(500, 100))
            .collect();
        ExtractionResult::complete(target, actors)
    }

    async fn persist(store: &MemoryStore, result: &ExtractionResult) -> UpsertOutcome {
        let summary = summarize(result, &ClassifierConfig::default());
        store.upsert(Uuid::new_v4(), result, &summary).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_on_membership() {
        let store = MemoryStore::new();
        let first = result("post-1", &["a", "b", "c"]);

        let outcome = persist(&store, &first).await;
        assert_eq!(outcome.new_memberships, 3);

        let outcome = persist(&store, &first).await;
        assert_eq!(outcome.new_memberships, 0);
        assert_eq!(outcome.actors_written, 3);

        assert_eq!(store.membership_count("post-1").await.unwrap(), 3);
        assert_eq!(store.analytics_history("post-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reextraction_refreshes_actor_but_keeps_first_seen() {
        let store = MemoryStore::new();
        let first = result("post-1", &["a"]);
        let first_seen = first.extracted_at;
        persist(&store, &first).await;

        let refreshed = ExtractionResult::complete(
            "post-1",
            vec![ActorProfile::new("a", "renamed").with_counts(900, 100)],
        )
        .with_extracted_at(first_seen + Duration::hours(1));
        persist(&store, &refreshed).await;

        let actor = store.actor("a").await.unwrap().unwrap();
        assert_eq!(actor.username, "renamed");
        assert_eq!(actor.follower_count, 900);

        let members = store.memberships("post-1").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].extracted_at, first_seen);
    }

    #[tokio::test]
    async fn test_get_summary_returns_latest_since() {
        let store = MemoryStore::new();
        let base = Utc::now();

        let old = result("post-1", &["a"]).with_extracted_at(base - Duration::days(2));
        persist(&store, &old).await;
        let new = result("post-1", &["a", "b"]).with_extracted_at(base);
        persist(&store, &new).await;

        let latest = store.get_summary("post-1", None).await.unwrap().unwrap();
        assert_eq!(latest.total_extracted, 2);

        let none = store
            .get_summary("post-1", Some(base + Duration::seconds(1)))
            .await
            .unwrap();
        assert!(none.is_none());

        assert!(store.get_summary("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_is_by_run_timestamp_not_insert_order() {
        let store = MemoryStore::new();
        let base = Utc::now();

        let newer = result("post-1", &["a", "b"]).with_extracted_at(base);
        persist(&store, &newer).await;
        let backfill = result("post-1", &["a"]).with_extracted_at(base - Duration::days(2));
        persist(&store, &backfill).await;

        let latest = store.get_summary("post-1", None).await.unwrap().unwrap();
        assert_eq!(latest.total_extracted, 2);

        let history = store.analytics_history("post-1").await.unwrap();
        assert_eq!(history[0].total_extracted, 1);
        assert_eq!(history[1].total_extracted, 2);
    }

    #[tokio::test]
    async fn test_audience_overlap() {
        let store = MemoryStore::new();
        persist(&store, &result("post-1", &["a", "b"])).await;
        persist(&store, &result("post-2", &["b", "c"])).await;

        let overlap = store
            .audience_overlap(&["post-1".to_string(), "post-2".to_string()], 2)
            .await
            .unwrap();
        assert_eq!(overlap.len(), 1);
        assert_eq!(overlap[0].actor_id, "b");
    }

    #[tokio::test]
    async fn test_mismatched_summary_is_rejected() {
        let store = MemoryStore::new();
        let extraction = result("post-1", &["a"]);
        let summary = QualitySummary::empty("post-2");

        let err = store
            .upsert(Uuid::new_v4(), &extraction, &summary)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.actor_count().unwrap(), 0);
    }
}
