//! SQLite storage implementation.
//!
//! A file-based storage backend using SQLite. Good for:
//! - Local development
//! - Single-server deployments
//! - Testing with persistent data
//!
//! Writes are serialized through one async lock so concurrent workers never
//! race on the membership uniqueness check; readers go straight to the pool.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{
    overlap_from_pairs, AnalyticsRecord, AudienceOverlap, EngagementStore, MembershipRecord,
    UpsertOutcome,
};
use crate::types::{actor::ActorProfile, extraction::ExtractionResult, summary::QualitySummary};

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(e))
}

/// Fixed-width UTC timestamps so lexical order matches time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(target_id: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow {
            target_id: target_id.to_string(),
            reason: format!("invalid timestamp {raw:?}: {e}"),
        })
}

/// Counts are u64 in memory but SQLite INTEGER is i64.
fn count_to_db(target_id: &str, actor_id: &str, field: &str, value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Rejected {
        target_id: target_id.to_string(),
        reason: format!("actor {actor_id} {field} {value} does not fit an SQLite integer"),
    })
}

fn count_from_db(actor_id: &str, field: &str, value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::CorruptRow {
        target_id: String::new(),
        reason: format!("actor {actor_id} has negative {field} ({value})"),
    })
}

/// SQLite-based engagement store.
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite database.
    ///
    /// # Example URLs
    /// - `sqlite://./engagement.db` - File-based database
    /// - `sqlite::memory:` - use [`SqliteStore::in_memory`] instead
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(backend)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(backend)?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Every connection to `:memory:` is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(backend)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(backend)?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and make sure the schema exists.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actors (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                full_name TEXT,
                follower_count INTEGER NOT NULL DEFAULT 0,
                following_count INTEGER NOT NULL DEFAULT 0,
                post_count INTEGER NOT NULL DEFAULT 0,
                is_verified INTEGER NOT NULL DEFAULT 0,
                is_business INTEGER NOT NULL DEFAULT 0,
                is_private INTEGER NOT NULL DEFAULT 0,
                biography TEXT NOT NULL DEFAULT '',
                external_url TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actor_membership (
                target_id TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                extracted_at TEXT NOT NULL,
                PRIMARY KEY (target_id, actor_id)
            );

            CREATE INDEX IF NOT EXISTS idx_membership_actor ON actor_membership(actor_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS target_analytics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                run_timestamp TEXT NOT NULL,
                total_extracted INTEGER NOT NULL,
                verified_count INTEGER NOT NULL,
                business_count INTEGER NOT NULL,
                private_count INTEGER NOT NULL,
                suspicious_count INTEGER NOT NULL,
                avg_follower_count REAL NOT NULL,
                lead_candidate_count INTEGER NOT NULL,
                summary TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_analytics_target ON target_analytics(target_id, run_timestamp);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// Row types for sqlx queries
#[derive(Debug, FromRow)]
struct ActorRow {
    id: String,
    username: String,
    full_name: Option<String>,
    follower_count: i64,
    following_count: i64,
    post_count: i64,
    is_verified: bool,
    is_business: bool,
    is_private: bool,
    biography: String,
    external_url: Option<String>,
}

impl ActorRow {
    fn into_profile(self) -> StoreResult<ActorProfile> {
        Ok(ActorProfile {
            follower_count: count_from_db(&self.id, "follower_count", self.follower_count)?,
            following_count: count_from_db(&self.id, "following_count", self.following_count)?,
            post_count: count_from_db(&self.id, "post_count", self.post_count)?,
            id: self.id,
            username: self.username,
            full_name: self.full_name,
            is_verified: self.is_verified,
            is_business: self.is_business,
            is_private: self.is_private,
            biography: self.biography,
            external_url: self.external_url,
        })
    }
}

#[derive(Debug, FromRow)]
struct AnalyticsRow {
    run_id: String,
    target_id: String,
    run_timestamp: String,
    total_extracted: i64,
    verified_count: i64,
    business_count: i64,
    private_count: i64,
    suspicious_count: i64,
    avg_follower_count: f64,
    lead_candidate_count: i64,
    summary: String,
}

impl AnalyticsRow {
    fn into_record(self) -> StoreResult<AnalyticsRecord> {
        let corrupt = |reason: String| StoreError::CorruptRow {
            target_id: self.target_id.clone(),
            reason,
        };

        let run_id = Uuid::parse_str(&self.run_id)
            .map_err(|e| corrupt(format!("invalid run id: {e}")))?;
        let summary: QualitySummary = serde_json::from_str(&self.summary)
            .map_err(|e| corrupt(format!("invalid summary JSON: {e}")))?;
        let run_timestamp = parse_timestamp(&self.target_id, &self.run_timestamp)?;

        Ok(AnalyticsRecord {
            run_id,
            run_timestamp,
            total_extracted: self.total_extracted as usize,
            verified_count: self.verified_count as usize,
            business_count: self.business_count as usize,
            private_count: self.private_count as usize,
            suspicious_count: self.suspicious_count as usize,
            avg_follower_count: self.avg_follower_count,
            lead_candidate_count: self.lead_candidate_count as usize,
            summary,
            target_id: self.target_id,
        })
    }
}

const ANALYTICS_COLUMNS: &str = "run_id, target_id, run_timestamp, total_extracted, verified_count, \
     business_count, private_count, suspicious_count, avg_follower_count, lead_candidate_count, summary";

#[async_trait]
impl EngagementStore for SqliteStore {
    #[instrument(skip(self, result, summary), fields(target_id = %result.target_id, actors = result.total_extracted()))]
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

        let summary_json = serde_json::to_string(summary).map_err(|e| StoreError::Rejected {
            target_id: result.target_id.clone(),
            reason: format!("summary not serializable: {e}"),
        })?;
        let extracted_at = timestamp(&result.extracted_at);

        // Checked up front so an oversized count rejects the whole target.
        let counts = result
            .actors()
            .iter()
            .map(|actor| -> StoreResult<[i64; 3]> {
                let count = |field: &str, value: u64| {
                    count_to_db(&result.target_id, &actor.id, field, value)
                };
                Ok([
                    count("follower_count", actor.follower_count)?,
                    count("following_count", actor.following_count)?,
                    count("post_count", actor.post_count)?,
                ])
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut outcome = UpsertOutcome::default();

        for (actor, [followers, following, posts]) in result.actors().iter().zip(counts) {
            sqlx::query(
                r#"
                INSERT INTO actors (id, username, full_name, follower_count, following_count,
                    post_count, is_verified, is_business, is_private, biography, external_url, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    username = excluded.username,
                    full_name = excluded.full_name,
                    follower_count = excluded.follower_count,
                    following_count = excluded.following_count,
                    post_count = excluded.post_count,
                    is_verified = excluded.is_verified,
                    is_business = excluded.is_business,
                    is_private = excluded.is_private,
                    biography = excluded.biography,
                    external_url = excluded.external_url,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&actor.id)
            .bind(&actor.username)
            .bind(&actor.full_name)
            .bind(followers)
            .bind(following)
            .bind(posts)
            .bind(actor.is_verified)
            .bind(actor.is_business)
            .bind(actor.is_private)
            .bind(&actor.biography)
            .bind(&actor.external_url)
            .bind(&extracted_at)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
            outcome.actors_written += 1;

            let inserted = sqlx::query(
                r#"
                INSERT INTO actor_membership (target_id, actor_id, extracted_at)
                VALUES (?, ?, ?)
                ON CONFLICT(target_id, actor_id) DO NOTHING
                "#,
            )
            .bind(&result.target_id)
            .bind(&actor.id)
            .bind(&extracted_at)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
            outcome.new_memberships += inserted.rows_affected() as usize;
        }

        let record = AnalyticsRecord::from_summary(run_id, result.extracted_at, summary);
        sqlx::query(&format!(
            "INSERT INTO target_analytics ({ANALYTICS_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(record.run_id.to_string())
        .bind(&record.target_id)
        .bind(&extracted_at)
        .bind(record.total_extracted as i64)
        .bind(record.verified_count as i64)
        .bind(record.business_count as i64)
        .bind(record.private_count as i64)
        .bind(record.suspicious_count as i64)
        .bind(record.avg_follower_count)
        .bind(record.lead_candidate_count as i64)
        .bind(&summary_json)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        debug!(
            new_memberships = outcome.new_memberships,
            actors_written = outcome.actors_written,
            "Persisted extraction"
        );
        Ok(outcome)
    }

    async fn get_summary(
        &self,
        target_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<QualitySummary>> {
        let since = since.map(|at| timestamp(&at)).unwrap_or_default();
        let row = sqlx::query_as::<_, AnalyticsRow>(&format!(
            "SELECT {ANALYTICS_COLUMNS} FROM target_analytics \
             WHERE target_id = ? AND run_timestamp >= ? \
             ORDER BY run_timestamp DESC, id DESC LIMIT 1"
        ))
        .bind(target_id)
        .bind(&since)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => Ok(Some(row.into_record()?.summary)),
            None => Ok(None),
        }
    }

    async fn membership_count(&self, target_id: &str) -> StoreResult<usize> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM actor_membership WHERE target_id = ?")
                .bind(target_id)
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;

        Ok(count.0 as usize)
    }

    async fn memberships(&self, target_id: &str) -> StoreResult<Vec<MembershipRecord>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT actor_id, extracted_at FROM actor_membership WHERE target_id = ? ORDER BY actor_id",
        )
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|(actor_id, extracted_at)| {
                Ok(MembershipRecord {
                    target_id: target_id.to_string(),
                    actor_id,
                    extracted_at: parse_timestamp(target_id, &extracted_at)?,
                })
            })
            .collect()
    }

    async fn actor(&self, actor_id: &str) -> StoreResult<Option<ActorProfile>> {
        let row = sqlx::query_as::<_, ActorRow>(
            "SELECT id, username, full_name, follower_count, following_count, post_count, \
             is_verified, is_business, is_private, biography, external_url FROM actors WHERE id = ?",
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(ActorRow::into_profile).transpose()
    }

    async fn analytics_history(&self, target_id: &str) -> StoreResult<Vec<AnalyticsRecord>> {
        let rows = sqlx::query_as::<_, AnalyticsRow>(&format!(
            "SELECT {ANALYTICS_COLUMNS} FROM target_analytics WHERE target_id = ? \
             ORDER BY run_timestamp ASC, id ASC"
        ))
        .bind(target_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(AnalyticsRow::into_record).collect()
    }

    async fn audience_overlap(
        &self,
        target_ids: &[String],
        min_shared: usize,
    ) -> StoreResult<Vec<AudienceOverlap>> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT target_id, actor_id FROM actor_membership WHERE target_id IN (",
        );
        let mut ids = query.separated(", ");
        for target_id in target_ids {
            ids.push_bind(target_id);
        }
        ids.push_unseparated(")");

        let rows: Vec<(String, String)> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(overlap_from_pairs(
            rows.iter().map(|(t, a)| (t.as_str(), a.as_str())),
            target_ids,
            min_shared,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::summarize;
    use crate::types::config::ClassifierConfig;
    use chrono::{Duration as ChronoDuration, TimeZone};

    async fn test_store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    fn extraction(target: &str, ids: &[&str]) -> ExtractionResult {
        let actors = ids
            .iter()
            .map(|id| {
                ActorProfile::new(*id, format!("user_{id}"))
                    .with_counts(2_000, 400)
                    .with_posts(30)
                    .with_biography("hello@example.com")
            })
            .collect();
        ExtractionResult::complete(target, actors)
    }

    async fn persist(store: &SqliteStore, result: &ExtractionResult) -> UpsertOutcome {
        let summary = summarize(result, &ClassifierConfig::default());
        store.upsert(Uuid::new_v4(), result, &summary).await.unwrap()
    }

    #[tokio::test]
    async fn test_reupsert_adds_no_membership_rows() {
        let store = test_store().await;
        let result = extraction("post-1", &["a", "b"]);

        assert_eq!(persist(&store, &result).await.new_memberships, 2);
        assert_eq!(persist(&store, &result).await.new_memberships, 0);

        assert_eq!(store.membership_count("post-1").await.unwrap(), 2);
        assert_eq!(store.analytics_history("post-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_actor_refreshed_membership_preserved() {
        let store = test_store().await;
        // Whole seconds so the stored microsecond precision compares equal.
        let first_seen = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let first = extraction("post-1", &["a"]).with_extracted_at(first_seen);
        persist(&store, &first).await;

        let later = ExtractionResult::complete(
            "post-1",
            vec![ActorProfile::new("a", "new_handle").with_counts(10, 10)],
        )
        .with_extracted_at(first_seen + ChronoDuration::minutes(5));
        persist(&store, &later).await;

        let actor = store.actor("a").await.unwrap().unwrap();
        assert_eq!(actor.username, "new_handle");
        assert_eq!(actor.follower_count, 10);

        let members = store.memberships("post-1").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].extracted_at, first_seen);
    }

    #[tokio::test]
    async fn test_summary_roundtrip_and_since_filter() {
        let store = test_store().await;
        let now = Utc::now();

        persist(
            &store,
            &extraction("post-1", &["a"]).with_extracted_at(now - ChronoDuration::days(3)),
        )
        .await;
        persist(
            &store,
            &extraction("post-1", &["a", "b", "c"]).with_extracted_at(now),
        )
        .await;

        let latest = store.get_summary("post-1", None).await.unwrap().unwrap();
        assert_eq!(latest.total_extracted, 3);
        assert_eq!(latest.lead_candidate_count(), 3);
        assert_eq!(
            latest.lead_candidates[0].email.as_deref(),
            Some("hello@example.com")
        );

        let recent = store
            .get_summary("post-1", Some(now - ChronoDuration::days(1)))
            .await
            .unwrap();
        assert!(recent.is_some());

        let future = store
            .get_summary("post-1", Some(now + ChronoDuration::days(1)))
            .await
            .unwrap();
        assert!(future.is_none());
    }

    #[tokio::test]
    async fn test_audience_overlap() {
        let store = test_store().await;
        persist(&store, &extraction("post-1", &["a", "b"])).await;
        persist(&store, &extraction("post-2", &["b"])).await;
        persist(&store, &extraction("post-3", &["a"])).await;

        let overlap = store
            .audience_overlap(&["post-1".to_string(), "post-2".to_string()], 2)
            .await
            .unwrap();
        assert_eq!(overlap.len(), 1);
        assert_eq!(overlap[0].actor_id, "b");

        assert!(store.audience_overlap(&[], 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upsert_leaves_no_rows() {
        let store = test_store().await;
        sqlx::query("DROP TABLE target_analytics")
            .execute(store.pool())
            .await
            .unwrap();

        let result = extraction("post-1", &["a", "b"]);
        let summary = summarize(&result, &ClassifierConfig::default());
        let err = store.upsert(Uuid::new_v4(), &result, &summary).await;

        assert!(matches!(err, Err(StoreError::Backend(_))));
        assert_eq!(store.membership_count("post-1").await.unwrap(), 0);
        assert!(store.actor("a").await.unwrap().is_none());
        assert!(store.actor("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_count_is_rejected() {
        let store = test_store().await;
        let result = ExtractionResult::complete(
            "post-1",
            vec![
                ActorProfile::new("a", "fine").with_counts(10, 10),
                ActorProfile::new("b", "huge").with_counts(u64::MAX, 0),
            ],
        );
        let summary = summarize(&result, &ClassifierConfig::default());

        let err = store.upsert(Uuid::new_v4(), &result, &summary).await;
        assert!(matches!(err, Err(StoreError::Rejected { .. })));
        assert!(store.actor("a").await.unwrap().is_none());
        assert_eq!(store.membership_count("post-1").await.unwrap(), 0);

        let max = ExtractionResult::complete(
            "post-2",
            vec![ActorProfile::new("c", "big").with_counts(i64::MAX as u64, 0)],
        );
        let summary = summarize(&max, &ClassifierConfig::default());
        store.upsert(Uuid::new_v4(), &max, &summary).await.unwrap();
        assert_eq!(
            store.actor("c").await.unwrap().unwrap().follower_count,
            i64::MAX as u64
        );
    }

    #[tokio::test]
    async fn test_latest_is_by_run_timestamp_not_insert_order() {
        let store = test_store().await;
        let now = Utc::now();

        persist(&store, &extraction("post-1", &["a", "b"]).with_extracted_at(now)).await;
        persist(
            &store,
            &extraction("post-1", &["a"]).with_extracted_at(now - ChronoDuration::days(2)),
        )
        .await;

        let latest = store.get_summary("post-1", None).await.unwrap().unwrap();
        assert_eq!(latest.total_extracted, 2);

        let history = store.analytics_history("post-1").await.unwrap();
        assert_eq!(history[0].total_extracted, 1);
        assert_eq!(history[1].total_extracted, 2);
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let store = test_store().await;
        assert!(store.actor("nobody").await.unwrap().is_none());
        assert_eq!(store.membership_count("nothing").await.unwrap(), 0);
        assert!(store.get_summary("nothing", None).await.unwrap().is_none());
    }
}
