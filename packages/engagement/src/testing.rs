//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the pipeline without a real upstream or
//! database: a scripted [`MockSource`], a [`FailingStore`] and a few profile
//! fixtures.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{SourceError, SourceResult, StoreError, StoreResult};
use crate::stores::MemoryStore;
use crate::traits::{
    source::{Cursor, EngagementSource, Page},
    store::{AnalyticsRecord, AudienceOverlap, EngagementStore, MembershipRecord, UpsertOutcome},
};
use crate::types::{actor::ActorProfile, extraction::ExtractionResult, summary::QualitySummary};

/// How a scripted target fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Upstream answers with this HTTP status
    Status(u16),
    /// Page body cannot be decoded
    Malformed(String),
    /// Transport failure
    Network(String),
}

impl MockFailure {
    fn to_error(&self) -> SourceError {
        match self {
            MockFailure::Status(status) => SourceError::Status {
                status: *status,
                message: "scripted failure".into(),
            },
            MockFailure::Malformed(reason) => SourceError::Malformed {
                reason: reason.clone(),
            },
            MockFailure::Network(message) => SourceError::Network(message.clone().into()),
        }
    }
}

#[derive(Debug, Clone)]
enum Script {
    /// Fixed pages; the last one carries no cursor
    Pages(Vec<Vec<ActorProfile>>),
    /// Never-ending pages of this size
    Endless(usize),
}

/// Record of a call made to the mock source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSourceCall {
    pub target_id: String,
    pub cursor: Option<String>,
}

/// Scripted engagement source.
///
/// Cursors are `page-{n}` tokens. Unknown targets answer with an empty page.
/// Clones share scripts and call records.
#[derive(Clone, Default)]
pub struct MockSource {
    scripts: Arc<RwLock<HashMap<String, Script>>>,
    /// target -> (1-based page number that fails, failure)
    failures: Arc<RwLock<HashMap<String, (usize, MockFailure)>>>,
    latency: Duration,
    calls: Arc<RwLock<Vec<MockSourceCall>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockSource {
    /// Create a new empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script explicit pages for a target.
    pub fn with_pages(self, target_id: impl Into<String>, pages: Vec<Vec<ActorProfile>>) -> Self {
        write(&self.scripts).insert(target_id.into(), Script::Pages(pages));
        self
    }

    /// Script a target whose actors are split into pages of `page_size`.
    pub fn with_actors(
        self,
        target_id: impl Into<String>,
        actors: Vec<ActorProfile>,
        page_size: usize,
    ) -> Self {
        let pages = actors
            .chunks(page_size.max(1))
            .map(<[ActorProfile]>::to_vec)
            .collect();
        self.with_pages(target_id, pages)
    }

    /// Script a target that always has another page.
    pub fn with_endless(self, target_id: impl Into<String>, page_size: usize) -> Self {
        write(&self.scripts).insert(target_id.into(), Script::Endless(page_size));
        self
    }

    /// Make every fetch for a target fail.
    pub fn with_failure(self, target_id: impl Into<String>, failure: MockFailure) -> Self {
        self.with_failure_at(target_id, 1, failure)
    }

    /// Make a target fail from the given 1-based page onwards.
    pub fn with_failure_at(
        self,
        target_id: impl Into<String>,
        page: usize,
        failure: MockFailure,
    ) -> Self {
        write(&self.failures).insert(target_id.into(), (page.max(1), failure));
        self
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// All calls made so far, in arrival order.
    pub fn calls(&self) -> Vec<MockSourceCall> {
        read(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        read(&self.calls).len()
    }

    /// Calls made for one target.
    pub fn calls_for(&self, target_id: &str) -> usize {
        read(&self.calls)
            .iter()
            .filter(|call| call.target_id == target_id)
            .count()
    }

    /// Distinct targets that received at least one fetch.
    pub fn targets_started(&self) -> BTreeSet<String> {
        read(&self.calls)
            .iter()
            .map(|call| call.target_id.clone())
            .collect()
    }

    /// Highest number of fetches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn page_for(&self, target_id: &str, page_number: usize) -> Page {
        let scripts = read(&self.scripts);
        match scripts.get(target_id) {
            Some(Script::Pages(pages)) => {
                let actors = pages.get(page_number - 1).cloned().unwrap_or_default();
                let next_cursor = (page_number < pages.len())
                    .then(|| Cursor::new(format!("page-{}", page_number + 1)));
                Page::new(actors, next_cursor)
            }
            Some(Script::Endless(size)) => {
                let start = (page_number - 1) * size;
                let actors = (start..start + size)
                    .map(|i| profile(&format!("{target_id}-{i}"), &format!("fan{i}")))
                    .collect();
                Page::new(actors, Some(Cursor::new(format!("page-{}", page_number + 1))))
            }
            None => Page::default(),
        }
    }
}

struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngagementSource for MockSource {
    async fn fetch_page(&self, target_id: &str, cursor: Option<Cursor>) -> SourceResult<Page> {
        write(&self.calls).push(MockSourceCall {
            target_id: target_id.to_string(),
            cursor: cursor.as_ref().map(|c| c.as_str().to_string()),
        });

        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let page_number = match &cursor {
            None => 1,
            Some(cursor) => cursor
                .as_str()
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| SourceError::Status {
                    status: 400,
                    message: format!("unknown cursor {cursor:?}"),
                })?,
        };

        if let Some((from_page, failure)) = read(&self.failures).get(target_id) {
            if page_number >= *from_page {
                return Err(failure.to_error());
            }
        }

        Ok(self.page_for(target_id, page_number))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A store that rejects writes for chosen targets and delegates the rest to
/// a [`MemoryStore`].
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    reject: RwLock<BTreeSet<String>>,
    reject_all: bool,
}

impl FailingStore {
    /// A store whose every write fails.
    pub fn always() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    /// A store that only fails writes for `target_id`.
    pub fn for_target(target_id: impl Into<String>) -> Self {
        let store = Self::default();
        write(&store.reject).insert(target_id.into());
        store
    }

    /// The backing store, for asserting on what did get written.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl EngagementStore for FailingStore {
    async fn upsert(
        &self,
        run_id: Uuid,
        result: &ExtractionResult,
        summary: &QualitySummary,
    ) -> StoreResult<UpsertOutcome> {
        if self.reject_all || read(&self.reject).contains(&result.target_id) {
            return Err(StoreError::Rejected {
                target_id: result.target_id.clone(),
                reason: "scripted rejection".into(),
            });
        }
        self.inner.upsert(run_id, result, summary).await
    }

    async fn get_summary(
        &self,
        target_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<QualitySummary>> {
        self.inner.get_summary(target_id, since).await
    }

    async fn membership_count(&self, target_id: &str) -> StoreResult<usize> {
        self.inner.membership_count(target_id).await
    }

    async fn memberships(&self, target_id: &str) -> StoreResult<Vec<MembershipRecord>> {
        self.inner.memberships(target_id).await
    }

    async fn actor(&self, actor_id: &str) -> StoreResult<Option<ActorProfile>> {
        self.inner.actor(actor_id).await
    }

    async fn analytics_history(&self, target_id: &str) -> StoreResult<Vec<AnalyticsRecord>> {
        self.inner.analytics_history(target_id).await
    }

    async fn audience_overlap(
        &self,
        target_ids: &[String],
        min_shared: usize,
    ) -> StoreResult<Vec<AudienceOverlap>> {
        self.inner.audience_overlap(target_ids, min_shared).await
    }
}

/// An ordinary, non-suspicious profile with modest reach.
pub fn profile(id: &str, username: &str) -> ActorProfile {
    ActorProfile::new(id, username)
        .with_counts(350, 280)
        .with_posts(24)
        .with_biography("coffee, bikes, north shore")
}

/// A profile that scores well as a lead and lists contact details.
pub fn lead_profile(id: &str, username: &str) -> ActorProfile {
    ActorProfile::new(id, username)
        .with_counts(4_200, 610)
        .with_posts(180)
        .business()
        .with_biography("Bookings: hello@studio.example / 612-555-0199")
        .with_external_url("https://studio.example")
}

/// A profile that trips the follow-ratio suspicion rule.
pub fn bot_profile(id: &str) -> ActorProfile {
    ActorProfile::new(id, format!("promo_{id}"))
        .with_counts(12, 2_400)
        .with_posts(1)
}

/// `count` ordinary profiles with ids `{prefix}-0`, `{prefix}-1`, ...
pub fn profiles(prefix: &str, count: usize) -> Vec<ActorProfile> {
    (0..count)
        .map(|i| profile(&format!("{prefix}-{i}"), &format!("{prefix}user{i}")))
        .collect()
}
