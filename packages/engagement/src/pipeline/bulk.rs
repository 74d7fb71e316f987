//! Bulk orchestration: run many targets through fetch → classify → persist.
//!
//! A fixed pool of `concurrency_limit` workers pulls targets from a shared
//! queue. Each worker runs one target's whole pipeline before taking the
//! next, so at most `concurrency_limit` targets are ever in flight. A failing
//! target becomes a [`TargetFailure`] in the outcome map; it never stops the
//! batch. Only the caller's [`CancellationToken`] stops dispatch.

use futures::future::join_all;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::EngagementError;
use crate::pipeline::aggregate::summarize;
use crate::pipeline::paginate::Paginator;
use crate::traits::{
    source::EngagementSource,
    store::{EngagementStore, UpsertOutcome},
};
use crate::types::{
    config::BulkConfig,
    extraction::{ExtractionResult, ExtractionStatus},
    summary::QualitySummary,
    target::Target,
};

/// Pipeline stage a target was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Classify,
    Store,
}

impl FailureStage {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => FailureStage::Fetch,
            1 => FailureStage::Classify,
            _ => FailureStage::Store,
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Fetch => "fetch",
            FailureStage::Classify => "classify",
            FailureStage::Store => "store",
        };
        f.write_str(name)
    }
}

/// What went wrong for a failed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    MalformedResponse,
    PersistenceFailure,
    Cancelled,
    /// The target's pipeline panicked
    Panicked,
}

impl From<&EngagementError> for FailureKind {
    fn from(err: &EngagementError) -> Self {
        match err {
            EngagementError::SourceUnavailable { .. } => FailureKind::SourceUnavailable,
            EngagementError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            EngagementError::PersistenceFailure(_) => FailureKind::PersistenceFailure,
            EngagementError::Cancelled => FailureKind::Cancelled,
            EngagementError::Config(_) => FailureKind::SourceUnavailable,
        }
    }
}

/// A typed per-target failure. Nothing is retried automatically; `partial`
/// carries whatever was extracted so the caller can decide to resubmit.
#[derive(Debug, Clone, Serialize)]
pub struct TargetFailure {
    pub target_id: String,
    pub stage: FailureStage,
    pub kind: FailureKind,

    /// Original error description
    pub error: String,

    /// Upstream HTTP status, when known
    pub status: Option<u16>,

    pub partial: Option<ExtractionResult>,
}

impl TargetFailure {
    fn from_error(
        stage: FailureStage,
        err: &EngagementError,
        partial: Option<ExtractionResult>,
        target_id: &str,
    ) -> Self {
        let status = match err {
            EngagementError::SourceUnavailable { source, .. } => source.status(),
            _ => None,
        };
        Self {
            target_id: target_id.to_string(),
            stage,
            kind: FailureKind::from(err),
            error: err.to_string(),
            status,
            partial,
        }
    }

    /// Cancelled before the first page fetch, so nothing was attempted.
    pub fn never_started(&self) -> bool {
        self.kind == FailureKind::Cancelled
            && self.stage == FailureStage::Fetch
            && self
                .partial
                .as_ref()
                .is_some_and(|partial| partial.pages_fetched == 0)
    }

    /// Pass finished extractions through; turn the rest into fetch-stage failures.
    fn check_finished(result: ExtractionResult) -> Result<ExtractionResult, Self> {
        if result.is_finished() {
            return Ok(result);
        }
        let (kind, error, status) = match &result.status {
            ExtractionStatus::Incomplete {
                error,
                status,
                malformed,
            } => {
                let kind = if *malformed {
                    FailureKind::MalformedResponse
                } else {
                    FailureKind::SourceUnavailable
                };
                (kind, error.clone(), *status)
            }
            _ => (
                FailureKind::Cancelled,
                EngagementError::Cancelled.to_string(),
                None,
            ),
        };
        Err(Self {
            target_id: result.target_id.clone(),
            stage: FailureStage::Fetch,
            kind,
            error,
            status,
            partial: Some(result),
        })
    }
}

/// A target that made it all the way to the store.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSuccess {
    pub result: ExtractionResult,
    pub summary: QualitySummary,
    pub upsert: UpsertOutcome,
}

/// Outcome for one target.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TargetOutcome {
    Success(Box<TargetSuccess>),
    Failure(TargetFailure),
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Success(_))
    }

    pub fn success(&self) -> Option<&TargetSuccess> {
        match self {
            TargetOutcome::Success(success) => Some(success),
            TargetOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TargetFailure> {
        match self {
            TargetOutcome::Success(_) => None,
            TargetOutcome::Failure(failure) => Some(failure),
        }
    }
}

/// Everything a batch produced.
///
/// Every requested (deduplicated) target id appears exactly once, either in
/// `outcomes` or in `skipped`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub run_id: Uuid,

    /// Outcomes keyed (and ordered) by target id
    pub outcomes: BTreeMap<String, TargetOutcome>,

    /// Targets never dispatched, or cancelled before their first page fetch
    pub skipped: Vec<String>,
}

impl BatchOutcome {
    pub fn successes(&self) -> impl Iterator<Item = &TargetSuccess> {
        self.outcomes.values().filter_map(TargetOutcome::success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetFailure> {
        self.outcomes.values().filter_map(TargetOutcome::failure)
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Whether every target was dispatched.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

struct RunContext<S: ?Sized, St: ?Sized> {
    run_id: Uuid,
    config: BulkConfig,
    paginator: Paginator,
    source: Arc<S>,
    store: Arc<St>,
    cancel: CancellationToken,
    queue: Mutex<VecDeque<Target>>,
}

impl<S, St> RunContext<S, St>
where
    S: EngagementSource + ?Sized,
    St: EngagementStore + ?Sized,
{
    fn next_target(&self) -> Option<Target> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }

    fn drain_queue(&self) -> Vec<String> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .map(|target| target.id)
            .collect()
    }

    /// Run one target, containing panics at the stage that raised them.
    async fn run_target(&self, target: &Target) -> TargetOutcome {
        let stage = AtomicU8::new(FailureStage::Fetch as u8);

        match AssertUnwindSafe(self.process(target, &stage))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => TargetOutcome::Failure(TargetFailure {
                target_id: target.id.clone(),
                stage: FailureStage::from_u8(stage.load(Ordering::SeqCst)),
                kind: FailureKind::Panicked,
                error: panic_message(panic.as_ref()),
                status: None,
                partial: None,
            }),
        }
    }

    async fn process(&self, target: &Target, stage: &AtomicU8) -> TargetOutcome {
        let result = self
            .paginator
            .extract_with_cancel(
                self.source.as_ref(),
                target,
                self.config.per_target_cap,
                &self.cancel,
            )
            .await;

        let result = match TargetFailure::check_finished(result) {
            Ok(result) => result,
            Err(failure) => return TargetOutcome::Failure(failure),
        };

        stage.store(FailureStage::Classify as u8, Ordering::SeqCst);
        if let Some(actor) = result.actors().iter().find(|a| a.id.trim().is_empty()) {
            let err = EngagementError::MalformedResponse {
                target_id: target.id.clone(),
                reason: format!("actor {:?} has no id", actor.username),
            };
            return TargetOutcome::Failure(TargetFailure::from_error(
                FailureStage::Classify,
                &err,
                Some(result),
                &target.id,
            ));
        }
        let summary = summarize(&result, &self.config.classifier);

        stage.store(FailureStage::Store as u8, Ordering::SeqCst);
        match self.store.upsert(self.run_id, &result, &summary).await {
            Ok(upsert) => TargetOutcome::Success(Box::new(TargetSuccess {
                result,
                summary,
                upsert,
            })),
            Err(err) => {
                let err = EngagementError::from(err);
                TargetOutcome::Failure(TargetFailure::from_error(
                    FailureStage::Store,
                    &err,
                    Some(result),
                    &target.id,
                ))
            }
        }
    }
}

/// File one worker result. Targets cancelled before their first fetch count
/// as skipped rather than failed.
fn record_outcome(
    outcomes: &mut BTreeMap<String, TargetOutcome>,
    skipped: &mut Vec<String>,
    target_id: String,
    outcome: TargetOutcome,
) {
    match &outcome {
        TargetOutcome::Failure(failure) if failure.never_started() => {
            debug!(target_id = %target_id, "Target cancelled before its first fetch");
            skipped.push(target_id);
            return;
        }
        TargetOutcome::Success(success) => debug!(
            target_id = %target_id,
            actors = success.result.total_extracted(),
            leads = success.summary.lead_candidate_count(),
            "Target done"
        ),
        TargetOutcome::Failure(failure) => warn!(
            target_id = %target_id,
            stage = %failure.stage,
            kind = ?failure.kind,
            error = %failure.error,
            "Target failed"
        ),
    }
    outcomes.insert(target_id, outcome);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// Runs batches of targets through a shared source and store.
pub struct BulkOrchestrator<S: ?Sized, St: ?Sized> {
    source: Arc<S>,
    store: Arc<St>,
    config: BulkConfig,
}

impl<S, St> BulkOrchestrator<S, St>
where
    S: EngagementSource + ?Sized + 'static,
    St: EngagementStore + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, store: Arc<St>, config: BulkConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    /// Run every target to completion.
    pub async fn run<I, T>(&self, targets: I) -> BatchOutcome
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        self.run_with_cancel(targets, &CancellationToken::new())
            .await
    }

    /// Run targets until done or until `cancel` fires.
    ///
    /// On cancellation, in-flight targets finish their current page and are
    /// reported as cancelled; targets not yet dispatched land in `skipped`.
    pub async fn run_with_cancel<I, T>(&self, targets: I, cancel: &CancellationToken) -> BatchOutcome
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        let run_id = Uuid::new_v4();

        // Collapse duplicate ids, keeping first-seen order.
        let mut unique: IndexMap<String, Target> = IndexMap::new();
        for target in targets {
            let target = target.into();
            unique.entry(target.id.clone()).or_insert(target);
        }
        let total = unique.len();
        let workers = self.config.concurrency_limit.max(1).min(total);

        let ctx = Arc::new(RunContext {
            run_id,
            config: self.config.clone(),
            paginator: Paginator::new(self.config.paginator.clone()),
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            cancel: cancel.clone(),
            queue: Mutex::new(unique.into_values().collect()),
        });

        let span = info_span!("bulk_run", %run_id);
        async move {
            info!(
                targets = total,
                workers,
                source = ctx.source.name(),
                "Starting bulk run"
            );

            let (tx, mut rx) = mpsc::unbounded_channel::<(String, TargetOutcome)>();
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let ctx = Arc::clone(&ctx);
                    let tx = tx.clone();
                    tokio::spawn(
                        async move {
                            while !ctx.cancel.is_cancelled() {
                                let Some(target) = ctx.next_target() else {
                                    break;
                                };
                                let outcome = ctx
                                    .run_target(&target)
                                    .instrument(info_span!("target", target_id = %target.id))
                                    .await;
                                if tx.send((target.id, outcome)).is_err() {
                                    break;
                                }
                            }
                        }
                        .instrument(info_span!("worker", worker)),
                    )
                })
                .collect();
            drop(tx);

            // Collected in completion order, keyed by target id.
            let mut outcomes = BTreeMap::new();
            let mut skipped = Vec::new();
            while let Some((target_id, outcome)) = rx.recv().await {
                record_outcome(&mut outcomes, &mut skipped, target_id, outcome);
            }

            for joined in join_all(handles).await {
                if let Err(e) = joined {
                    warn!(error = %e, "Worker task ended abnormally");
                }
            }

            skipped.extend(ctx.drain_queue());
            let batch = BatchOutcome {
                run_id,
                outcomes,
                skipped,
            };

            info!(
                succeeded = batch.success_count(),
                failed = batch.failure_count(),
                skipped = batch.skipped.len(),
                "Bulk run finished"
            );
            batch
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::stores::MemoryStore;
    use crate::testing::{bot_profile, lead_profile, profiles, FailingStore, MockFailure, MockSource};
    use crate::types::actor::ActorProfile;
    use crate::types::config::PaginatorConfig;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::time::Duration;

    fn config(limit: usize) -> BulkConfig {
        BulkConfig::new()
            .with_concurrency_limit(limit)
            .with_paginator(PaginatorConfig::new().without_delay())
    }

    fn five_targets() -> MockSource {
        (1..=5).fold(
            MockSource::new().with_latency(Duration::from_millis(20)),
            |source, i| source.with_actors(format!("post-{i}"), profiles(&format!("p{i}"), 6), 3),
        )
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let source = Arc::new(five_targets().with_failure("post-3", MockFailure::Status(503)));
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BulkOrchestrator::new(source.clone(), store.clone(), config(2));

        let batch = orchestrator
            .run((1..=5).map(|i| format!("post-{i}")))
            .await;

        assert_eq!(batch.outcomes.len(), 5);
        assert_eq!(batch.success_count(), 4);
        assert!(batch.is_complete());

        let failure = batch.outcomes["post-3"].failure().unwrap();
        assert_eq!(failure.stage, FailureStage::Fetch);
        assert_eq!(failure.kind, FailureKind::SourceUnavailable);
        assert_eq!(failure.status, Some(503));

        assert!(source.max_in_flight() <= 2);
        assert_eq!(store.membership_count("post-1").await.unwrap(), 6);
        assert_eq!(store.membership_count("post-3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outcomes_are_keyed_in_target_order() {
        let source = Arc::new(five_targets());
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BulkOrchestrator::new(source, store, config(5));

        let batch = orchestrator
            .run(["post-5", "post-2", "post-4", "post-1", "post-3"])
            .await;

        let keys: Vec<_> = batch.outcomes.keys().cloned().collect();
        assert_eq!(keys, vec!["post-1", "post-2", "post-3", "post-4", "post-5"]);
    }

    #[tokio::test]
    async fn test_duplicate_targets_run_once() {
        let source = Arc::new(five_targets());
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BulkOrchestrator::new(source.clone(), store.clone(), config(3));

        let batch = orchestrator.run(["post-1", "post-1", "post-2"]).await;

        assert_eq!(batch.outcomes.len(), 2);
        assert_eq!(source.calls_for("post-1"), 2);
        assert_eq!(store.analytics_history("post-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_skips_undispatched_targets() {
        let source = Arc::new(
            (1..=5).fold(
                MockSource::new().with_latency(Duration::from_millis(10)),
                |source, i| source.with_endless(format!("post-{i}"), 4),
            ),
        );
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BulkOrchestrator::new(source.clone(), store.clone(), config(2));

        let cancel = CancellationToken::new();
        let watcher = {
            let source = source.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                while source.targets_started().len() < 2 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                cancel.cancel();
            })
        };

        let batch = tokio::time::timeout(
            Duration::from_secs(10),
            orchestrator.run_with_cancel((1..=5).map(|i| format!("post-{i}")), &cancel),
        )
        .await
        .expect("cancelled batch should finish");
        watcher.await.unwrap();

        assert_eq!(batch.outcomes.len(), 2);
        assert_eq!(batch.skipped.len(), 3);
        assert_eq!(source.targets_started().len(), 2);

        for (target_id, outcome) in &batch.outcomes {
            let failure = outcome.failure().expect("interrupted target is a failure");
            assert_eq!(failure.kind, FailureKind::Cancelled);
            assert_eq!(failure.stage, FailureStage::Fetch);
            assert!(failure.partial.as_ref().unwrap().total_extracted() > 0);
            assert_eq!(store.membership_count(target_id).await.unwrap(), 0);
        }
        for target_id in &batch.skipped {
            assert!(!batch.outcomes.contains_key(target_id));
        }
        assert_eq!(store.actor_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_target_cancelled_before_first_fetch_is_skipped() {
        let source = Arc::new(five_targets());
        let store = Arc::new(MemoryStore::new());
        let cancel = CancellationToken::new();
        let ctx = RunContext {
            run_id: Uuid::new_v4(),
            config: config(2),
            paginator: Paginator::new(PaginatorConfig::new().without_delay()),
            source: source.clone(),
            store: store.clone(),
            cancel: cancel.clone(),
            queue: Mutex::new(VecDeque::new()),
        };

        // Cancellation lands after the target was popped but before its first fetch.
        cancel.cancel();
        let outcome = ctx.run_target(&Target::new("post-1")).await;
        assert!(outcome.failure().unwrap().never_started());
        assert_eq!(source.call_count(), 0);

        let mut outcomes = BTreeMap::new();
        let mut skipped = Vec::new();
        record_outcome(&mut outcomes, &mut skipped, "post-1".into(), outcome);
        assert!(outcomes.is_empty());
        assert_eq!(skipped, vec!["post-1".to_string()]);

        // A target interrupted after fetching keeps its outcome.
        let partial =
            ExtractionResult::new("post-2", profiles("p", 3), ExtractionStatus::Cancelled)
                .with_pages_fetched(1);
        let failure = TargetFailure::check_finished(partial).unwrap_err();
        assert!(!failure.never_started());
        record_outcome(
            &mut outcomes,
            &mut skipped,
            "post-2".into(),
            TargetOutcome::Failure(failure),
        );
        assert!(outcomes.contains_key("post-2"));
        assert_eq!(skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_reported_at_store_stage() {
        let source = Arc::new(five_targets());
        let store = Arc::new(FailingStore::for_target("post-2"));
        let orchestrator = BulkOrchestrator::new(source, store.clone(), config(2));

        let batch = orchestrator.run(["post-1", "post-2"]).await;

        let failure = batch.outcomes["post-2"].failure().unwrap();
        assert_eq!(failure.stage, FailureStage::Store);
        assert_eq!(failure.kind, FailureKind::PersistenceFailure);
        assert_eq!(failure.partial.as_ref().unwrap().total_extracted(), 6);
        assert!(batch.outcomes["post-1"].is_success());
    }

    #[tokio::test]
    async fn test_malformed_page_and_empty_actor_id() {
        let source = Arc::new(
            MockSource::new()
                .with_failure("post-1", MockFailure::Malformed("missing users".into()))
                .with_pages(
                    "post-2",
                    vec![vec![lead_profile("1", "studio"), ActorProfile::new("", "ghost")]],
                ),
        );
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BulkOrchestrator::new(source, store.clone(), config(2));

        let batch = orchestrator.run(["post-1", "post-2"]).await;

        let fetch = batch.outcomes["post-1"].failure().unwrap();
        assert_eq!(fetch.stage, FailureStage::Fetch);
        assert_eq!(fetch.kind, FailureKind::MalformedResponse);

        let classify = batch.outcomes["post-2"].failure().unwrap();
        assert_eq!(classify.stage, FailureStage::Classify);
        assert_eq!(classify.kind, FailureKind::MalformedResponse);
        assert_eq!(store.membership_count("post-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_per_target_cap_and_summary() {
        let source = Arc::new(MockSource::new().with_pages(
            "post-1",
            vec![
                vec![lead_profile("1", "studio"), bot_profile("2")],
                vec![lead_profile("3", "gallery"), bot_profile("4")],
            ],
        ));
        let store = Arc::new(MemoryStore::new());
        let orchestrator = BulkOrchestrator::new(
            source,
            store.clone(),
            config(1).with_per_target_cap(Some(3)),
        );

        let batch = orchestrator.run(["post-1"]).await;
        let success = batch.outcomes["post-1"].success().unwrap();

        assert!(success.result.truncated());
        assert_eq!(success.summary.total_extracted, 3);
        assert_eq!(success.summary.suspicious_count, 1);
        assert_eq!(success.summary.lead_candidate_count(), 2);
        assert_eq!(success.upsert.new_memberships, 3);

        let history = store.analytics_history("post-1").await.unwrap();
        assert_eq!(history[0].run_id, batch.run_id);
    }

    struct PanickingStore;

    #[async_trait]
    impl EngagementStore for PanickingStore {
        async fn upsert(
            &self,
            _: Uuid,
            _: &ExtractionResult,
            _: &QualitySummary,
        ) -> StoreResult<UpsertOutcome> {
            panic!("disk on fire");
        }

        async fn get_summary(
            &self,
            _: &str,
            _: Option<DateTime<Utc>>,
        ) -> StoreResult<Option<QualitySummary>> {
            Ok(None)
        }

        async fn membership_count(&self, _: &str) -> StoreResult<usize> {
            Ok(0)
        }

        async fn memberships(
            &self,
            _: &str,
        ) -> StoreResult<Vec<crate::traits::store::MembershipRecord>> {
            Ok(Vec::new())
        }

        async fn actor(&self, _: &str) -> StoreResult<Option<ActorProfile>> {
            Err(StoreError::Backend("unused".into()))
        }

        async fn analytics_history(
            &self,
            _: &str,
        ) -> StoreResult<Vec<crate::traits::store::AnalyticsRecord>> {
            Ok(Vec::new())
        }

        async fn audience_overlap(
            &self,
            _: &[String],
            _: usize,
        ) -> StoreResult<Vec<crate::traits::store::AudienceOverlap>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_panic_is_contained_at_its_stage() {
        let source = Arc::new(five_targets());
        let orchestrator = BulkOrchestrator::new(source, Arc::new(PanickingStore), config(2));

        let batch = orchestrator.run(["post-1", "post-2"]).await;

        assert_eq!(batch.outcomes.len(), 2);
        for outcome in batch.outcomes.values() {
            let failure = outcome.failure().unwrap();
            assert_eq!(failure.stage, FailureStage::Store);
            assert_eq!(failure.kind, FailureKind::Panicked);
            assert!(failure.error.contains("disk on fire"));
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = BulkOrchestrator::new(
            Arc::new(MockSource::new()),
            Arc::new(MemoryStore::new()),
            config(4),
        );
        let batch = orchestrator.run(Vec::<Target>::new()).await;
        assert!(batch.outcomes.is_empty());
        assert!(batch.is_complete());
    }
}
