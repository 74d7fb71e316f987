//! Engagement Actor Extraction Library
//!
//! Pulls the users who engaged with a piece of content (likers, commenters)
//! out of a paginated upstream API, scores them for authenticity and lead
//! quality, and keeps a deduplicated history of who engaged with what.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use engagement::{BulkConfig, BulkOrchestrator, MemoryStore};
//! use engagement::testing::MockSource;
//!
//! let source = Arc::new(MockSource::new().with_endless("post-1", 50));
//! let store = Arc::new(MemoryStore::new());
//! let orchestrator = BulkOrchestrator::new(
//!     source,
//!     store,
//!     BulkConfig::new().with_per_target_cap(Some(500)),
//! );
//!
//! let batch = orchestrator.run(["post-1", "post-2"]).await;
//! for failure in batch.failures() {
//!     eprintln!("{} failed at {}: {}", failure.target_id, failure.stage, failure.error);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (EngagementSource, EngagementStore)
//! - [`types`] - Actors, targets, extraction results, summaries, configs
//! - [`pipeline`] - Pagination, classification, aggregation and bulk runs
//! - [`stores`] - Storage implementations (MemoryStore, SqliteStore)
//! - [`sources`] - Source implementations (HTTP, rate limiting)
//! - [`security`] - Credential handling
//! - [`report`] - Tabular export of batch results
//! - [`testing`] - Mock implementations for testing

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod security;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use config::RunConfig;
pub use error::{EngagementError, SourceError, StoreError};
pub use security::{ApiCredentials, SecretString};
pub use traits::{
    source::{Cursor, EngagementSource, Page},
    store::{AnalyticsRecord, AudienceOverlap, EngagementStore, MembershipRecord, UpsertOutcome},
};
pub use types::{
    actor::ActorProfile,
    config::{
        BulkConfig, ClassifierConfig, EngagementThresholds, LeadWeights, PaginatorConfig,
        SuspicionThresholds,
    },
    extraction::{ExtractionResult, ExtractionStatus},
    summary::{
        Classification, FollowerBucket, FollowerHistogram, Lead, QualityPercentages,
        QualitySummary,
    },
    target::Target,
};

// Re-export pipeline components
pub use pipeline::{
    classify, is_lead_candidate, summarize, BatchOutcome, BulkOrchestrator, FailureKind,
    FailureStage, Paginator, TargetFailure, TargetOutcome, TargetSuccess,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

// Re-export sources
pub use sources::{HttpEngagementSource, RateLimitedSource};

pub use report::{LeadReportRow, Report, TargetReportRow};
