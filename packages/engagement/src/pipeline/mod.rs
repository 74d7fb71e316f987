//! Engagement pipeline.
//!
//! The pipeline orchestrates:
//! - Pagination of one target against an engagement source
//! - Actor classification (suspicion, engagement potential, lead score)
//! - Aggregation into a quality summary
//! - Bulk runs over many targets with a bounded worker pool

pub mod aggregate;
pub mod bulk;
pub mod classify;
pub mod paginate;

pub use aggregate::summarize;
pub use bulk::{
    BatchOutcome, BulkOrchestrator, FailureKind, FailureStage, TargetFailure, TargetOutcome,
    TargetSuccess,
};
pub use classify::{
    classify, extract_lead, find_email, find_phone, has_engagement_potential, is_lead_candidate,
    is_suspicious, lead_score,
};
pub use paginate::Paginator;
