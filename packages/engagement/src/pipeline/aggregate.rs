//! Aggregation of one extraction result into a quality summary.

use crate::pipeline::classify::{classify, extract_lead, is_lead_candidate};
use crate::types::{
    config::ClassifierConfig, extraction::ExtractionResult, summary::QualitySummary,
};

/// Summarize an extraction in a single pass over its actors.
///
/// Leads keep the order actors were extracted in; ranking them is up to
/// the caller.
pub fn summarize(result: &ExtractionResult, config: &ClassifierConfig) -> QualitySummary {
    let mut summary = QualitySummary::empty(result.target_id.clone());
    let mut follower_sum: u128 = 0;

    for actor in result.actors() {
        let verdict = classify(actor, config);

        summary.total_extracted += 1;
        summary.verified_count += usize::from(actor.is_verified);
        summary.business_count += usize::from(actor.is_business);
        summary.private_count += usize::from(actor.is_private);
        summary.suspicious_count += usize::from(verdict.is_suspicious);
        summary.engagement_potential_count += usize::from(verdict.has_engagement_potential);
        summary.follower_histogram.record(actor.follower_count);
        follower_sum += u128::from(actor.follower_count);

        if is_lead_candidate(&verdict, config) {
            summary
                .lead_candidates
                .push(extract_lead(actor, verdict.lead_score));
        }
    }

    if summary.total_extracted > 0 {
        summary.avg_follower_count = follower_sum as f64 / summary.total_extracted as f64;
    }

    summary
}
