//! Tabular export of batch results.
//!
//! A report has one summary row per target and one detail row per lead.
//! Rows are flat so they serialize cleanly to JSON (or any other tabular
//! serde format).

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::bulk::{BatchOutcome, TargetOutcome};
use crate::types::summary::{Lead, QualitySummary};

/// One row per target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReportRow {
    pub target_id: String,

    /// `ok`, `failed` or `skipped`
    pub status: &'static str,
    pub failure_stage: Option<String>,
    pub error: Option<String>,

    pub total_extracted: usize,
    pub truncated: bool,
    pub verified_count: usize,
    pub business_count: usize,
    pub private_count: usize,
    pub suspicious_count: usize,
    pub engagement_potential_count: usize,
    pub avg_follower_count: f64,
    pub lead_candidate_count: usize,
    pub verified_pct: Option<f64>,
    pub suspicious_pct: Option<f64>,
}

impl TargetReportRow {
    /// Row for a summarized target.
    pub fn from_summary(summary: &QualitySummary, truncated: bool) -> Self {
        let pct = summary.percentages();
        Self {
            target_id: summary.target_id.clone(),
            status: "ok",
            failure_stage: None,
            error: None,
            total_extracted: summary.total_extracted,
            truncated,
            verified_count: summary.verified_count,
            business_count: summary.business_count,
            private_count: summary.private_count,
            suspicious_count: summary.suspicious_count,
            engagement_potential_count: summary.engagement_potential_count,
            avg_follower_count: summary.avg_follower_count,
            lead_candidate_count: summary.lead_candidate_count(),
            verified_pct: pct.map(|p| p.verified),
            suspicious_pct: pct.map(|p| p.suspicious),
        }
    }

    fn empty(target_id: &str, status: &'static str) -> Self {
        let mut row = Self::from_summary(&QualitySummary::empty(target_id), false);
        row.status = status;
        row
    }
}

/// One row per lead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadReportRow {
    pub target_id: String,
    pub actor_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub follower_count: u64,
    pub is_verified: bool,
    pub is_business: bool,
    pub lead_score: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub external_url: Option<String>,
}

impl LeadReportRow {
    pub fn new(target_id: &str, lead: &Lead) -> Self {
        Self {
            target_id: target_id.to_string(),
            actor_id: lead.profile.id.clone(),
            username: lead.profile.username.clone(),
            full_name: lead.profile.full_name.clone(),
            follower_count: lead.profile.follower_count,
            is_verified: lead.profile.is_verified,
            is_business: lead.profile.is_business,
            lead_score: lead.lead_score,
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            external_url: lead.external_url.clone(),
        }
    }
}

/// Summary and lead tables for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub targets: Vec<TargetReportRow>,

    /// Highest score first; ties keep extraction order
    pub leads: Vec<LeadReportRow>,
}

impl Report {
    pub fn from_batch(batch: &BatchOutcome) -> Self {
        let mut targets = Vec::with_capacity(batch.outcomes.len() + batch.skipped.len());
        let mut leads = Vec::new();

        for (target_id, outcome) in &batch.outcomes {
            match outcome {
                TargetOutcome::Success(success) => {
                    targets.push(TargetReportRow::from_summary(
                        &success.summary,
                        success.result.truncated(),
                    ));
                    leads.extend(
                        success
                            .summary
                            .lead_candidates
                            .iter()
                            .map(|lead| LeadReportRow::new(target_id, lead)),
                    );
                }
                TargetOutcome::Failure(failure) => {
                    let mut row = TargetReportRow::empty(target_id, "failed");
                    row.failure_stage = Some(failure.stage.to_string());
                    row.error = Some(failure.error.clone());
                    if let Some(partial) = &failure.partial {
                        row.total_extracted = partial.total_extracted();
                    }
                    targets.push(row);
                }
            }
        }

        targets.extend(
            batch
                .skipped
                .iter()
                .map(|target_id| TargetReportRow::empty(target_id, "skipped")),
        );
        leads.sort_by(|a, b| b.lead_score.cmp(&a.lead_score));

        Self {
            run_id: batch.run_id,
            targets,
            leads,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
