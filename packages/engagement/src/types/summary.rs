//! Quality summaries, classifications and leads.

use serde::{Deserialize, Serialize};

use super::actor::ActorProfile;

/// Classifier verdict for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub is_suspicious: bool,
    pub has_engagement_potential: bool,
    pub lead_score: i64,
}

/// Follower-count bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowerBucket {
    /// 0
    None,
    /// 1–99
    Under100,
    /// 100–999
    Under1k,
    /// 1k–9999
    Under10k,
    /// 10k–99999
    Under100k,
    /// 100k+
    Over100k,
}

impl FollowerBucket {
    /// Bucket for a follower count.
    pub fn for_count(followers: u64) -> Self {
        match followers {
            0 => FollowerBucket::None,
            1..=99 => FollowerBucket::Under100,
            100..=999 => FollowerBucket::Under1k,
            1_000..=9_999 => FollowerBucket::Under10k,
            10_000..=99_999 => FollowerBucket::Under100k,
            _ => FollowerBucket::Over100k,
        }
    }

    /// Report label.
    pub fn label(&self) -> &'static str {
        match self {
            FollowerBucket::None => "0",
            FollowerBucket::Under100 => "1-99",
            FollowerBucket::Under1k => "100-999",
            FollowerBucket::Under10k => "1k-9999",
            FollowerBucket::Under100k => "10k-99999",
            FollowerBucket::Over100k => "100k+",
        }
    }
}

/// Follower-count histogram over the six fixed buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerHistogram {
    pub none: usize,
    pub under_100: usize,
    pub under_1k: usize,
    pub under_10k: usize,
    pub under_100k: usize,
    pub over_100k: usize,
}

impl FollowerHistogram {
    /// Count one actor.
    pub fn record(&mut self, followers: u64) {
        *self.slot_mut(FollowerBucket::for_count(followers)) += 1;
    }

    /// Count in a bucket.
    pub fn get(&self, bucket: FollowerBucket) -> usize {
        match bucket {
            FollowerBucket::None => self.none,
            FollowerBucket::Under100 => self.under_100,
            FollowerBucket::Under1k => self.under_1k,
            FollowerBucket::Under10k => self.under_10k,
            FollowerBucket::Under100k => self.under_100k,
            FollowerBucket::Over100k => self.over_100k,
        }
    }

    /// Sum across all buckets.
    pub fn total(&self) -> usize {
        self.none + self.under_100 + self.under_1k + self.under_10k + self.under_100k + self.over_100k
    }

    fn slot_mut(&mut self, bucket: FollowerBucket) -> &mut usize {
        match bucket {
            FollowerBucket::None => &mut self.none,
            FollowerBucket::Under100 => &mut self.under_100,
            FollowerBucket::Under1k => &mut self.under_1k,
            FollowerBucket::Under10k => &mut self.under_10k,
            FollowerBucket::Under100k => &mut self.under_100k,
            FollowerBucket::Over100k => &mut self.over_100k,
        }
    }
}

/// An actor that passed the lead criteria, with contact fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub profile: ActorProfile,
    pub lead_score: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub external_url: Option<String>,
}

impl Lead {
    /// Whether any contact channel was found.
    pub fn has_contact(&self) -> bool {
        self.email.is_some() || self.phone.is_some() || self.external_url.is_some()
    }
}

/// Ratios over `total_extracted`, only defined for non-empty extractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityPercentages {
    pub verified: f64,
    pub business: f64,
    pub private: f64,
    pub suspicious: f64,
    pub engagement_potential: f64,
    pub lead_candidates: f64,
}

/// Derived quality metrics for one extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub target_id: String,
    pub total_extracted: usize,
    pub verified_count: usize,
    pub business_count: usize,
    pub private_count: usize,
    pub suspicious_count: usize,
    pub engagement_potential_count: usize,

    /// Mean follower count (0.0 for an empty extraction)
    pub avg_follower_count: f64,

    pub follower_histogram: FollowerHistogram,

    /// Leads in original actor order (sorting is a caller concern)
    pub lead_candidates: Vec<Lead>,
}

impl QualitySummary {
    /// An empty summary for a target.
    pub fn empty(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            total_extracted: 0,
            verified_count: 0,
            business_count: 0,
            private_count: 0,
            suspicious_count: 0,
            engagement_potential_count: 0,
            avg_follower_count: 0.0,
            follower_histogram: FollowerHistogram::default(),
            lead_candidates: Vec::new(),
        }
    }

    pub fn lead_candidate_count(&self) -> usize {
        self.lead_candidates.len()
    }

    /// Percentages of the total, or `None` when nothing was extracted.
    pub fn percentages(&self) -> Option<QualityPercentages> {
        if self.total_extracted == 0 {
            return None;
        }
        let total = self.total_extracted as f64;
        let pct = |n: usize| n as f64 / total * 100.0;
        Some(QualityPercentages {
            verified: pct(self.verified_count),
            business: pct(self.business_count),
            private: pct(self.private_count),
            suspicious: pct(self.suspicious_count),
            engagement_potential: pct(self.engagement_potential_count),
            lead_candidates: pct(self.lead_candidates.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(FollowerBucket::for_count(0), FollowerBucket::None);
        assert_eq!(FollowerBucket::for_count(1), FollowerBucket::Under100);
        assert_eq!(FollowerBucket::for_count(99), FollowerBucket::Under100);
        assert_eq!(FollowerBucket::for_count(100), FollowerBucket::Under1k);
        assert_eq!(FollowerBucket::for_count(9_999), FollowerBucket::Under10k);
        assert_eq!(FollowerBucket::for_count(10_000), FollowerBucket::Under100k);
        assert_eq!(FollowerBucket::for_count(100_000), FollowerBucket::Over100k);
    }

    #[test]
    fn test_histogram_total() {
        let mut histogram = FollowerHistogram::default();
        for followers in [0, 5, 500, 5_000, 50_000, 500_000, 0] {
            histogram.record(followers);
        }
        assert_eq!(histogram.total(), 7);
        assert_eq!(histogram.get(FollowerBucket::None), 2);
    }

    #[test]
    fn test_percentages_undefined_when_empty() {
        assert!(QualitySummary::empty("t").percentages().is_none());
    }

    #[test]
    fn test_percentages() {
        let mut summary = QualitySummary::empty("t");
        summary.total_extracted = 4;
        summary.verified_count = 1;
        summary.suspicious_count = 2;

        let pct = summary.percentages().unwrap();
        assert!((pct.verified - 25.0).abs() < f64::EPSILON);
        assert!((pct.suspicious - 50.0).abs() < f64::EPSILON);
        assert_eq!(pct.business, 0.0);
    }
}
