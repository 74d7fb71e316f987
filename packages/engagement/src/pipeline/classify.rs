//! Actor classification: suspicion, engagement potential and lead scoring.
//!
//! Everything here is pure and deterministic. Thresholds come from
//! [`ClassifierConfig`] so calibration can change without touching the rules.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{
    actor::ActorProfile,
    config::{ClassifierConfig, EngagementThresholds, LeadWeights, SuspicionThresholds},
    summary::{Classification, Lead},
};

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}").unwrap()
});
// At least 7 digits, allowing the usual separators between them.
static RE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{5,}\d").unwrap());

const MIN_PHONE_DIGITS: usize = 7;

/// Classify one actor.
pub fn classify(profile: &ActorProfile, config: &ClassifierConfig) -> Classification {
    Classification {
        is_suspicious: is_suspicious(profile, &config.suspicion),
        has_engagement_potential: has_engagement_potential(profile, &config.engagement),
        lead_score: lead_score(profile, &config.lead),
    }
}

/// Heuristic bot/spam flag. Any one rule is enough.
pub fn is_suspicious(profile: &ActorProfile, t: &SuspicionThresholds) -> bool {
    let username_len = profile.username.chars().count();
    let underscores = profile.username.matches('_').count();
    let followers = profile.follower_count;
    let following = profile.following_count;
    let posts = profile.post_count;

    username_len > t.max_username_len
        || underscores > t.max_underscores
        || (following > t.follow_multiplier.saturating_mul(followers)
            && followers < t.follow_rule_max_followers)
        || (!profile.has_biography() && posts == 0 && followers < t.empty_profile_max_followers)
        || (posts < t.low_post_max_posts && following > t.low_post_min_following)
}

/// Whether the actor looks like an organic account or a worthwhile business.
pub fn has_engagement_potential(profile: &ActorProfile, t: &EngagementThresholds) -> bool {
    let followers = profile.follower_count;

    let organic = (t.min_followers..=t.max_followers).contains(&followers)
        && profile.post_count > t.min_posts
        && profile.following_count < t.max_following_multiplier.saturating_mul(followers)
        && !profile.is_private;

    organic || (profile.is_business && followers > t.business_min_followers)
}

/// Additive, uncapped lead score.
pub fn lead_score(profile: &ActorProfile, w: &LeadWeights) -> i64 {
    let followers = profile.follower_count;
    let following = profile.following_count;
    let mut score = 0;

    if (w.mid_tier_min_followers..=w.mid_tier_max_followers).contains(&followers) {
        score += w.mid_tier_points;
    } else if followers > w.mid_tier_max_followers && followers <= w.upper_tier_max_followers {
        score += w.upper_tier_points;
    } else if followers > w.upper_tier_max_followers {
        score += w.top_tier_points;
    }

    if profile.is_business {
        score += w.business_points;
    }
    if profile.is_verified {
        score += w.verified_points;
    }
    if profile.has_external_url() {
        score += w.external_url_points;
    }
    if profile.has_biography() {
        score += w.biography_points;
    }
    if following > 0 && followers as f64 / following as f64 > w.min_follower_ratio {
        score += w.follower_ratio_points;
    }

    score
}

/// Whether a classified actor qualifies as a lead.
pub fn is_lead_candidate(classification: &Classification, config: &ClassifierConfig) -> bool {
    !classification.is_suspicious && classification.lead_score >= config.min_lead_score
}

/// Build a lead record, pulling contact details out of the biography.
pub fn extract_lead(profile: &ActorProfile, lead_score: i64) -> Lead {
    Lead {
        profile: profile.clone(),
        lead_score,
        email: find_email(&profile.biography),
        phone: find_phone(&profile.biography),
        external_url: profile
            .external_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
    }
}

/// First email address in free text.
pub fn find_email(text: &str) -> Option<String> {
    RE_EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// First phone-like number in free text, trimmed of trailing separators.
pub fn find_phone(text: &str) -> Option<String> {
    RE_PHONE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|candidate| candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_follow_ratio_boundary() {
        let bot = ActorProfile::new("1", "someone")
            .with_counts(49, 500)
            .with_posts(10)
            .with_biography("hi");
        assert!(classify(&bot, &config()).is_suspicious);

        let human = ActorProfile::new("2", "someone")
            .with_counts(51, 500)
            .with_posts(10)
            .with_biography("hi");
        assert!(!classify(&human, &config()).is_suspicious);
    }

    #[test]
    fn test_username_rules() {
        let long = ActorProfile::new("1", "a".repeat(26))
            .with_counts(500, 100)
            .with_posts(20)
            .with_biography("bio");
        assert!(classify(&long, &config()).is_suspicious);

        let exact = ActorProfile::new("1", "a".repeat(25))
            .with_counts(500, 100)
            .with_posts(20)
            .with_biography("bio");
        assert!(!classify(&exact, &config()).is_suspicious);

        let underscores = ActorProfile::new("1", "a_b_c_d_e_f")
            .with_counts(500, 100)
            .with_posts(20)
            .with_biography("bio");
        assert!(classify(&underscores, &config()).is_suspicious);
    }

    #[test]
    fn test_empty_profile_and_low_post_rules() {
        let empty = ActorProfile::new("1", "ghost").with_counts(9, 0);
        assert!(classify(&empty, &config()).is_suspicious);

        let low_posts = ActorProfile::new("2", "follower")
            .with_counts(5_000, 101)
            .with_posts(2)
            .with_biography("bio");
        assert!(classify(&low_posts, &config()).is_suspicious);
    }

    #[test]
    fn test_suspicion_boundaries() {
        let base = |username: &str| {
            ActorProfile::new("1", username)
                .with_counts(500, 100)
                .with_posts(20)
                .with_biography("bio")
        };
        assert!(!classify(&base("a_b_c_d_e"), &config()).is_suspicious);
        assert!(classify(&base("a_b_c_d_e_f"), &config()).is_suspicious);

        // Empty profile needs fewer than 10 followers
        let empty = |followers: u64| ActorProfile::new("2", "ghost").with_counts(followers, 0);
        assert!(!classify(&empty(10), &config()).is_suspicious);
        assert!(classify(&empty(9), &config()).is_suspicious);

        // Low posts needs posts < 3 and following > 100
        let low = |posts: u64, following: u64| {
            ActorProfile::new("3", "follower")
                .with_counts(5_000, following)
                .with_posts(posts)
                .with_biography("bio")
        };
        assert!(!classify(&low(3, 101), &config()).is_suspicious);
        assert!(!classify(&low(2, 100), &config()).is_suspicious);
        assert!(classify(&low(2, 101), &config()).is_suspicious);
    }

    #[test]
    fn test_engagement_potential_boundaries() {
        let organic = |followers: u64, following: u64, posts: u64| {
            let profile = ActorProfile::new("1", "gardener")
                .with_counts(followers, following)
                .with_posts(posts);
            classify(&profile, &config()).has_engagement_potential
        };

        // Follower range is inclusive at both ends
        assert!(!organic(99, 10, 6));
        assert!(organic(100, 10, 6));
        assert!(organic(50_000, 10, 6));
        assert!(!organic(50_001, 10, 6));

        // More than 5 posts
        assert!(!organic(800, 300, 5));
        assert!(organic(800, 300, 6));

        // Following strictly below 3x followers
        assert!(!organic(800, 2_400, 40));
        assert!(organic(800, 2_399, 40));

        let business = |followers: u64| {
            let profile = ActorProfile::new("2", "bakery")
                .with_counts(followers, 1_000)
                .business();
            classify(&profile, &config()).has_engagement_potential
        };
        assert!(!business(50));
        assert!(business(51));
    }

    #[test]
    fn test_engagement_potential() {
        let organic = ActorProfile::new("1", "gardener")
            .with_counts(800, 300)
            .with_posts(40);
        assert!(classify(&organic, &config()).has_engagement_potential);

        let private = organic.clone().private();
        assert!(!classify(&private, &config()).has_engagement_potential);

        let small_business = ActorProfile::new("2", "bakery")
            .with_counts(60, 1_000)
            .business();
        assert!(classify(&small_business, &config()).has_engagement_potential);

        let too_big = ActorProfile::new("3", "celebrity")
            .with_counts(50_001, 10)
            .with_posts(400);
        assert!(!classify(&too_big, &config()).has_engagement_potential);
    }

    #[test]
    fn test_lead_score_example() {
        let profile = ActorProfile::new("1", "studio")
            .with_counts(5_000, 6_000)
            .with_posts(50)
            .business()
            .verified()
            .with_external_url("https://studio.example")
            .with_biography("Design studio");

        assert_eq!(classify(&profile, &config()).lead_score, 13);
    }

    #[test]
    fn test_lead_score_tiers_and_ratio() {
        let w = LeadWeights::default();
        let at = |followers: u64| lead_score(&ActorProfile::new("1", "x").with_counts(followers, 0), &w);

        assert_eq!(at(999), 0);
        assert_eq!(at(1_000), 5);
        assert_eq!(at(10_000), 5);
        assert_eq!(at(10_001), 3);
        assert_eq!(at(50_000), 3);
        assert_eq!(at(50_001), 1);

        // Ratio must be strictly greater than one.
        let even = ActorProfile::new("1", "x").with_counts(200, 200);
        assert_eq!(lead_score(&even, &w), 0);
        let ahead = ActorProfile::new("1", "x").with_counts(201, 200);
        assert_eq!(lead_score(&ahead, &w), 2);
    }

    #[test]
    fn test_lead_candidate_requires_not_suspicious() {
        let config = config();
        let verdict = Classification {
            is_suspicious: true,
            has_engagement_potential: false,
            lead_score: 20,
        };
        assert!(!is_lead_candidate(&verdict, &config));

        let verdict = Classification {
            is_suspicious: false,
            ..verdict
        };
        assert!(is_lead_candidate(&verdict, &config));
    }

    #[test]
    fn test_contact_extraction() {
        let profile = ActorProfile::new("1", "shop")
            .with_biography("Orders: orders@shop.example | call +1 (612) 555-0142 today")
            .with_external_url("https://shop.example");

        let lead = extract_lead(&profile, 9);
        assert_eq!(lead.email.as_deref(), Some("orders@shop.example"));
        assert_eq!(lead.phone.as_deref(), Some("+1 (612) 555-0142"));
        assert_eq!(lead.external_url.as_deref(), Some("https://shop.example"));
        assert!(lead.has_contact());
    }

    #[test]
    fn test_short_numbers_are_not_phones() {
        assert!(find_phone("Est. 2019, 40 employees").is_none());
        assert!(find_email("no contact here").is_none());
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = ClassifierConfig::default().with_suspicion(SuspicionThresholds {
            max_username_len: 5,
            ..SuspicionThresholds::default()
        });
        let profile = ActorProfile::new("1", "longer_name")
            .with_counts(500, 100)
            .with_posts(20)
            .with_biography("bio");

        assert!(classify(&profile, &strict).is_suspicious);
        assert!(!classify(&profile, &config()).is_suspicious);
    }
}
