use crate::models::{MatchResult, ScoringWeights, Tier, TieredMatchResult, TieredMatches};

pub const HOT_THRESHOLD: f64 = 70.0;
pub const WARM_THRESHOLD: f64 = 40.0;

/// Round to two decimal places
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Blend structural and semantic scores (both 0-100)
///
/// Formula:
/// blended = round2(
///     structural * weights.structural +   # knowledge-graph overlap
///     semantic * weights.semantic         # embedding similarity
/// )
pub fn blend_score(structural: f64, semantic: f64, weights: &ScoringWeights) -> f64 {
    round2(weights.structural * structural + weights.semantic * semantic)
}

impl Tier {
    /// HOT at 70 and above, WARM from 40 up to 70, COLD below 40
    pub fn from_score(score: f64) -> Self {
        if score >= HOT_THRESHOLD {
            Tier::Hot
        } else if score >= WARM_THRESHOLD {
            Tier::Warm
        } else {
            Tier::Cold
        }
    }
}

/// Split ranked results into tiers, keeping relative order inside each tier
pub fn partition_tiers(results: Vec<MatchResult>) -> TieredMatches {
    let mut tiers = TieredMatches::default();

    for result in results {
        let tier = Tier::from_score(result.score);
        let entry = TieredMatchResult { result, tier };
        match tier {
            Tier::Hot => tiers.hot.push(entry),
            Tier::Warm => tiers.warm.push(entry),
            Tier::Cold => tiers.cold.push(entry),
        }
    }

    tiers
}
