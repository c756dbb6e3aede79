//! KG Matchmaker - hybrid candidate matching service
//!
//! Ranks a requester's network against their stated objective by blending a
//! knowledge-graph structural score with an embedding similarity score, and
//! explains each match with a sentence from a chain of text-generation backends.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchError, Matcher, MatcherConfig, TitleMatchPolicy};
pub use models::{
    CandidateProfile, MatchRequest, MatchResult, RequesterObjective, RequesterProfile,
    ScoringWeights, Tier, TieredMatches,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        assert_eq!(Tier::from_score(70.0), Tier::Hot);
        assert_eq!(ScoringWeights::default().semantic, 0.55);
    }
}
