// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateProfile, MatchResult, RequesterObjective, RequesterProfile, Role, ScoreComponents,
    ScoringWeights, SemanticScore, SkillEntry, StructuralScore, TargetProfile, Tier,
    TieredMatchResult, TieredMatches,
};
pub use requests::MatchRequest;
pub use responses::{ErrorResponse, HealthResponse, ReadyResponse};
