use serde::{Deserialize, Serialize};
use validator::Validate;

/// A role held by the requester (current or previous)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Role {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A skill the requester leads with, plus where it was applied
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SkillEntry {
    #[validate(length(min = 1))]
    pub skill: String,
    #[serde(default)]
    pub applied_in: Option<String>,
}

/// Profile of the person asking for matches
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequesterProfile {
    #[validate(nested)]
    pub current_role: Role,
    #[serde(default)]
    pub previous_roles: Vec<Role>,
    #[serde(default)]
    #[validate(nested)]
    pub top_skills: Vec<SkillEntry>,
    #[serde(default)]
    pub solutions_offered: Vec<String>,
    #[serde(default)]
    pub career_highlights: Vec<String>,
}

/// A kind of profile the requester wants to meet
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetProfile {
    #[serde(rename = "type")]
    pub kind: String,
    pub titles: Vec<String>,
    #[serde(default)]
    pub why: Option<String>,
}

/// What the requester is trying to achieve
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequesterObjective {
    #[validate(length(min = 1))]
    pub person_id: String,
    #[validate(length(min = 1))]
    pub primary_goal: String,
    #[serde(default)]
    pub secondary_goals: Vec<String>,
    #[validate(nested)]
    pub target_profiles: Vec<TargetProfile>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub success_signals: Vec<String>,
}

impl RequesterObjective {
    /// All desired titles across target profiles, in declaration order
    pub fn desired_titles(&self) -> impl Iterator<Item = &str> {
        self.target_profiles
            .iter()
            .flat_map(|tp| tp.titles.iter().map(String::as_str))
    }
}

/// A profile from the requester's network being ranked
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CandidateProfile {
    #[validate(length(min = 1))]
    pub profile_id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Structural half of a candidate's score components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralScore {
    pub score: f64,
    pub signals: Vec<String>,
}

/// Semantic half of a candidate's score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticScore {
    pub score: f64,
    pub similarity: f64,
    /// 1-based position by similarity, ties kept in input order
    pub rank: usize,
}

/// Everything the pipeline knows about one candidate before reasoning
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComponents {
    pub structural: StructuralScore,
    pub semantic: SemanticScore,
}

/// Blend weights for the structural and semantic scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub structural: f64,
    pub semantic: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            structural: 0.45,
            semantic: 0.55,
        }
    }
}

/// Ranked output record for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub profile_id: String,
    pub name: String,
    pub score: f64,
    pub reason: String,
    pub kg_signals: Vec<String>,
    pub retrieval_rank: usize,
}

/// Recommendation tier derived from the blended score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

/// A match result annotated with its tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredMatchResult {
    #[serde(flatten)]
    pub result: MatchResult,
    pub tier: Tier,
}

/// Results partitioned by tier, each list in ranked order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredMatches {
    pub hot: Vec<TieredMatchResult>,
    pub warm: Vec<TieredMatchResult>,
    pub cold: Vec<TieredMatchResult>,
}

impl TieredMatches {
    pub fn len(&self) -> usize {
        self.hot.len() + self.warm.len() + self.cold.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
