use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::graph::{EdgeKind, KnowledgeGraph, NodeId};
use crate::models::{CandidateProfile, RequesterObjective, RequesterProfile, StructuralScore};

pub const SHARED_SKILL_POINTS: f64 = 15.0;
pub const TITLE_MATCH_POINTS: f64 = 20.0;
pub const GOAL_MATCH_POINTS: f64 = 10.0;
pub const MAX_STRUCTURAL_SCORE: f64 = 100.0;

/// How a candidate title is compared against the requester's desired titles
///
/// Both sides are normalized before comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleMatchPolicy {
    /// Labels must be identical
    Exact,
    /// Either label contains the other as whole words
    #[default]
    Substring,
    /// Substring, or one label is the initialism of the other ("ciso")
    Acronym,
}

impl TitleMatchPolicy {
    pub fn matches(&self, desired: &str, candidate: &str) -> bool {
        if desired.is_empty() || candidate.is_empty() {
            return false;
        }
        match self {
            Self::Exact => desired == candidate,
            Self::Substring => contains_term(candidate, desired) || contains_term(desired, candidate),
            Self::Acronym => {
                Self::Substring.matches(desired, candidate)
                    || is_initialism(desired, candidate)
                    || is_initialism(candidate, desired)
            }
        }
    }
}

/// True if `short` spells the first letters of the words in `long`
fn is_initialism(short: &str, long: &str) -> bool {
    let short: String = short.chars().filter(|c| c.is_alphanumeric()).collect();
    let initials: String = long
        .split(|c: char| !c.is_alphanumeric())
        .filter_map(|word| word.chars().next())
        .collect();
    initials.len() > 1 && short == initials
}

/// True if the words of `needle` appear contiguously among the words of `haystack`
fn contains_term(haystack: &str, needle: &str) -> bool {
    let words = |s: &str| -> Vec<String> {
        s.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    };
    let needle = words(needle);
    if needle.is_empty() {
        return false;
    }
    let haystack = words(haystack);
    haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Build the request graph and score every candidate against the requester
pub fn score_candidates(
    profile: &RequesterProfile,
    objective: &RequesterObjective,
    candidates: &[CandidateProfile],
    policy: TitleMatchPolicy,
) -> HashMap<String, StructuralScore> {
    let graph = KnowledgeGraph::build(profile, objective, candidates);

    candidates
        .iter()
        .filter_map(|candidate| {
            let node = graph.candidate(&candidate.profile_id)?;
            let summary = candidate
                .summary
                .as_deref()
                .map(crate::core::graph::normalize)
                .unwrap_or_default();
            Some((
                candidate.profile_id.clone(),
                score_candidate(&graph, node, &summary, policy),
            ))
        })
        .collect()
}

/// Score one candidate node
///
/// Rules are applied in a fixed order so signals read skills, then title, then goal.
pub fn score_candidate(
    graph: &KnowledgeGraph,
    candidate: NodeId,
    summary: &str,
    policy: TitleMatchPolicy,
) -> StructuralScore {
    let user = graph.user();
    let mut score = 0.0;
    let mut signals = Vec::new();

    for skill in graph.neighbours(user, EdgeKind::HasSkill) {
        if graph.has_edge(candidate, EdgeKind::HasSkill, skill) {
            score += SHARED_SKILL_POINTS;
            signals.push(format!("shared skill: {}", graph.node(skill).label));
        }
    }

    let candidate_titles: Vec<&str> = graph
        .neighbours(candidate, EdgeKind::HasTitle)
        .map(|t| graph.node(t).key.as_str())
        .collect();
    let title_hit = graph.neighbours(user, EdgeKind::SeeksTitle).find(|&desired| {
        let desired = graph.node(desired).key.as_str();
        candidate_titles
            .iter()
            .any(|candidate_title| policy.matches(desired, candidate_title))
    });
    if let Some(desired) = title_hit {
        score += TITLE_MATCH_POINTS;
        signals.push(format!("title match: {}", graph.node(desired).label));
    }

    let candidate_skills: Vec<&str> = graph
        .neighbours(candidate, EdgeKind::HasSkill)
        .map(|s| graph.node(s).key.as_str())
        .collect();
    let goal_hit = graph.neighbours(user, EdgeKind::HasGoal).find(|&goal| {
        let goal = graph.node(goal).key.as_str();
        contains_term(summary, goal)
            || candidate_skills
                .iter()
                .any(|skill| contains_term(skill, goal) || contains_term(goal, skill))
    });
    if let Some(goal) = goal_hit {
        score += GOAL_MATCH_POINTS;
        signals.push(format!("goal match: {}", graph.node(goal).label));
    }

    StructuralScore {
        score: f64::min(score, MAX_STRUCTURAL_SCORE),
        signals,
    }
}
