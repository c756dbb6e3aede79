use futures::future::try_join_all;
use std::collections::HashMap;

use crate::models::{CandidateProfile, RequesterObjective, SemanticScore};
use crate::services::embedding::{Embedder, EmbeddingError};

/// Synthesize the requester's intent into one query text
///
/// Uses the primary goal, secondary goals, target-profile rationale and
/// success signals, joined as labelled sentences.
pub fn requester_intent_text(objective: &RequesterObjective) -> String {
    let mut parts = vec![format!("Goal: {}", objective.primary_goal.trim())];

    if !objective.secondary_goals.is_empty() {
        parts.push(format!("Also: {}", objective.secondary_goals.join(", ")));
    }
    for target in &objective.target_profiles {
        match target.why.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
            Some(why) => parts.push(format!("Seeking {}: {}", target.titles.join(", "), why)),
            None => parts.push(format!("Seeking {}", target.titles.join(", "))),
        }
    }
    if !objective.success_signals.is_empty() {
        parts.push(format!(
            "Success signals: {}",
            objective.success_signals.join(", ")
        ));
    }

    parts.join(". ")
}

/// Descriptive text for one candidate: title, company, industry, skills, summary
pub fn candidate_text(candidate: &CandidateProfile) -> String {
    let mut parts = vec![format!("Title: {}", candidate.title)];

    if let Some(company) = candidate.company.as_deref().filter(|c| !c.trim().is_empty()) {
        parts.push(format!("Company: {}", company));
    }
    if let Some(industry) = candidate.industry.as_deref().filter(|i| !i.trim().is_empty()) {
        parts.push(format!("Industry: {}", industry));
    }
    if !candidate.skills.is_empty() {
        parts.push(format!("Skills: {}", candidate.skills.join(", ")));
    }
    if let Some(summary) = candidate.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("Summary: {}", summary));
    }

    parts.join(". ")
}

/// Cosine similarity in [-1, 1]
///
/// A zero-length vector has no direction and is treated as orthogonal (0.0).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Linear rescale of a cosine similarity onto the 0-100 score range
#[inline]
pub fn similarity_to_score(similarity: f64) -> f64 {
    ((similarity + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0)
}

/// 1-based ranks by descending similarity, ties kept in input order
pub fn rank_by_similarity(similarities: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..similarities.len()).collect();
    // sort_by is stable, so equal similarities keep input order
    order.sort_by(|&a, &b| {
        similarities[b]
            .partial_cmp(&similarities[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0; similarities.len()];
    for (position, index) in order.into_iter().enumerate() {
        ranks[index] = position + 1;
    }
    ranks
}

/// Embed the requester intent and every candidate, then score and rank them
///
/// Any embedding failure aborts the whole ranking; no candidate is given a
/// placeholder score.
pub async fn rank_candidates(
    embedder: &dyn Embedder,
    objective: &RequesterObjective,
    candidates: &[CandidateProfile],
) -> Result<HashMap<String, SemanticScore>, EmbeddingError> {
    if candidates.is_empty() {
        return Ok(HashMap::new());
    }

    let query_text = requester_intent_text(objective);
    let documents: Vec<String> = candidates.iter().map(candidate_text).collect();

    let query = embedder.embed(&query_text).await?;
    let vectors = try_join_all(documents.iter().map(|doc| embedder.embed(doc))).await?;

    let similarities = vectors
        .iter()
        .map(|v| cosine_similarity(&query, v))
        .collect::<Result<Vec<f64>, EmbeddingError>>()?;
    let ranks = rank_by_similarity(&similarities);

    tracing::debug!(
        embedder = embedder.name(),
        candidates = candidates.len(),
        "Semantic ranking complete"
    );

    Ok(candidates
        .iter()
        .zip(similarities.iter().zip(ranks))
        .map(|(candidate, (&similarity, rank))| {
            (
                candidate.profile_id.clone(),
                SemanticScore {
                    score: similarity_to_score(similarity),
                    similarity,
                    rank,
                },
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TargetProfile;
    use crate::services::embedding::HashingEmbedder;
    use async_trait::async_trait;

    /// Embeds each text as a fixed vector looked up by a keyword it contains
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn name(&self) -> &str {
            "keyword"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let v = if text.contains("Goal:") {
                vec![1.0, 0.0]
            } else if text.contains("Security") {
                vec![1.0, 0.0]
            } else if text.contains("Finance") {
                vec![0.0, 1.0]
            } else if text.contains("Opposite") {
                vec![-1.0, 0.0]
            } else {
                return Err(EmbeddingError::Unavailable("unexpected text".into()));
            };
            Ok(v)
        }
    }

    fn objective() -> RequesterObjective {
        RequesterObjective {
            person_id: "me".to_string(),
            primary_goal: "Meet security leaders".to_string(),
            secondary_goals: vec!["Hire".to_string()],
            target_profiles: vec![TargetProfile {
                kind: "buyer".to_string(),
                titles: vec!["CISO".to_string()],
                why: Some("They own budget".to_string()),
            }],
            exclude: vec![],
            success_signals: vec!["SOC 2".to_string()],
        }
    }

    fn candidate(id: &str, title: &str) -> CandidateProfile {
        CandidateProfile {
            profile_id: id.to_string(),
            name: format!("Name {}", id),
            title: title.to_string(),
            company: None,
            industry: None,
            skills: vec![],
            summary: None,
        }
    }

    #[test]
    fn test_intent_text_includes_objective_fields() {
        let text = requester_intent_text(&objective());
        assert_eq!(
            text,
            "Goal: Meet security leaders. Also: Hire. Seeking CISO: They own budget. Success signals: SOC 2"
        );
    }

    #[test]
    fn test_candidate_text_skips_empty_fields() {
        let mut c = candidate("a", "CTO");
        c.skills = vec!["Rust".to_string(), "Go".to_string()];
        c.company = Some(" ".to_string());
        assert_eq!(candidate_text(&c), "Title: CTO. Skills: Rust, Go");
    }

    #[test]
    fn test_similarity_rescaling() {
        assert_eq!(similarity_to_score(1.0), 100.0);
        assert_eq!(similarity_to_score(0.0), 50.0);
        assert_eq!(similarity_to_score(-1.0), 0.0);
        assert_eq!(similarity_to_score(1.5), 100.0);
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        assert_eq!(rank_by_similarity(&[0.2, 0.9, 0.2, 0.5]), vec![3, 1, 4, 2]);
        assert_eq!(rank_by_similarity(&[]), Vec::<usize>::new());
        assert_eq!(rank_by_similarity(&[0.0]), vec![1]);
    }

    #[tokio::test]
    async fn test_rank_candidates_orders_by_similarity() {
        let candidates = vec![
            candidate("fin", "Finance"),
            candidate("sec", "Security"),
            candidate("opp", "Opposite"),
        ];

        let scores = rank_candidates(&KeywordEmbedder, &objective(), &candidates)
            .await
            .unwrap();

        assert_eq!(scores["sec"].rank, 1);
        assert_eq!(scores["sec"].score, 100.0);
        assert_eq!(scores["fin"].rank, 2);
        assert_eq!(scores["fin"].score, 50.0);
        assert_eq!(scores["opp"].rank, 3);
        assert_eq!(scores["opp"].score, 0.0);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_surfaced() {
        let candidates = vec![candidate("sec", "Security"), candidate("x", "Unknown")];

        let result = rank_candidates(&KeywordEmbedder, &objective(), &candidates).await;
        assert!(matches!(result, Err(EmbeddingError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_zero_and_one_candidate() {
        let embedder = HashingEmbedder::default();

        let empty = rank_candidates(&embedder, &objective(), &[]).await.unwrap();
        assert!(empty.is_empty());

        let one = rank_candidates(&embedder, &objective(), &[candidate("a", "CISO")])
            .await
            .unwrap();
        assert_eq!(one["a"].rank, 1);
        assert!((0.0..=100.0).contains(&one["a"].score));
    }
}
