use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::core::{
    scoring::{blend_score, partition_tiers},
    semantic::rank_candidates,
    structural::{score_candidates, TitleMatchPolicy},
};
use crate::models::{MatchRequest, MatchResult, ScoreComponents, ScoringWeights, TieredMatches};
use crate::services::embedding::{EmbeddingError, EmbeddingRuntime};
use crate::services::reasoning::{
    template_reason, ReasonInput, ReasoningGenerator, RequesterContext, GENERIC_REASON,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline used when the configured timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(timeout: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Errors that abort a whole matching request
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Duplicate candidate id: {0}")]
    DuplicateCandidate(String),

    #[error("Semantic ranking failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Tunables for the matching pipeline
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub weights: ScoringWeights,
    pub title_policy: TitleMatchPolicy,
    /// Results below this blended score are dropped
    pub min_score: f64,
    /// Deadline for the whole reasoning fan-out
    pub request_timeout: Duration,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            title_policy: TitleMatchPolicy::default(),
            min_score: 0.0,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Knowledge-graph structural scoring
/// 2. Embedding similarity scoring and retrieval rank
/// 3. Weighted blend of both scores
/// 4. One reasoning task per candidate, joined under a single deadline
/// 5. Sort by blended score (stable, so ties keep input order)
#[derive(Clone)]
pub struct Matcher {
    config: MatcherConfig,
    embedding: Arc<EmbeddingRuntime>,
    reasoner: Arc<ReasoningGenerator>,
}

impl Matcher {
    pub fn new(
        config: MatcherConfig,
        embedding: Arc<EmbeddingRuntime>,
        reasoner: Arc<ReasoningGenerator>,
    ) -> Self {
        Self {
            config,
            embedding,
            reasoner,
        }
    }

    pub fn embedding(&self) -> &EmbeddingRuntime {
        &self.embedding
    }

    /// Rank every candidate in the request
    ///
    /// # Returns
    /// Results sorted by blended score descending. An empty candidate list
    /// yields an empty result. Reasoning backends never cause an error here;
    /// only duplicate ids and embedding failures do.
    pub async fn run(&self, request: &MatchRequest) -> Result<Vec<MatchResult>, MatchError> {
        if let Some(id) = request.duplicate_candidate_id() {
            return Err(MatchError::DuplicateCandidate(id.to_string()));
        }

        let span = tracing::info_span!(
            "match",
            request_id = %uuid::Uuid::new_v4(),
            person_id = %request.user_objective.person_id,
            candidates = request.network_profiles.len(),
        );
        self.run_pipeline(request).instrument(span).await
    }

    /// Rank the request and partition the results into hot / warm / cold tiers
    pub async fn run_tiered(&self, request: &MatchRequest) -> Result<TieredMatches, MatchError> {
        let results = self.run(request).await?;
        Ok(partition_tiers(results))
    }

    async fn run_pipeline(&self, request: &MatchRequest) -> Result<Vec<MatchResult>, MatchError> {
        let candidates = &request.network_profiles;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();

        tracing::debug!("Stage 1: knowledge graph scoring");
        let mut structural = score_candidates(
            &request.user_profile,
            &request.user_objective,
            candidates,
            self.config.title_policy,
        );

        tracing::debug!("Stage 2: semantic ranking");
        let semantic = rank_candidates(
            self.embedding.embedder(),
            &request.user_objective,
            candidates,
        )
        .await
        .map_err(|e| {
            tracing::error!("Embedding failed, aborting request: {}", e);
            e
        })?;

        let mut components = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let semantic = semantic.get(&candidate.profile_id).copied().ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!(
                    "no semantic score for {}",
                    candidate.profile_id
                ))
            })?;
            components.push(ScoreComponents {
                structural: structural.remove(&candidate.profile_id).unwrap_or_default(),
                semantic,
            });
        }

        tracing::debug!("Stage 3: generating reasons");
        let requester = Arc::new(RequesterContext::new(
            &request.user_profile,
            &request.user_objective,
        ));
        let inputs: Vec<ReasonInput> = candidates
            .iter()
            .zip(&components)
            .map(|(candidate, c)| ReasonInput {
                candidate: candidate.clone(),
                signals: c.structural.signals.clone(),
                structural_score: c.structural.score,
                semantic_score: c.semantic.score,
            })
            .collect();
        let reasons = self.generate_reasons(requester, &inputs).await;

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .zip(components)
            .zip(reasons)
            .map(|((candidate, c), reason)| MatchResult {
                profile_id: candidate.profile_id.clone(),
                name: candidate.name.clone(),
                score: blend_score(c.structural.score, c.semantic.score, &self.config.weights),
                reason,
                kg_signals: c.structural.signals,
                retrieval_rank: c.semantic.rank,
            })
            .filter(|r| r.score >= self.config.min_score)
            .collect();

        // Stable sort keeps input order for equal scores
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::info!(
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Matching complete"
        );

        Ok(results)
    }

    /// Fan out one reasoning task per candidate and join them under the request deadline
    ///
    /// The returned reasons line up with `inputs` regardless of completion order.
    /// Candidates whose task misses the deadline get the template reason; a task
    /// that panicked gets [`GENERIC_REASON`].
    async fn generate_reasons(
        &self,
        requester: Arc<RequesterContext>,
        inputs: &[ReasonInput],
    ) -> Vec<String> {
        let deadline = deadline_after(self.config.request_timeout);
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::with_capacity(inputs.len());

        for (index, input) in inputs.iter().cloned().enumerate() {
            let reasoner = Arc::clone(&self.reasoner);
            let requester = Arc::clone(&requester);
            let handle = tasks.spawn(
                async move { (index, reasoner.generate(&requester, &input).await) }
                    .in_current_span(),
            );
            task_index.insert(handle.id(), index);
        }

        let mut reasons: Vec<Option<String>> = vec![None; inputs.len()];
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, reason)))) => reasons[index] = Some(reason),
                Ok(Some(Err(e))) => {
                    tracing::error!("Reasoning task failed: {}", e);
                    if let Some(&index) = task_index.get(&e.id()) {
                        reasons[index] = Some(GENERIC_REASON.to_string());
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = tasks.len(),
                        timeout_secs = self.config.request_timeout.as_secs_f64(),
                        "Reasoning deadline reached, using template for pending candidates"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        reasons
            .into_iter()
            .zip(inputs)
            .map(|(reason, input)| {
                reason.unwrap_or_else(|| {
                    template_reason(&input.signals, input.structural_score, input.semantic_score)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CandidateProfile, RequesterObjective, RequesterProfile, Role, SkillEntry, TargetProfile,
    };
    use crate::services::embedding::{Embedder, HashingEmbedder};
    use crate::services::reasoning::{BackendKind, ReasoningError, ReasoningMode, TextGenerator};
    use async_trait::async_trait;

    struct Sleepy;

    #[async_trait]
    impl TextGenerator for Sleepy {
        fn kind(&self) -> BackendKind {
            BackendKind::Ollama
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ReasoningError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("never".to_string())
        }
    }

    struct Panicky;

    #[async_trait]
    impl TextGenerator for Panicky {
        fn kind(&self) -> BackendKind {
            BackendKind::Ollama
        }

        async fn generate(&self, prompt: &str) -> Result<String, ReasoningError> {
            if prompt.contains("Title: Explodes") {
                panic!("backend bug");
            }
            Ok("Fine.".to_string())
        }
    }

    struct Unavailable;

    #[async_trait]
    impl Embedder for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Unavailable("offline".to_string()))
        }
    }

    fn request(candidates: Vec<CandidateProfile>) -> MatchRequest {
        MatchRequest {
            user_profile: RequesterProfile {
                current_role: Role {
                    title: "Founder".to_string(),
                    company: None,
                    location: None,
                },
                previous_roles: vec![],
                top_skills: vec![SkillEntry {
                    skill: "Security".to_string(),
                    applied_in: None,
                }],
                solutions_offered: vec![],
                career_highlights: vec![],
            },
            user_objective: RequesterObjective {
                person_id: "me".to_string(),
                primary_goal: "Sell security tooling".to_string(),
                secondary_goals: vec![],
                target_profiles: vec![TargetProfile {
                    kind: "buyer".to_string(),
                    titles: vec!["CISO".to_string()],
                    why: None,
                }],
                exclude: vec![],
                success_signals: vec![],
            },
            network_profiles: candidates,
        }
    }

    fn candidate(id: &str, title: &str, skills: &[&str]) -> CandidateProfile {
        CandidateProfile {
            profile_id: id.to_string(),
            name: format!("Person {}", id),
            title: title.to_string(),
            company: None,
            industry: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            summary: None,
        }
    }

    fn matcher(reasoner: ReasoningGenerator, config: MatcherConfig) -> Matcher {
        Matcher::new(
            config,
            Arc::new(EmbeddingRuntime::new(Arc::new(HashingEmbedder::default()))),
            Arc::new(reasoner),
        )
    }

    #[tokio::test]
    async fn test_empty_request_returns_empty() {
        let m = matcher(ReasoningGenerator::template_only(), MatcherConfig::default());
        let results = m.run(&request(vec![])).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let m = matcher(ReasoningGenerator::template_only(), MatcherConfig::default());
        let err = m
            .run(&request(vec![candidate("a", "CTO", &[]), candidate("a", "CEO", &[])]))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::DuplicateCandidate(id) if id == "a"));
    }

    #[tokio::test]
    async fn test_embedding_failure_fails_request() {
        let m = Matcher::new(
            MatcherConfig::default(),
            Arc::new(EmbeddingRuntime::new(Arc::new(Unavailable))),
            Arc::new(ReasoningGenerator::template_only()),
        );
        let err = m.run(&request(vec![candidate("a", "CISO", &[])])).await.unwrap_err();
        assert!(matches!(err, MatchError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_results_sorted_and_blended() {
        let m = matcher(ReasoningGenerator::template_only(), MatcherConfig::default());
        let results = m
            .run(&request(vec![
                candidate("low", "Chef", &[]),
                candidate("high", "CISO", &["Security"]),
            ]))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].profile_id, "high");
        assert!(results[0].score >= results[1].score);
        assert_eq!(
            results[0].kg_signals,
            vec!["shared skill: Security", "title match: CISO"]
        );
        for r in &results {
            assert!(!r.reason.is_empty());
            assert_eq!(r.score, (r.score * 100.0).round() / 100.0);
        }
    }

    #[tokio::test]
    async fn test_min_score_filters_results() {
        let config = MatcherConfig {
            min_score: 101.0,
            ..MatcherConfig::default()
        };
        let m = matcher(ReasoningGenerator::template_only(), config);
        let results = m.run(&request(vec![candidate("a", "CISO", &[])])).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_falls_back_to_template() {
        let config = MatcherConfig {
            request_timeout: Duration::from_millis(100),
            ..MatcherConfig::default()
        };
        let reasoner = ReasoningGenerator::new(
            vec![Arc::new(Sleepy) as Arc<dyn TextGenerator>],
            ReasoningMode::Auto,
            Duration::from_secs(30),
        );
        let m = matcher(reasoner, config);

        let results = m
            .run(&request(vec![candidate("a", "CISO", &["Security"])]))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].reason.contains("shared skill: security"));
    }

    #[tokio::test]
    async fn test_unbounded_timeout_does_not_overflow() {
        let config = MatcherConfig {
            request_timeout: Duration::from_secs(u64::MAX),
            ..MatcherConfig::default()
        };
        let m = matcher(ReasoningGenerator::template_only(), config);

        let results = m
            .run(&request(vec![candidate("a", "CISO", &["Security"])]))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].reason.is_empty());
    }

    #[test]
    fn test_deadline_after_saturates() {
        let now = tokio::time::Instant::now();
        assert!(deadline_after(Duration::from_secs(u64::MAX)) > now + Duration::from_secs(86400));
        assert!(deadline_after(Duration::from_secs(1)) <= tokio::time::Instant::now() + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_panicking_task_keeps_candidate() {
        let reasoner = ReasoningGenerator::new(
            vec![Arc::new(Panicky) as Arc<dyn TextGenerator>],
            ReasoningMode::Auto,
            Duration::from_secs(5),
        );
        let m = matcher(reasoner, MatcherConfig::default());

        let results = m
            .run(&request(vec![
                candidate("ok", "CISO", &[]),
                candidate("bad", "Explodes", &[]),
            ]))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        let bad = results.iter().find(|r| r.profile_id == "bad").unwrap();
        let ok = results.iter().find(|r| r.profile_id == "ok").unwrap();
        assert_eq!(bad.reason, GENERIC_REASON);
        assert_eq!(ok.reason, "Fine.");
    }
}
