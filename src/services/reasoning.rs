//! Match-reason generation over an ordered chain of text backends.
//!
//! The chain is selected by [`ReasoningMode`]: every configured backend in
//! registration order (`auto`), a single named backend, or none at all. Each
//! attempt gets its own timeout and is never retried; any failure moves on to
//! the next backend. The deterministic template at the end of the chain cannot
//! fail, so [`ReasoningGenerator::generate`] always returns a sentence.

use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandidateProfile, RequesterObjective, RequesterProfile};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reason used when a candidate's generation task could not complete at all
pub const GENERIC_REASON: &str =
    "Candidate was ranked on profile similarity and shared attributes with your objective.";

/// Errors a single backend attempt can produce
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Malformed output: {0}")]
    Malformed(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Network text-generation backends, in default priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Self-hosted generation service
    Ollama,
    /// Remote hosted inference API
    HuggingFace,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::HuggingFace => write!(f, "hf"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReasoningMode {
    /// Try every backend in order
    #[default]
    Auto,
    /// Try only this backend
    Only(BackendKind),
    /// Go straight to the template
    Disabled,
}

#[derive(Debug, Error)]
#[error("unknown reasoning backend `{0}` (expected auto, ollama, hf or none)")]
pub struct UnknownModeError(String);

impl FromStr for ReasoningMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "ollama" | "local" => Ok(Self::Only(BackendKind::Ollama)),
            "hf" | "huggingface" => Ok(Self::Only(BackendKind::HuggingFace)),
            "none" | "off" | "template" => Ok(Self::Disabled),
            other => Err(UnknownModeError(other.to_string())),
        }
    }
}

/// A text-generation backend that may fail
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn generate(&self, prompt: &str) -> Result<String, ReasoningError>;
}

/// Requester-side facts shared by every prompt in a request
#[derive(Debug, Clone, Default)]
pub struct RequesterContext {
    pub primary_goal: String,
    pub desired_titles: Vec<String>,
    pub skills: Vec<String>,
    pub success_signals: Vec<String>,
}

impl RequesterContext {
    pub fn new(profile: &RequesterProfile, objective: &RequesterObjective) -> Self {
        Self {
            primary_goal: objective.primary_goal.clone(),
            desired_titles: objective.desired_titles().map(str::to_string).collect(),
            skills: profile.top_skills.iter().map(|s| s.skill.clone()).collect(),
            success_signals: objective.success_signals.clone(),
        }
    }
}

/// Everything needed to explain one candidate
#[derive(Debug, Clone)]
pub struct ReasonInput {
    pub candidate: CandidateProfile,
    pub signals: Vec<String>,
    pub structural_score: f64,
    pub semantic_score: f64,
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
}

pub fn build_prompt(requester: &RequesterContext, input: &ReasonInput) -> String {
    let candidate = &input.candidate;
    let signals = if input.signals.is_empty() {
        "none".to_string()
    } else {
        input.signals.join("; ")
    };

    format!(
        "<s>[INST]\n\
         You help professionals decide who in their network to contact. Using the context below, \
         write ONE concise sentence (at most 25 words) explaining why this candidate fits the \
         requester's objective. Be specific and do not mention the candidate's name.\n\n\
         REQUESTER\n  Goal: {goal}\n  Seeking: {titles}\n  Skills: {skills}\n  Success signals: {success}\n\n\
         CANDIDATE\n  Title: {title}\n  Company: {company}\n  Industry: {industry}\n  Skills: {cskills}\n  Summary: {summary}\n\n\
         GRAPH SIGNALS: {signals}\n\
         Structural score: {structural:.1}/100   Semantic score: {semantic:.1}/100\n\n\
         Reply with the sentence only.\n[/INST]",
        goal = requester.primary_goal,
        titles = requester.desired_titles.join(", "),
        skills = requester.skills.join(", "),
        success = requester.success_signals.join(", "),
        title = candidate.title,
        company = or_na(candidate.company.as_deref()),
        industry = or_na(candidate.industry.as_deref()),
        cskills = candidate.skills.join(", "),
        summary = or_na(candidate.summary.as_deref()),
        signals = signals,
        structural = input.structural_score,
        semantic = input.semantic_score,
    )
}

/// Reduce raw model output to a single sentence, or `None` if nothing usable remains
pub fn sanitize_output(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line
        .strip_prefix("Reason:")
        .or_else(|| line.strip_prefix("reason:"))
        .unwrap_or(line)
        .trim();
    let line = line
        .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201c}' | '\u{201d}'))
        .trim();

    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

fn qualitative_label(score: f64) -> &'static str {
    if score >= 70.0 {
        "Strong"
    } else if score >= 40.0 {
        "Moderate"
    } else {
        "Limited"
    }
}

/// Deterministic reason built from the signals and scores alone
pub fn template_reason(signals: &[String], structural_score: f64, semantic_score: f64) -> String {
    let combined = (structural_score + semantic_score) / 2.0;
    let label = qualitative_label(combined);

    match signals.first() {
        Some(top) => format!(
            "{} match based on {} with a combined alignment score of {:.0}/100.",
            label,
            top.to_lowercase(),
            combined
        ),
        None => format!(
            "{} semantic alignment with your objective, scoring {:.0}/100 on profile similarity.",
            label, semantic_score
        ),
    }
}

/// Generates one explanatory sentence per candidate
pub struct ReasoningGenerator {
    backends: Vec<Arc<dyn TextGenerator>>,
    mode: ReasoningMode,
    attempt_timeout: Duration,
}

impl ReasoningGenerator {
    /// `backends` are tried in the order given
    pub fn new(
        backends: Vec<Arc<dyn TextGenerator>>,
        mode: ReasoningMode,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            backends,
            mode,
            attempt_timeout,
        }
    }

    /// Generator that only ever uses the template
    pub fn template_only() -> Self {
        Self::new(Vec::new(), ReasoningMode::Disabled, DEFAULT_ATTEMPT_TIMEOUT)
    }

    /// Backends this generator will try, in order
    pub fn chain(&self) -> Vec<&Arc<dyn TextGenerator>> {
        self.backends
            .iter()
            .filter(|b| match self.mode {
                ReasoningMode::Auto => true,
                ReasoningMode::Only(kind) => b.kind() == kind,
                ReasoningMode::Disabled => false,
            })
            .collect()
    }

    pub async fn generate(&self, requester: &RequesterContext, input: &ReasonInput) -> String {
        let chain = self.chain();
        if !chain.is_empty() {
            let prompt = build_prompt(requester, input);
            for backend in chain {
                match self.attempt(backend.as_ref(), &prompt).await {
                    Ok(reason) => return reason,
                    Err(e) => tracing::warn!(
                        backend = %backend.kind(),
                        profile_id = %input.candidate.profile_id,
                        "Reasoning backend failed, moving on: {}",
                        e
                    ),
                }
            }
        }

        template_reason(&input.signals, input.structural_score, input.semantic_score)
    }

    async fn attempt(&self, backend: &dyn TextGenerator, prompt: &str) -> Result<String, ReasoningError> {
        let raw = tokio::time::timeout(self.attempt_timeout, backend.generate(prompt))
            .await
            .map_err(|_| ReasoningError::Timeout(self.attempt_timeout))??;

        sanitize_output(&raw).ok_or_else(|| ReasoningError::Malformed("empty output".into()))
    }
}
