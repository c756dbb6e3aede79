use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur while computing embeddings
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding backend unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Text embedding capability
///
/// Implementations must be deterministic for identical input and must fail
/// loudly rather than return a placeholder vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Offline feature-hashing embedder
///
/// Each lowercase word and adjacent word pair is hashed into a signed bucket,
/// then the vector is L2-normalized. Texts that share vocabulary get a
/// positive cosine similarity, which is enough for local runs and tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

pub const DEFAULT_HASHING_DIMENSION: usize = 384;

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, feature: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let hash = hasher.finish();
        let index = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        for word in &words {
            let (i, sign) = self.bucket(word);
            vector[i] += sign;
        }
        for pair in words.windows(2) {
            let (i, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            vector[i] += 0.5 * sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

/// Process-wide embedding resource
///
/// Built once at startup and shared read-only between requests. The warm-up
/// outcome is written exactly once; nothing else about the runtime changes
/// after construction.
pub struct EmbeddingRuntime {
    embedder: Arc<dyn Embedder>,
    warmed: OnceLock<usize>,
}

impl EmbeddingRuntime {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            warmed: OnceLock::new(),
        }
    }

    /// Run a probe embedding and mark the runtime ready on success
    ///
    /// Returns the embedding dimension. Calling this again after a successful
    /// warm-up is a no-op.
    pub async fn warm_up(&self) -> Result<usize, EmbeddingError> {
        if let Some(dimension) = self.warmed.get() {
            return Ok(*dimension);
        }

        let started = Instant::now();
        let probe = self.embedder.embed("warm-up").await?;
        if probe.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "warm-up produced an empty vector".to_string(),
            ));
        }

        let dimension = *self.warmed.get_or_init(|| probe.len());
        tracing::info!(
            embedder = self.embedder.name(),
            dimension,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Embedding backend warmed up"
        );
        Ok(dimension)
    }

    pub fn is_ready(&self) -> bool {
        self.warmed.get().is_some()
    }

    /// Dimension observed during warm-up
    pub fn dimension(&self) -> Option<usize> {
        self.warmed.get().copied()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }
}
