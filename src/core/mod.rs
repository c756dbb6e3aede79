// Core algorithm exports
pub mod graph;
pub mod matcher;
pub mod scoring;
pub mod semantic;
pub mod structural;

pub use graph::{normalize, EdgeKind, KnowledgeGraph, NodeId, NodeKind};
pub use matcher::{MatchError, Matcher, MatcherConfig};
pub use scoring::{blend_score, partition_tiers, round2};
pub use semantic::{cosine_similarity, rank_candidates, similarity_to_score};
pub use structural::{score_candidates, TitleMatchPolicy};
