//! Per-request typed knowledge graph.
//!
//! Nodes live in a flat arena addressed by [`NodeId`]; edges are stored as an
//! adjacency list on the source node. Skill, title, industry and goal nodes are
//! shared across the whole graph, keyed by their normalized label, so two
//! profiles that list "Rust" and " rust " point at the same SKILL node.

use std::collections::HashMap;

use crate::models::{CandidateProfile, RequesterObjective, RequesterProfile};

/// Index of a node inside a [`KnowledgeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    User,
    Candidate,
    Skill,
    Title,
    Industry,
    Goal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    HasSkill,
    SeeksTitle,
    HasGoal,
    HasTitle,
    InIndustry,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Label as first seen in the request
    pub label: String,
    /// Normalized label used for deduplication and comparison
    pub key: String,
}

/// Lowercase, trim and collapse internal whitespace
pub fn normalize(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<Node>,
    adjacency: Vec<Vec<(EdgeKind, NodeId)>>,
    lookup: HashMap<(NodeKind, String), NodeId>,
    user: Option<NodeId>,
    edge_count: usize,
}

impl KnowledgeGraph {
    /// Build the graph for one request
    ///
    /// Blank labels are skipped. Callers are expected to have rejected
    /// duplicate candidate ids already; a repeated id reuses the first node.
    pub fn build(
        profile: &RequesterProfile,
        objective: &RequesterObjective,
        candidates: &[CandidateProfile],
    ) -> Self {
        let mut graph = Self::default();

        let user = graph.intern(NodeKind::User, &objective.person_id, &profile.current_role.title);
        graph.user = Some(user);

        for entry in &profile.top_skills {
            graph.link_label(user, EdgeKind::HasSkill, NodeKind::Skill, &entry.skill);
        }
        for title in objective.desired_titles() {
            graph.link_label(user, EdgeKind::SeeksTitle, NodeKind::Title, title);
        }
        for signal in &objective.success_signals {
            graph.link_label(user, EdgeKind::HasGoal, NodeKind::Goal, signal);
        }

        for candidate in candidates {
            let node = graph.intern(NodeKind::Candidate, &candidate.profile_id, &candidate.name);

            for skill in &candidate.skills {
                graph.link_label(node, EdgeKind::HasSkill, NodeKind::Skill, skill);
            }
            graph.link_label(node, EdgeKind::HasTitle, NodeKind::Title, &candidate.title);
            if let Some(industry) = &candidate.industry {
                graph.link_label(node, EdgeKind::InIndustry, NodeKind::Industry, industry);
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built knowledge graph"
        );

        graph
    }

    /// The single USER node
    pub fn user(&self) -> NodeId {
        // `build` always creates the user node first
        self.user.unwrap_or(NodeId(0))
    }

    pub fn candidate(&self, profile_id: &str) -> Option<NodeId> {
        self.lookup
            .get(&(NodeKind::Candidate, profile_id.to_string()))
            .copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Targets of `from`'s outgoing edges of the given kind, in insertion order
    pub fn neighbours(&self, from: NodeId, kind: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency[from.index()]
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, to)| *to)
    }

    pub fn has_edge(&self, from: NodeId, kind: EdgeKind, to: NodeId) -> bool {
        self.adjacency[from.index()]
            .iter()
            .any(|&(k, t)| k == kind && t == to)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    fn intern(&mut self, kind: NodeKind, key: &str, label: &str) -> NodeId {
        let key = match kind {
            // Identity nodes keep their raw id as key
            NodeKind::User | NodeKind::Candidate => key.to_string(),
            _ => normalize(key),
        };

        if let Some(&id) = self.lookup.get(&(kind, key.clone())) {
            return id;
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            label: label.trim().to_string(),
            key: key.clone(),
        });
        self.adjacency.push(Vec::new());
        self.lookup.insert((kind, key), id);
        id
    }

    fn link_label(&mut self, from: NodeId, edge: EdgeKind, kind: NodeKind, label: &str) {
        if label.trim().is_empty() {
            return;
        }
        let to = self.intern(kind, label, label);
        self.add_edge(from, edge, to);
    }

    fn add_edge(&mut self, from: NodeId, kind: EdgeKind, to: NodeId) {
        if self.has_edge(from, kind, to) {
            return;
        }
        self.adjacency[from.index()].push((kind, to));
        self.edge_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SkillEntry, TargetProfile};

    fn profile(skills: &[&str]) -> RequesterProfile {
        RequesterProfile {
            current_role: Role {
                title: "Founder".to_string(),
                company: None,
                location: None,
            },
            previous_roles: vec![],
            top_skills: skills
                .iter()
                .map(|s| SkillEntry {
                    skill: s.to_string(),
                    applied_in: None,
                })
                .collect(),
            solutions_offered: vec![],
            career_highlights: vec![],
        }
    }

    fn objective(titles: &[&str], signals: &[&str]) -> RequesterObjective {
        RequesterObjective {
            person_id: "me".to_string(),
            primary_goal: "Find security leaders".to_string(),
            secondary_goals: vec![],
            target_profiles: vec![TargetProfile {
                kind: "buyer".to_string(),
                titles: titles.iter().map(|t| t.to_string()).collect(),
                why: None,
            }],
            exclude: vec![],
            success_signals: signals.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn candidate(id: &str, title: &str, skills: &[&str], industry: Option<&str>) -> CandidateProfile {
        CandidateProfile {
            profile_id: id.to_string(),
            name: format!("Candidate {}", id),
            title: title.to_string(),
            company: None,
            industry: industry.map(str::to_string),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            summary: None,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Cloud   Security "), "cloud security");
        assert_eq!(normalize("CISO"), "ciso");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_labels_deduplicated_across_graph() {
        let graph = KnowledgeGraph::build(
            &profile(&["Rust", "Go"]),
            &objective(&["CTO"], &[]),
            &[
                candidate("a", "cto", &[" rust ", "Python"], Some("Fintech")),
                candidate("b", "Engineer", &["RUST"], Some("fintech")),
            ],
        );

        assert_eq!(graph.count_kind(NodeKind::User), 1);
        assert_eq!(graph.count_kind(NodeKind::Candidate), 2);
        // rust, go, python
        assert_eq!(graph.count_kind(NodeKind::Skill), 3);
        // cto, engineer
        assert_eq!(graph.count_kind(NodeKind::Title), 2);
        assert_eq!(graph.count_kind(NodeKind::Industry), 1);
    }

    #[test]
    fn test_edges_point_at_shared_nodes() {
        let graph = KnowledgeGraph::build(
            &profile(&["Rust"]),
            &objective(&["CTO"], &["open source"]),
            &[candidate("a", "CTO", &["rust"], None)],
        );

        let user = graph.user();
        let cand = graph.candidate("a").unwrap();
        let skill = graph.neighbours(user, EdgeKind::HasSkill).next().unwrap();
        let title = graph.neighbours(user, EdgeKind::SeeksTitle).next().unwrap();

        assert!(graph.has_edge(cand, EdgeKind::HasSkill, skill));
        assert!(graph.has_edge(cand, EdgeKind::HasTitle, title));
        assert_eq!(graph.neighbours(user, EdgeKind::HasGoal).count(), 1);
        assert_eq!(graph.node(skill).label, "Rust");
    }

    #[test]
    fn test_blank_labels_skipped() {
        let graph = KnowledgeGraph::build(
            &profile(&["  "]),
            &objective(&[], &[""]),
            &[candidate("a", "CTO", &[""], Some(" "))],
        );

        assert_eq!(graph.count_kind(NodeKind::Skill), 0);
        assert_eq!(graph.count_kind(NodeKind::Goal), 0);
        assert_eq!(graph.count_kind(NodeKind::Industry), 0);
        // one HAS_TITLE edge only
        assert_eq!(graph.edge_count(), 1);
    }
}
