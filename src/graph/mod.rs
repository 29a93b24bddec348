use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub const ROOT_NODE_ID: &str = "forest";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    pub id: String,
    pub label: String,
    pub subject: String,
    pub mastery_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeTree {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

/// Partial node update for PATCH; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub subject: Option<String>,
    pub mastery_level: Option<String>,
    pub parents: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// Process-wide concept graph: create/read/update, no deletion, reset on
/// restart. Owned by `AppState` and injected into handlers so tests can run
/// against a fresh instance.
pub struct GraphRepository {
    inner: RwLock<KnowledgeTree>,
}

impl GraphRepository {
    pub fn seeded() -> Self {
        Self {
            inner: RwLock::new(seed_tree()),
        }
    }

    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(KnowledgeTree {
                nodes: Vec::new(),
                edges: Vec::new(),
            }),
        }
    }

    /// The current tree with prereq edges derived from `parents` merged in
    /// front of the manually added edges.
    pub async fn tree(&self) -> KnowledgeTree {
        let guard = self.inner.read().await;
        let mut edges = derive_parent_edges(&guard.nodes);
        edges.extend(guard.edges.iter().cloned());
        KnowledgeTree {
            nodes: guard.nodes.clone(),
            edges,
        }
    }

    pub async fn nodes(&self) -> Vec<ConceptNode> {
        self.inner.read().await.nodes.clone()
    }

    /// Adds a node with a slugified-label id. Parents default to the root
    /// node when none are given.
    pub async fn add_node(
        &self,
        label: String,
        subject: String,
        parents: Option<Vec<String>>,
    ) -> ConceptNode {
        let parents = match parents {
            Some(list) if !list.is_empty() => list,
            _ => vec![ROOT_NODE_ID.to_string()],
        };
        let node = ConceptNode {
            id: slugify(&label),
            label,
            subject,
            mastery_level: "none".to_string(),
            parents: Some(parents),
            tags: None,
        };

        let mut guard = self.inner.write().await;
        guard.nodes.push(node.clone());
        node
    }

    pub async fn add_edge(&self, from: String, to: String, edge_type: String) -> ConceptEdge {
        let edge = ConceptEdge {
            id: format!("{from}-{to}"),
            from,
            to,
            edge_type,
        };

        let mut guard = self.inner.write().await;
        guard.edges.push(edge.clone());
        edge
    }

    /// Applies a partial update; `None` when the node does not exist.
    pub async fn update_node(&self, id: &str, updates: NodeUpdate) -> Option<ConceptNode> {
        let mut guard = self.inner.write().await;
        let node = guard.nodes.iter_mut().find(|n| n.id == id)?;

        if let Some(label) = updates.label {
            node.label = label;
        }
        if let Some(subject) = updates.subject {
            node.subject = subject;
        }
        if let Some(mastery_level) = updates.mastery_level {
            node.mastery_level = mastery_level;
        }
        if let Some(parents) = updates.parents {
            node.parents = Some(parents);
        }
        if let Some(tags) = updates.tags {
            node.tags = Some(tags);
        }

        Some(node.clone())
    }
}

pub fn slugify(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn derive_parent_edges(nodes: &[ConceptNode]) -> Vec<ConceptEdge> {
    let mut edges = Vec::new();
    for node in nodes {
        if let Some(parents) = &node.parents {
            for parent in parents {
                edges.push(ConceptEdge {
                    id: format!("{parent}-{}", node.id),
                    from: parent.clone(),
                    to: node.id.clone(),
                    edge_type: "prereq".to_string(),
                });
            }
        }
    }
    edges
}

fn node(id: &str, label: &str, subject: &str, parents: &[&str], tags: &[&str]) -> ConceptNode {
    ConceptNode {
        id: id.to_string(),
        label: label.to_string(),
        subject: subject.to_string(),
        mastery_level: "none".to_string(),
        parents: if parents.is_empty() {
            None
        } else {
            Some(parents.iter().map(|p| p.to_string()).collect())
        },
        tags: if tags.is_empty() {
            None
        } else {
            Some(tags.iter().map(|t| t.to_string()).collect())
        },
    }
}

fn seed_tree() -> KnowledgeTree {
    KnowledgeTree {
        nodes: vec![
            node(ROOT_NODE_ID, "Knowledge Forest", "Other", &[], &[]),
            node("math-root", "Mathematics", "Math", &[ROOT_NODE_ID], &[]),
            node("cs-root", "Computer Science", "CS", &[ROOT_NODE_ID], &[]),
            node("hist-root", "History", "History", &[ROOT_NODE_ID], &[]),
            node("chem-root", "Chemistry", "Chemistry", &[ROOT_NODE_ID], &[]),
            node("phys-root", "Physics", "Physics", &[ROOT_NODE_ID], &[]),
            node(
                "calc",
                "Calculus",
                "Math",
                &["math-root"],
                &["derivatives", "integrals"],
            ),
            node(
                "lin-alg",
                "Linear Algebra",
                "Math",
                &["math-root"],
                &["vectors", "matrices"],
            ),
            node(
                "nn",
                "Neural Networks",
                "CS",
                &["cs-root"],
                &["machine learning", "deep learning"],
            ),
            node(
                "cold-war",
                "Cold War",
                "History",
                &["hist-root"],
                &["20th century", "politics"],
            ),
        ],
        edges: vec![ConceptEdge {
            id: "lin-alg-nn".to_string(),
            from: "lin-alg".to_string(),
            to: "nn".to_string(),
            edge_type: "related".to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Quantum Mechanics"), "quantum-mechanics");
        assert_eq!(slugify("  Graph   Theory "), "graph-theory");
    }

    #[tokio::test]
    async fn empty_repository_grows_from_nothing() {
        let repo = GraphRepository::empty();
        assert!(repo.tree().await.nodes.is_empty());

        repo.add_node(
            "Calculus".to_string(),
            "Math".to_string(),
            Some(vec!["math-root".to_string()]),
        )
        .await;

        let tree = repo.tree().await;
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree
            .edges
            .iter()
            .any(|e| e.from == "math-root" && e.to == "calculus" && e.edge_type == "prereq"));
    }

    #[tokio::test]
    async fn add_node_defaults_parents_to_root() {
        let repo = GraphRepository::seeded();
        let added = repo
            .add_node("Group Theory".to_string(), "Math".to_string(), None)
            .await;
        assert_eq!(added.id, "group-theory");
        assert_eq!(added.parents, Some(vec![ROOT_NODE_ID.to_string()]));
        assert_eq!(added.mastery_level, "none");
    }

    #[tokio::test]
    async fn tree_merges_derived_and_manual_edges() {
        let repo = GraphRepository::seeded();
        let tree = repo.tree().await;

        // Every parent reference becomes a prereq edge.
        assert!(tree
            .edges
            .iter()
            .any(|e| e.from == "math-root" && e.to == "calc" && e.edge_type == "prereq"));
        // The seeded manual edge survives.
        assert!(tree
            .edges
            .iter()
            .any(|e| e.id == "lin-alg-nn" && e.edge_type == "related"));
    }

    #[tokio::test]
    async fn update_node_is_partial_and_reports_missing() {
        let repo = GraphRepository::seeded();
        let updated = repo
            .update_node(
                "calc",
                NodeUpdate {
                    mastery_level: Some("familiar".to_string()),
                    ..NodeUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.mastery_level, "familiar");
        assert_eq!(updated.label, "Calculus");

        assert!(repo.update_node("nope", NodeUpdate::default()).await.is_none());
    }
}
