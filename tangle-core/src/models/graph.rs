use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A thought graph: concepts, the links between them, and a few takeaways.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphResult {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Emotion,
    Habit,
    Goal,
    Problem,
    Solution,
    /// Anything a model invents outside the five known categories.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Usually one of `causes`, `improves`, `worsens`, `relates_to`,
    /// `influences`, but free text is accepted.
    pub relation: String,
    pub weight: f64,
}

impl GraphResult {
    /// Edges whose `from` or `to` does not name a node in this graph.
    ///
    /// Model output is forwarded even when this is non-empty.
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.from.as_str()) || !ids.contains(e.to.as_str()))
            .collect()
    }

    /// Edges with a weight outside `[0, 1]`.
    pub fn out_of_range_weights(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| !(0.0..=1.0).contains(&e.weight))
            .collect()
    }
}
