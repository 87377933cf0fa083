/// Petgraph-backed view of a workflow definition
///
/// Builds a DiGraph with node ids mapped to graph indices so the engine can
/// look up nodes and their outgoing edges cheaply during traversal. Unlike a
/// DAG pipeline, no topological order is computed here; cycles are legal and
/// the engine bounds them with its step ceiling.

use crate::workflow::types::{WorkflowDefinition, WorkflowEdge, WorkflowNode};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// In-run graph representation with id ↔ index mappings
#[derive(Debug)]
pub struct WorkflowGraph {
    graph: DiGraph<WorkflowNode, WorkflowEdge>,
    node_indices: HashMap<String, NodeIndex>,
}

impl WorkflowGraph {
    /// Build the graph from a workflow definition
    ///
    /// Edges referencing unknown node ids are skipped with a warning instead
    /// of failing the build; the traversal tolerates dangling references.
    pub fn build(definition: &WorkflowDefinition) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &definition.nodes {
            let index = graph.add_node(node.clone());
            node_indices.insert(node.id.clone(), index);
        }

        for edge in &definition.edges {
            match (node_indices.get(&edge.source), node_indices.get(&edge.target)) {
                (Some(&from), Some(&to)) => {
                    graph.add_edge(from, to, edge.clone());
                }
                _ => {
                    tracing::warn!(
                        "⚠️ Edge '{}' references unknown node ({} → {}), skipping",
                        edge.id,
                        edge.source,
                        edge.target
                    );
                }
            }
        }

        Self { graph, node_indices }
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.node_indices.get(id).map(|&index| &self.graph[index])
    }

    /// Outgoing edges of a node, in definition order
    pub fn outgoing(&self, id: &str) -> Vec<&WorkflowEdge> {
        let Some(&index) = self.node_indices.get(id) else {
            return Vec::new();
        };
        // petgraph yields outgoing edges newest-first; reverse to restore
        // the edge list's order, which the frontier ordering contract needs.
        let mut edges: Vec<&WorkflowEdge> = self
            .graph
            .edges(index)
            .map(|edge| edge.weight())
            .collect();
        edges.reverse();
        edges
    }

    /// Number of nodes in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::{NodeData, NodeType};

    fn node(id: &str) -> WorkflowNode {
        WorkflowNode {
            id: id.to_string(),
            node_type: NodeType::Set,
            position: None,
            data: NodeData::default(),
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> WorkflowEdge {
        WorkflowEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
        }
    }

    #[test]
    fn outgoing_edges_keep_definition_order() {
        let definition = WorkflowDefinition {
            nodes: vec![node("a"), node("b"), node("c"), node("d")],
            edges: vec![edge("e1", "a", "b"), edge("e2", "a", "c"), edge("e3", "a", "d")],
        };
        let graph = WorkflowGraph::build(&definition);
        let targets: Vec<&str> = graph.outgoing("a").iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c", "d"]);
    }

    #[test]
    fn dangling_edge_is_skipped() {
        let definition = WorkflowDefinition {
            nodes: vec![node("a")],
            edges: vec![edge("e1", "a", "ghost")],
        };
        let graph = WorkflowGraph::build(&definition);
        assert!(graph.outgoing("a").is_empty());
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node("ghost").is_none());
    }
}
