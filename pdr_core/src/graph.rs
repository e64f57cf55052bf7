//! The walkable-path graph: nodes, edges, adjacency.
//!
//! # Model
//! - Undirected, possibly disconnected. Self-loops are forbidden; parallel
//!   edges are representable but normal construction never creates them.
//! - Stored as two id-keyed maps, never as direct pointers. Each node lists
//!   its incident edge ids; each edge names its two endpoint nodes.
//! - Ids are sequential u64 newtypes allocated per graph instance. The id
//!   order doubles as a stable insertion-order tie-break for searches.
//! - The path manager exclusively owns the graph; all mutation goes through
//!   its operations.

use crate::types::{EdgeId, NodeId, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A graph vertex at a fixed 2-D position.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec2,
    /// Ids of the edges incident to this node.
    pub edges: Vec<EdgeId>,
}

/// An undirected straight-line edge between two nodes.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub id: EdgeId,
    pub start: NodeId,
    pub end: NodeId,
}

impl Edge {
    /// The endpoint opposite `n`, or None when `n` is not an endpoint.
    pub fn other(&self, n: NodeId) -> Option<NodeId> {
        if n == self.start {
            Some(self.end)
        } else if n == self.end {
            Some(self.start)
        } else {
            None
        }
    }
}

/// The user-constructed walkable-path graph.
pub struct PathGraph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl PathGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            next_node_id: 0,
            next_edge_id: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Endpoint positions of an edge.
    pub fn edge_segment(&self, id: EdgeId) -> Option<(Vec2, Vec2)> {
        let edge = self.edges.get(&id)?;
        let s = self.nodes.get(&edge.start)?.position;
        let e = self.nodes.get(&edge.end)?.position;
        Some((s, e))
    }

    /// Euclidean length of an edge.
    pub fn edge_length(&self, id: EdgeId) -> Option<f64> {
        let (s, e) = self.edge_segment(id)?;
        Some((e - s).norm())
    }

    /// Insert a new node; returns its id.
    pub fn add_node(&mut self, position: Vec2) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                position,
                edges: Vec::new(),
            },
        );
        id
    }

    /// Insert an undirected edge between two existing nodes.
    /// Returns None for self-loops or missing endpoints; no mutation then.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        if a == b || !self.nodes.contains_key(&a) || !self.nodes.contains_key(&b) {
            return None;
        }
        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                start: a,
                end: b,
            },
        );
        // Both incidence lists name the new edge.
        self.nodes.get_mut(&a).expect("endpoint a exists").edges.push(id);
        self.nodes.get_mut(&b).expect("endpoint b exists").edges.push(id);
        Some(id)
    }

    /// Remove an edge and scrub it from both endpoints' incidence lists.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        for endpoint in [edge.start, edge.end] {
            if let Some(node) = self.nodes.get_mut(&endpoint) {
                node.edges.retain(|&e| e != id);
            }
        }
        Some(edge)
    }

    /// Drop all nodes and edges. Id counters keep running so stale ids from
    /// before the clear can never alias new elements.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Nearest node to `p` and its distance. Ties break toward the smaller
    /// (older) id so repeated queries are deterministic.
    pub fn nearest_node(&self, p: Vec2) -> Option<(NodeId, f64)> {
        let mut best: Option<(NodeId, f64)> = None;
        for node in self.nodes.values() {
            let d = (node.position - p).norm();
            let better = match best {
                None => true,
                Some((bid, bd)) => d < bd || (d == bd && node.id < bid),
            };
            if better {
                best = Some((node.id, d));
            }
        }
        best
    }

    /// Structural invariant check; returns human-readable violations.
    ///
    /// Verifies that every edge endpoint exists and is listed back, that
    /// every incidence entry refers to an existing edge naming the node, and
    /// that no edge is a self-loop.
    pub fn check_consistency(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for edge in self.edges.values() {
            if edge.start == edge.end {
                violations.push(format!("{} is a self-loop on {}", edge.id, edge.start));
            }
            for endpoint in [edge.start, edge.end] {
                match self.nodes.get(&endpoint) {
                    None => violations.push(format!("{} names missing node {}", edge.id, endpoint)),
                    Some(node) if !node.edges.contains(&edge.id) => violations.push(format!(
                        "{} missing from incidence list of {}",
                        edge.id, endpoint
                    )),
                    Some(_) => {}
                }
            }
        }
        for node in self.nodes.values() {
            for &eid in &node.edges {
                match self.edges.get(&eid) {
                    None => violations.push(format!("{} lists missing edge {}", node.id, eid)),
                    Some(edge) if edge.other(node.id).is_none() => violations.push(format!(
                        "{} lists {} which does not name it",
                        node.id, eid
                    )),
                    Some(_) => {}
                }
            }
        }
        violations
    }

    /// Plain-field snapshot for serialization / display.
    pub fn export(&self) -> GraphExport {
        let mut nodes: Vec<NodeExport> = self
            .nodes
            .values()
            .map(|n| NodeExport {
                id: n.id,
                x: n.position.x,
                y: n.position.y,
            })
            .collect();
        nodes.sort_by_key(|n| n.id);
        let mut edges: Vec<EdgeExport> = self
            .edges
            .values()
            .map(|e| EdgeExport {
                id: e.id,
                start: e.start,
                end: e.end,
            })
            .collect();
        edges.sort_by_key(|e| e.id);
        GraphExport { nodes, edges }
    }
}

impl Default for PathGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Export mirror (plain fields, stable order)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NodeExport {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EdgeExport {
    pub id: EdgeId,
    pub start: NodeId,
    pub end: NodeId,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
