//! Path manager: online construction of the walkable-path graph from
//! recorded step trails, plus snapping and shortest-path routing.
//!
//! # Responsibilities
//! - Accumulate step positions into a recording buffer during a session.
//! - Finalize a buffer into a single PCA-regressed straight edge, chained to
//!   the previous segment through the anchor node.
//! - Snap live positions onto the nearest edge.
//! - Split an edge at a projected point to create a junction node.
//! - Route between two positions with Dijkstra over Euclidean edge weights.

use crate::graph::PathGraph;
use crate::types::{EdgeId, NodeId, Vec2};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

/// Thresholds governing graph construction and queries.
#[derive(Clone, Debug)]
pub struct PathManagerConfig {
    /// Snap distance: beyond this a non-strict snap returns the input (m).
    pub snap_threshold_m: f64,
    /// Maximum distance from an edge for a split to occur (m).
    pub split_threshold_m: f64,
    /// Maximum distance from a node for routing endpoint lookup (m).
    pub node_snap_threshold_m: f64,
    /// Minimum recorded polyline length for a segment to finalize (m).
    pub min_segment_length_m: f64,
    /// Projections closer than this to an endpoint skip the split (m).
    pub split_endpoint_gap_m: f64,
}

impl Default for PathManagerConfig {
    fn default() -> Self {
        Self {
            snap_threshold_m: 2.0,
            split_threshold_m: 2.0,
            node_snap_threshold_m: 5.0,
            min_segment_length_m: 1.0,
            split_endpoint_gap_m: 1e-9,
        }
    }
}

/// Projection of a point onto one edge.
#[derive(Clone, Copy, Debug)]
struct EdgeProjection {
    edge: EdgeId,
    foot: Vec2,
    distance: f64,
}

/// Owns the graph, the recording buffer and the anchor node.
pub struct PathManager {
    config: PathManagerConfig,
    graph: PathGraph,
    /// Step positions of the active recording segment.
    buffer: Vec<Vec2>,
    /// Node the next finalized segment must connect to. None before the
    /// first segment or when recording started in empty space.
    anchor: Option<NodeId>,
}

impl PathManager {
    pub fn new(config: PathManagerConfig) -> Self {
        Self {
            config,
            graph: PathGraph::new(),
            buffer: Vec::new(),
            anchor: None,
        }
    }

    pub fn graph(&self) -> &PathGraph {
        &self.graph
    }

    pub fn has_path(&self) -> bool {
        !self.graph.is_empty()
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Append one step position to the active recording segment.
    pub fn record_step(&mut self, p: Vec2) {
        self.buffer.push(p);
    }

    /// Drop the recording buffer without finalizing.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Drop the whole graph (explicit user request only).
    pub fn clear_graph(&mut self) {
        self.graph.clear();
        self.anchor = None;
        self.buffer.clear();
    }

    // -----------------------------------------------------------------------
    // Recording transitions
    // -----------------------------------------------------------------------

    /// Called when a recording session starts at `current`.
    ///
    /// Tries to split the nearest edge there so the new trail hangs off an
    /// existing path; a successful split becomes the anchor. With no path at
    /// all, any stale buffer is discarded and the anchor stays null.
    pub fn prepare_for_new_recording(&mut self, current: Vec2) -> Option<NodeId> {
        if let Some(node) = self.split_edge_at(current) {
            return Some(node);
        }
        if self.graph.is_empty() {
            self.buffer.clear();
            self.anchor = None;
        }
        None
    }

    // -----------------------------------------------------------------------
    // Finalize: PCA line fit
    // -----------------------------------------------------------------------

    /// Convert the recording buffer into one straight graph edge.
    ///
    /// Returns true when the graph changed. Rejected buffers (fewer than two
    /// points, or a polyline shorter than the minimum) are retained so an
    /// auto-finalize reject can keep accumulating.
    pub fn finalize_segment(&mut self) -> bool {
        if self.buffer.len() < 2 {
            return false;
        }
        let polyline_len: f64 = self
            .buffer
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum();
        if polyline_len < self.config.min_segment_length_m {
            debug!(len = polyline_len, "segment too short, finalize rejected");
            return false;
        }

        // Principal axis of the point cloud.
        let n = self.buffer.len() as f64;
        let centroid = self.buffer.iter().fold(Vec2::zeros(), |acc, p| acc + p) / n;
        let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
        for p in &self.buffer {
            let d = p - centroid;
            sxx += d.x * d.x;
            sxy += d.x * d.y;
            syy += d.y * d.y;
        }
        let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        let dir = Vec2::new(theta.cos(), theta.sin());

        // Extremal projections onto the axis give the segment endpoints.
        let mut proj_min = f64::INFINITY;
        let mut proj_max = f64::NEG_INFINITY;
        for p in &self.buffer {
            let t = (p - centroid).dot(&dir);
            proj_min = proj_min.min(t);
            proj_max = proj_max.max(t);
        }
        let a = centroid + dir * proj_min;
        let b = centroid + dir * proj_max;

        match self.anchor {
            None => {
                // First segment: both endpoints are new nodes.
                let node_a = self.graph.add_node(a);
                let node_b = self.graph.add_node(b);
                self.graph.add_edge(node_a, node_b);
                self.anchor = Some(node_b);
            }
            Some(anchor) => {
                // The anchor is the start; its position is not moved. The far
                // endpoint is whichever of {a, b} lies farther from it.
                let anchor_pos = match self.graph.node(anchor) {
                    Some(n) => n.position,
                    None => {
                        // Stale anchor (graph was cleared underneath us):
                        // fall back to a fresh first segment.
                        self.anchor = None;
                        return self.finalize_segment();
                    }
                };
                let far = if (a - anchor_pos).norm() <= (b - anchor_pos).norm() {
                    b
                } else {
                    a
                };
                let node_far = self.graph.add_node(far);
                self.graph.add_edge(anchor, node_far);
                self.anchor = Some(node_far);
            }
        }

        debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "segment finalized"
        );
        self.buffer.clear();
        true
    }

    // -----------------------------------------------------------------------
    // Snap
    // -----------------------------------------------------------------------

    /// Project `point` onto the nearest edge.
    ///
    /// Returns the projection foot when `strict` or when the nearest edge is
    /// within the snap threshold; otherwise (and on an empty graph) returns
    /// the input point unchanged.
    pub fn snap(&self, point: Vec2, strict: bool) -> Vec2 {
        match self.nearest_edge_projection(point) {
            Some(proj) if strict || proj.distance <= self.config.snap_threshold_m => proj.foot,
            _ => point,
        }
    }

    /// Nearest edge by clamped segment projection. Ties break toward the
    /// smaller edge id.
    fn nearest_edge_projection(&self, point: Vec2) -> Option<EdgeProjection> {
        let mut best: Option<EdgeProjection> = None;
        for edge in self.graph.edges() {
            let (s, e) = match self.graph.edge_segment(edge.id) {
                Some(seg) => seg,
                None => continue,
            };
            let v = e - s;
            let len_sq = v.norm_squared();
            let foot = if len_sq == 0.0 {
                // Degenerate edge collapses to its endpoint.
                s
            } else {
                let t = ((point - s).dot(&v) / len_sq).clamp(0.0, 1.0);
                s + v * t
            };
            let distance = (point - foot).norm();
            let better = match &best {
                None => true,
                Some(b) => distance < b.distance || (distance == b.distance && edge.id < b.edge),
            };
            if better {
                best = Some(EdgeProjection {
                    edge: edge.id,
                    foot,
                    distance,
                });
            }
        }
        best
    }

    // -----------------------------------------------------------------------
    // Split
    // -----------------------------------------------------------------------

    /// Split the nearest edge at the projection of `point`, when within the
    /// split threshold.
    ///
    /// The old edge is replaced by two edges meeting at a new node at the
    /// projection foot; the new node becomes the anchor. Projections that
    /// coincide with an endpoint are skipped so no zero-length edge can
    /// arise. Returns the new node, or None when nothing was split.
    pub fn split_edge_at(&mut self, point: Vec2) -> Option<NodeId> {
        let proj = self.nearest_edge_projection(point)?;
        if proj.distance > self.config.split_threshold_m {
            return None;
        }
        let (s, e) = self.graph.edge_segment(proj.edge)?;
        if (proj.foot - s).norm() < self.config.split_endpoint_gap_m
            || (proj.foot - e).norm() < self.config.split_endpoint_gap_m
        {
            return None;
        }

        let old = self.graph.remove_edge(proj.edge)?;
        let node = self.graph.add_node(proj.foot);
        self.graph.add_edge(old.start, node);
        self.graph.add_edge(node, old.end);
        self.anchor = Some(node);
        debug!(%node, "edge split at projection foot");
        Some(node)
    }

    // -----------------------------------------------------------------------
    // Routing
    // -----------------------------------------------------------------------

    /// Shortest walkable route from `start` to `end`.
    ///
    /// Both query points are matched to their nearest node within the node
    /// snap threshold; the returned sequence runs from the start node's
    /// position along the graph to the end node's position, with the
    /// caller's `end` appended. Whenever routing is impossible (no nearby
    /// node, identical endpoints, disconnected components) the fallback is
    /// the single-element `[end]`.
    pub fn find_path(&self, start: Vec2, end: Vec2) -> Vec<Vec2> {
        let fallback = vec![end];

        let start_node = match self.node_near(start) {
            Some(n) => n,
            None => return fallback,
        };
        let end_node = match self.node_near(end) {
            Some(n) => n,
            None => return fallback,
        };
        if start_node == end_node {
            return fallback;
        }

        let came_from = match self.dijkstra(start_node, end_node) {
            Some(map) => map,
            None => return fallback,
        };

        // Walk predecessors back from the end node.
        let mut node_chain = vec![end_node];
        let mut cursor = end_node;
        while let Some(&prev) = came_from.get(&cursor) {
            node_chain.push(prev);
            cursor = prev;
        }
        node_chain.reverse();

        let mut route: Vec<Vec2> = node_chain
            .iter()
            .filter_map(|id| self.graph.node(*id).map(|n| n.position))
            .collect();
        route.push(end);
        route
    }

    fn node_near(&self, p: Vec2) -> Option<NodeId> {
        let (id, dist) = self.graph.nearest_node(p)?;
        (dist <= self.config.node_snap_threshold_m).then_some(id)
    }

    /// Dijkstra over the undirected graph with Euclidean edge weights.
    /// Returns the predecessor map when `goal` was reached. Ties in the
    /// frontier resolve by node insertion order (the id order).
    fn dijkstra(&self, source: NodeId, goal: NodeId) -> Option<HashMap<NodeId, NodeId>> {
        #[derive(PartialEq)]
        struct Frontier {
            cost: f64,
            node: NodeId,
        }
        impl Eq for Frontier {}
        impl Ord for Frontier {
            fn cmp(&self, other: &Self) -> Ordering {
                // Min-heap on (cost, id) through reversal.
                other
                    .cost
                    .partial_cmp(&self.cost)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| other.node.cmp(&self.node))
            }
        }
        impl PartialOrd for Frontier {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut dist: HashMap<NodeId, f64> = HashMap::new();
        let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
        let mut heap = BinaryHeap::new();
        dist.insert(source, 0.0);
        heap.push(Frontier {
            cost: 0.0,
            node: source,
        });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == goal {
                return Some(came_from);
            }
            if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
                continue; // stale heap entry
            }
            let current = match self.graph.node(node) {
                Some(n) => n,
                None => continue,
            };
            for &eid in &current.edges {
                let edge = match self.graph.edge(eid) {
                    Some(e) => e,
                    None => continue,
                };
                let neighbor = match edge.other(node) {
                    Some(n) => n,
                    None => continue,
                };
                let weight = match self.graph.edge_length(eid) {
                    Some(w) => w,
                    None => continue,
                };
                let next_cost = cost + weight;
                if next_cost < *dist.get(&neighbor).unwrap_or(&f64::INFINITY) {
                    dist.insert(neighbor, next_cost);
                    came_from.insert(neighbor, node);
                    heap.push(Frontier {
                        cost: next_cost,
                        node: neighbor,
                    });
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn manager() -> PathManager {
        PathManager::new(PathManagerConfig::default())
    }

    /// Build a manager whose graph is the single edge (0,0)-(10,0).
    fn single_edge_manager() -> PathManager {
        let mut pm = manager();
        for i in 0..=10 {
            pm.record_step(Vec2::new(i as f64, 0.0));
        }
        assert!(pm.finalize_segment());
        pm
    }

    #[test]
    fn finalize_collinear_points_fits_exact_segment() {
        let mut pm = manager();
        for x in [0.0, 1.0, 2.0, 3.0, 4.0] {
            pm.record_step(Vec2::new(x, 0.0));
        }
        assert!(pm.finalize_segment());

        let g = pm.graph();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        let edge = g.edges().next().unwrap();
        let (s, e) = g.edge_segment(edge.id).unwrap();
        let (lo, hi) = if s.x <= e.x { (s, e) } else { (e, s) };
        assert_abs_diff_eq!(lo.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(lo.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hi.x, 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hi.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g.edge_length(edge.id).unwrap(), 4.0, epsilon = 1e-6);
        assert!(pm.graph().check_consistency().is_empty());
    }

    #[test]
    fn finalize_rejects_short_segment_and_retains_buffer() {
        let mut pm = manager();
        for p in [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.2, 0.0),
            Vec2::new(0.3, 0.0),
        ] {
            pm.record_step(p);
        }
        assert!(!pm.finalize_segment());
        assert!(pm.graph().is_empty());
        assert_eq!(pm.buffer_len(), 3, "rejected buffer is retained");
    }

    #[test]
    fn finalize_rejects_single_point() {
        let mut pm = manager();
        pm.record_step(Vec2::new(0.0, 0.0));
        assert!(!pm.finalize_segment());
        assert!(pm.graph().is_empty());
    }

    #[test]
    fn finalize_conservation_with_anchor() {
        let mut pm = single_edge_manager();
        let (n0, e0) = (pm.graph().node_count(), pm.graph().edge_count());
        assert!(pm.anchor().is_some());

        // Second segment chains off the anchor: one new node, one new edge.
        let anchor_pos = pm.graph().node(pm.anchor().unwrap()).unwrap().position;
        for i in 0..=5 {
            pm.record_step(anchor_pos + Vec2::new(0.0, i as f64));
        }
        assert!(pm.finalize_segment());
        assert_eq!(pm.graph().node_count(), n0 + 1);
        assert_eq!(pm.graph().edge_count(), e0 + 1);
        assert!(pm.graph().check_consistency().is_empty());
    }

    #[test]
    fn anchored_finalize_keeps_anchor_position() {
        let mut pm = single_edge_manager();
        let anchor = pm.anchor().unwrap();
        let anchor_pos = pm.graph().node(anchor).unwrap().position;

        // Record a trail that starts slightly off the anchor.
        for i in 0..=5 {
            pm.record_step(anchor_pos + Vec2::new(0.3, i as f64));
        }
        assert!(pm.finalize_segment());
        let after = pm.graph().node(anchor).unwrap().position;
        assert_eq!(anchor_pos, after, "anchor position is never moved");

        // The new edge names the anchor as one endpoint.
        let new_anchor = pm.anchor().unwrap();
        assert_ne!(new_anchor, anchor);
        let connects = pm
            .graph()
            .edges()
            .any(|e| e.other(anchor) == Some(new_anchor));
        assert!(connects);
    }

    #[test]
    fn snap_projects_onto_edge_interior() {
        let pm = single_edge_manager();
        let snapped = pm.snap(Vec2::new(3.0, 1.5), false);
        assert_abs_diff_eq!(snapped.x, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(snapped.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn snap_clamps_to_endpoint() {
        let pm = single_edge_manager();
        let snapped = pm.snap(Vec2::new(12.0, 1.0), true);
        assert_abs_diff_eq!(snapped.x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(snapped.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn non_strict_snap_beyond_threshold_returns_input() {
        let pm = single_edge_manager();
        let p = Vec2::new(5.0, 7.0);
        assert_eq!(pm.snap(p, false), p);
        // Strict snap still projects.
        let strict = pm.snap(p, true);
        assert_abs_diff_eq!(strict.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn snap_on_empty_graph_returns_input() {
        let pm = manager();
        let p = Vec2::new(1.0, 2.0);
        assert_eq!(pm.snap(p, true), p);
    }

    #[test]
    fn snap_is_idempotent() {
        let pm = single_edge_manager();
        for p in [
            Vec2::new(3.0, 1.5),
            Vec2::new(-2.0, -2.0),
            Vec2::new(11.0, 0.5),
        ] {
            let once = pm.snap(p, true);
            let twice = pm.snap(once, true);
            assert_abs_diff_eq!((twice - once).norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn split_far_from_endpoint_creates_junction() {
        let mut pm = single_edge_manager();
        let node = pm.split_edge_at(Vec2::new(1.5, 0.0)).unwrap();

        let g = pm.graph();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let pos = g.node(node).unwrap().position;
        assert_abs_diff_eq!(pos.x, 1.5, epsilon = 1e-3);
        assert_abs_diff_eq!(pos.y, 0.0, epsilon = 1e-3);
        assert_eq!(pm.anchor(), Some(node));
        assert!(g.check_consistency().is_empty());
    }

    #[test]
    fn split_is_idempotent() {
        let mut pm = single_edge_manager();
        pm.split_edge_at(Vec2::new(4.0, 0.5)).unwrap();
        let (n1, e1) = (pm.graph().node_count(), pm.graph().edge_count());

        // Second split at the same point projects onto an existing endpoint
        // and must not mutate.
        assert!(pm.split_edge_at(Vec2::new(4.0, 0.5)).is_none());
        assert_eq!(pm.graph().node_count(), n1);
        assert_eq!(pm.graph().edge_count(), e1);
        assert!(pm.graph().check_consistency().is_empty());
    }

    #[test]
    fn split_outside_threshold_is_noop() {
        let mut pm = single_edge_manager();
        assert!(pm.split_edge_at(Vec2::new(5.0, 3.0)).is_none());
        assert_eq!(pm.graph().edge_count(), 1);
    }

    #[test]
    fn split_on_empty_graph_is_noop() {
        let mut pm = manager();
        assert!(pm.split_edge_at(Vec2::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn prepare_for_new_recording_splits_and_anchors() {
        let mut pm = single_edge_manager();
        let node = pm.prepare_for_new_recording(Vec2::new(1.5, 0.0)).unwrap();
        assert_eq!(pm.anchor(), Some(node));
        assert_eq!(pm.graph().node_count(), 3);
    }

    #[test]
    fn prepare_for_new_recording_on_empty_graph_clears_stale_buffer() {
        let mut pm = manager();
        pm.record_step(Vec2::new(0.0, 0.0));
        assert!(pm.prepare_for_new_recording(Vec2::new(0.0, 0.0)).is_none());
        assert_eq!(pm.buffer_len(), 0);
        assert!(pm.anchor().is_none());
    }

    // -- Routing --------------------------------------------------------

    /// Square loop N(0,0)-N(10,0)-N(10,10)-N(0,10)-N(0,0), built directly.
    fn square_manager() -> PathManager {
        let mut pm = manager();
        let g = &mut pm.graph;
        let a = g.add_node(Vec2::new(0.0, 0.0));
        let b = g.add_node(Vec2::new(10.0, 0.0));
        let c = g.add_node(Vec2::new(10.0, 10.0));
        let d = g.add_node(Vec2::new(0.0, 10.0));
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, d);
        g.add_edge(d, a);
        pm
    }

    #[test]
    fn route_around_square_is_l_shaped() {
        let pm = square_manager();
        let route = pm.find_path(Vec2::new(0.1, 0.1), Vec2::new(9.9, 9.9));

        // Corner-to-opposite-corner: both L-routes cost 20; the tie-break
        // picks one deterministically. Expect the node chain plus the
        // caller's end point.
        assert!(
            route.len() == 3 || route.len() == 4,
            "unexpected route {:?}",
            route
        );
        let last = route.last().unwrap();
        assert_eq!(*last, Vec2::new(9.9, 9.9));
        let first = route.first().unwrap();
        assert_abs_diff_eq!((first - Vec2::new(0.0, 0.0)).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn route_fallback_when_no_node_near_start() {
        let pm = square_manager();
        let end = Vec2::new(9.9, 9.9);
        let route = pm.find_path(Vec2::new(100.0, 100.0), end);
        assert_eq!(route, vec![end]);
    }

    #[test]
    fn route_fallback_when_endpoints_identical() {
        let pm = square_manager();
        let end = Vec2::new(0.2, 0.1);
        let route = pm.find_path(Vec2::new(0.1, 0.1), end);
        assert_eq!(route, vec![end]);
    }

    #[test]
    fn route_fallback_across_disconnected_components() {
        let mut pm = square_manager();
        let g = &mut pm.graph;
        let far_a = g.add_node(Vec2::new(100.0, 100.0));
        let far_b = g.add_node(Vec2::new(110.0, 100.0));
        g.add_edge(far_a, far_b);

        let end = Vec2::new(100.0, 100.0);
        let route = pm.find_path(Vec2::new(0.1, 0.1), end);
        assert_eq!(route, vec![end]);
    }

    #[test]
    fn route_on_empty_graph_is_fallback() {
        let pm = manager();
        let end = Vec2::new(1.0, 1.0);
        assert_eq!(pm.find_path(Vec2::new(0.0, 0.0), end), vec![end]);
    }

    #[test]
    fn clear_graph_resets_everything() {
        let mut pm = single_edge_manager();
        pm.record_step(Vec2::new(0.0, 0.0));
        pm.clear_graph();
        assert!(pm.graph().is_empty());
        assert!(pm.anchor().is_none());
        assert_eq!(pm.buffer_len(), 0);
    }
}
