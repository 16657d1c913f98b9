//! Weighted directed edge table.
//!
//! Uses petgraph's directed graph internally. Edge indices follow insertion
//! order, so "original order" is always recoverable after a lookup by
//! endpoint; partner ranking relies on that for its tie-break.

use crate::category::CategoryIndex;
use crate::metadata::NodeMetadata;
use crate::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as GraphDirection;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Opaque node identifier.
///
/// Identifiers are compared as text; numeric ids read from CSV keep their
/// textual form. The `Ord` impl defines the row order of every output table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single weighted connection `source -> sink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub sink: NodeId,
    pub weight: f64,
}

impl Edge {
    /// Create a new edge.
    pub fn new(source: impl Into<NodeId>, sink: impl Into<NodeId>, weight: f64) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
            weight,
        }
    }
}

/// Which end of an edge a node occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Source,
    Sink,
}

impl Endpoint {
    /// The other end of the edge.
    pub fn opposite(self) -> Self {
        match self {
            Endpoint::Source => Endpoint::Sink,
            Endpoint::Sink => Endpoint::Source,
        }
    }

    fn graph_direction(self) -> GraphDirection {
        match self {
            Endpoint::Source => GraphDirection::Outgoing,
            Endpoint::Sink => GraphDirection::Incoming,
        }
    }
}

/// Borrowed view of one edge in a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRecord<'a> {
    pub source: &'a NodeId,
    pub sink: &'a NodeId,
    pub weight: f64,
    /// Insertion position in the table.
    pub position: usize,
}

impl<'a> EdgeRecord<'a> {
    /// The node sitting at `endpoint`.
    pub fn endpoint(&self, endpoint: Endpoint) -> &'a NodeId {
        match endpoint {
            Endpoint::Source => self.source,
            Endpoint::Sink => self.sink,
        }
    }
}

/// Summary statistics for an edge table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTableStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub total_weight: f64,
    pub avg_out_degree: f64,
}

/// How well the metadata covers edge endpoints.
///
/// Counts endpoint occurrences (two per edge). Endpoints with an unknown
/// category, or a category outside the axis, contribute nothing to any
/// fingerprint; this makes that loss visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    pub endpoints: usize,
    pub unknown: usize,
    pub outside_axis: usize,
}

impl Coverage {
    /// Endpoint occurrences whose category lands on the axis.
    pub fn resolved(&self) -> usize {
        self.endpoints - self.unknown - self.outside_axis
    }

    /// Fraction of endpoint occurrences resolved (1.0 for an empty table).
    pub fn resolved_fraction(&self) -> f64 {
        if self.endpoints == 0 {
            1.0
        } else {
            self.resolved() as f64 / self.endpoints as f64
        }
    }
}

/// Ordered collection of weighted directed edges.
///
/// # Example
///
/// ```rust
/// use connectropy_core::{Edge, EdgeTable};
///
/// let edges = EdgeTable::from_edges([
///     Edge::new("X", "Y", 2.0),
///     Edge::new("X", "Z", 2.0),
/// ])
/// .unwrap();
///
/// assert_eq!(edges.node_count(), 3);
/// assert_eq!(edges.edge_count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    graph: DiGraph<NodeId, f64>,
    node_index: HashMap<NodeId, NodeIndex>,
}

impl EdgeTable {
    /// Create an empty edge table.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Create an edge table with estimated capacity.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            node_index: HashMap::with_capacity(nodes),
        }
    }

    /// Build a table from edges, validating every weight.
    pub fn from_edges(edges: impl IntoIterator<Item = Edge>) -> Result<Self> {
        let mut table = Self::new();
        for edge in edges {
            table.push(edge)?;
        }
        Ok(table)
    }

    /// Append an edge. Weights must be finite and non-negative.
    pub fn push(&mut self, edge: Edge) -> Result<()> {
        if !edge.weight.is_finite() || edge.weight < 0.0 {
            return Err(Error::InvalidWeight {
                from: edge.source.0,
                to: edge.sink.0,
                weight: edge.weight,
            });
        }
        self.push_unchecked(&edge.source, &edge.sink, edge.weight);
        Ok(())
    }

    /// Append a symmetric connection as two directed edges of equal weight.
    pub fn push_bidirectional(
        &mut self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
        weight: f64,
    ) -> Result<()> {
        let (a, b) = (a.into(), b.into());
        self.push(Edge::new(a.clone(), b.clone(), weight))?;
        self.push(Edge::new(b, a, weight))
    }

    fn push_unchecked(&mut self, source: &NodeId, sink: &NodeId, weight: f64) {
        let s = self.get_or_create_node(source);
        let t = self.get_or_create_node(sink);
        self.graph.add_edge(s, t, weight);
    }

    fn get_or_create_node(&mut self, id: &NodeId) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.node_index.insert(id.clone(), idx);
        idx
    }

    /// Number of distinct endpoint ids.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edge records.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True when the table holds no edges.
    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Whether `id` appears as either endpoint.
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Every id appearing as either endpoint, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.graph.node_weights().cloned().collect();
        ids.sort();
        ids
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeRecord<'_>> + '_ {
        self.graph.edge_references().map(move |e| EdgeRecord {
            source: &self.graph[e.source()],
            sink: &self.graph[e.target()],
            weight: *e.weight(),
            position: e.id().index(),
        })
    }

    /// Edges in which `id` occupies `anchor`, in insertion order.
    ///
    /// Unknown ids yield no edges.
    pub fn incident(&self, id: &str, anchor: Endpoint) -> Vec<EdgeRecord<'_>> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut records: Vec<EdgeRecord<'_>> = self
            .graph
            .edges_directed(idx, anchor.graph_direction())
            .filter_map(|e| {
                let (s, t) = self.graph.edge_endpoints(e.id())?;
                Some(EdgeRecord {
                    source: &self.graph[s],
                    sink: &self.graph[t],
                    weight: *e.weight(),
                    position: e.id().index(),
                })
            })
            .collect();
        records.sort_by_key(|r| r.position);
        records
    }

    /// Sum duplicate `(source, sink)` records into one edge each.
    ///
    /// The merged edge keeps the position of the first record of its pair.
    /// Fails with [`Error::InvalidWeight`] when a pair's sum overflows.
    pub fn aggregated(&self) -> Result<Self> {
        let mut order: Vec<(NodeIndex, NodeIndex)> = Vec::new();
        let mut sums: HashMap<(NodeIndex, NodeIndex), f64> = HashMap::new();
        for e in self.graph.edge_references() {
            let key = (e.source(), e.target());
            let slot = sums.entry(key).or_insert_with(|| {
                order.push(key);
                0.0
            });
            *slot += *e.weight();
        }

        let mut table = Self::with_capacity(self.node_count(), order.len());
        for key in order {
            let (s, t) = key;
            table.push(Edge::new(self.graph[s].clone(), self.graph[t].clone(), sums[&key]))?;
        }
        Ok(table)
    }

    /// Count endpoint occurrences the metadata cannot place on the axis.
    pub fn coverage(&self, metadata: &NodeMetadata, index: &CategoryIndex) -> Coverage {
        let mut coverage = Coverage::default();
        for edge in self.edges() {
            for id in [edge.source, edge.sink] {
                coverage.endpoints += 1;
                match metadata.category(id.as_str()) {
                    None => coverage.unknown += 1,
                    Some(c) if !index.contains(c) => coverage.outside_axis += 1,
                    Some(_) => {}
                }
            }
        }
        coverage
    }

    /// Get table statistics.
    pub fn stats(&self) -> EdgeTableStats {
        let node_count = self.node_count();
        let edge_count = self.edge_count();
        EdgeTableStats {
            node_count,
            edge_count,
            total_weight: self.graph.edge_weights().sum(),
            avg_out_degree: if node_count > 0 {
                edge_count as f64 / node_count as f64
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> EdgeTable {
        EdgeTable::from_edges([
            Edge::new("A", "B", 1.0),
            Edge::new("B", "C", 3.0),
            Edge::new("A", "C", 2.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts_and_sorted_ids() {
        let edges = chain();
        assert_eq!(edges.node_count(), 3);
        assert_eq!(edges.edge_count(), 3);
        let ids = edges.node_ids();
        let ids: Vec<&str> = ids.iter().map(NodeId::as_str).collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[test]
    fn test_incident_keeps_insertion_order() {
        let edges = chain();
        let out: Vec<&str> = edges
            .incident("A", Endpoint::Source)
            .iter()
            .map(|e| e.sink.as_str())
            .collect();
        assert_eq!(out, ["B", "C"]);

        let into_c: Vec<&str> = edges
            .incident("C", Endpoint::Sink)
            .iter()
            .map(|e| e.source.as_str())
            .collect();
        assert_eq!(into_c, ["B", "A"]);
    }

    #[test]
    fn test_incident_unknown_node_is_empty() {
        assert!(chain().incident("nope", Endpoint::Source).is_empty());
    }

    #[test]
    fn test_self_loop_is_both_in_and_out() {
        let edges = EdgeTable::from_edges([Edge::new("A", "A", 1.0)]).unwrap();
        assert_eq!(edges.incident("A", Endpoint::Source).len(), 1);
        assert_eq!(edges.incident("A", Endpoint::Sink).len(), 1);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut edges = EdgeTable::new();
        assert!(matches!(
            edges.push(Edge::new("A", "B", -1.0)),
            Err(Error::InvalidWeight { .. })
        ));
        assert!(edges.push(Edge::new("A", "B", f64::NAN)).is_err());
        assert!(edges.push(Edge::new("A", "B", f64::INFINITY)).is_err());
        assert!(edges.is_empty());
    }

    #[test]
    fn test_aggregated_sums_duplicates() {
        let edges = EdgeTable::from_edges([
            Edge::new("A", "B", 1.0),
            Edge::new("A", "C", 5.0),
            Edge::new("A", "B", 2.5),
        ])
        .unwrap();
        let merged = edges.aggregated().unwrap();
        assert_eq!(merged.edge_count(), 2);

        let records: Vec<(String, f64)> = merged
            .edges()
            .map(|e| (e.sink.to_string(), e.weight))
            .collect();
        assert_eq!(records, [("B".to_string(), 3.5), ("C".to_string(), 5.0)]);
    }

    #[test]
    fn test_aggregated_rejects_overflowing_sum() {
        let edges = EdgeTable::from_edges([
            Edge::new("A", "B", 1e308),
            Edge::new("A", "B", 1e308),
        ])
        .unwrap();
        assert!(matches!(
            edges.aggregated(),
            Err(Error::InvalidWeight { weight, .. }) if weight.is_infinite()
        ));
    }

    #[test]
    fn test_bidirectional() {
        let mut edges = EdgeTable::new();
        edges.push_bidirectional("A", "B", 4.0).unwrap();
        assert_eq!(edges.edge_count(), 2);
        assert_eq!(edges.incident("B", Endpoint::Source)[0].sink.as_str(), "A");
    }

    #[test]
    fn test_stats() {
        let stats = chain().stats();
        assert_eq!(stats.edge_count, 3);
        assert!((stats.total_weight - 6.0).abs() < 1e-12);
        assert!((stats.avg_out_degree - 1.0).abs() < 1e-12);
    }
}
