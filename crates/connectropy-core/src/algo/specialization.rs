//! Neighborhood specialization-diversity.
//!
//! Compares a node's own fingerprint entropy with the entropy of its
//! partners' *averaged* fingerprint:
//!
//! ```text
//! x_ent_of_avg = H( mean over partners P of fingerprint(P).x )
//! x_diff       = x_ent_of_avg - H( fingerprint(N).x )          x ∈ {in, out}
//! ```
//!
//! Partners are taken along one [`Flow`]:
//!
//! | Flow | N's role | Partners |
//! |------|----------|----------|
//! | Downstream | source | sinks of N's outgoing edges |
//! | Upstream | sink | sources of N's incoming edges |
//!
//! A large positive difference marks a node that is more specialized than
//! the neighborhood it talks to; these are ranked as hubs by [`crate::algo::hubs`].
//!
//! # Averaging
//!
//! The mean is column-wise and skips undefined entries, so partners that
//! simply have no edges in some direction do not dilute the others. A column
//! stays undefined only when every contributing partner is undefined there.
//! The partner list is de-duplicated and never truncated; its order (heaviest
//! connection first, ties by edge order) has no effect on the mean.

use crate::algo::entropy::shannon_entropy;
use crate::algo::fingerprint::{Fingerprint, FingerprintTable};
use crate::category::Direction;
use crate::edge::{EdgeTable, Endpoint, NodeId};
use crate::store::{artifact_key, ArtifactStore, SPECIALIZATION_ARTIFACT};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Which partners form a node's neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Flow {
    /// Nodes sending edges to N.
    Upstream,
    /// Nodes receiving edges from N.
    Downstream,
}

impl Flow {
    pub const BOTH: [Flow; 2] = [Flow::Upstream, Flow::Downstream];

    /// Endpoint N occupies.
    pub fn anchor(self) -> Endpoint {
        match self {
            Flow::Downstream => Endpoint::Source,
            Flow::Upstream => Endpoint::Sink,
        }
    }

    /// Endpoint the partners occupy.
    pub fn partner(self) -> Endpoint {
        self.anchor().opposite()
    }

    /// Column suffix: `U` or `D`.
    pub fn suffix(self) -> &'static str {
        match self {
            Flow::Upstream => "U",
            Flow::Downstream => "D",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Upstream => write!(f, "upstream"),
            Flow::Downstream => write!(f, "downstream"),
        }
    }
}

impl FromStr for Flow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "u" | "up" | "us" | "upstream" => Ok(Flow::Upstream),
            "d" | "down" | "ds" | "downstream" => Ok(Flow::Downstream),
            other => Err(Error::InvalidConfig(format!("unknown flow '{other}'"))),
        }
    }
}

/// Distinct partners of `id` along `flow`, heaviest edge first.
///
/// Ties keep edge-table order. Every distinct partner is returned.
pub fn partners(edges: &EdgeTable, id: &str, flow: Flow) -> Vec<NodeId> {
    let mut incident = edges.incident(id, flow.anchor());
    // Stable sort: equal weights keep insertion order.
    incident.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let mut seen = HashSet::new();
    incident
        .into_iter()
        .map(|e| e.endpoint(flow.partner()))
        .filter(|p| seen.insert(*p))
        .cloned()
        .collect()
}

/// Mean of the defined values, or `None` if there are none.
fn mean_defined(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Column-wise average of partner fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodAverage {
    pub fingerprint: Fingerprint,
    /// Partners found in the fingerprint table.
    pub contributors: usize,
    /// Mean of the partners' own in-entropies.
    pub in_mean_entropy: Option<f64>,
    /// Mean of the partners' own out-entropies.
    pub out_mean_entropy: Option<f64>,
}

/// Average the fingerprints of `partners`, ignoring ids missing from `table`.
pub fn neighborhood_average(table: &FingerprintTable, partners: &[NodeId]) -> NeighborhoodAverage {
    let width = table.index().len();
    let found: Vec<&NodeId> = partners.iter().filter(|p| table.contains(p.as_str())).collect();

    let column = |direction: Direction, col: usize| {
        mean_defined(found.iter().map(|p| {
            table
                .get(p.as_str())
                .and_then(|row| row.fingerprint.half(direction)[col])
        }))
    };
    let fingerprint = Fingerprint {
        inbound: (0..width).map(|c| column(Direction::In, c)).collect(),
        outbound: (0..width).map(|c| column(Direction::Out, c)).collect(),
    };

    let mean_entropy = |direction: Direction| {
        mean_defined(found.iter().map(|p| table.entropy(p.as_str(), direction)))
    };

    NeighborhoodAverage {
        in_mean_entropy: mean_entropy(Direction::In),
        out_mean_entropy: mean_entropy(Direction::Out),
        contributors: found.len(),
        fingerprint,
    }
}

fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Per-flow field names in flat output order.
pub const FLOW_FIELDS: [&str; 8] = [
    "in_ent_of_avg",
    "out_ent_of_avg",
    "in_entropy",
    "out_entropy",
    "in_mean_entropy",
    "out_mean_entropy",
    "in_diff",
    "out_diff",
];

/// Specialization-diversity of one node along one flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Distinct partners along the flow.
    pub partners: usize,
    /// Partners that had a fingerprint row.
    pub contributors: usize,
    /// Entropy of the averaged partner in-half.
    pub in_ent_of_avg: Option<f64>,
    /// Entropy of the averaged partner out-half.
    pub out_ent_of_avg: Option<f64>,
    /// The node's own in-entropy.
    pub in_entropy: Option<f64>,
    /// The node's own out-entropy.
    pub out_entropy: Option<f64>,
    /// Mean of the partners' own in-entropies.
    pub in_mean_entropy: Option<f64>,
    /// Mean of the partners' own out-entropies.
    pub out_mean_entropy: Option<f64>,
    /// `in_ent_of_avg - in_entropy`.
    pub in_diff: Option<f64>,
    /// `out_ent_of_avg - out_entropy`.
    pub out_diff: Option<f64>,
}

impl FlowRecord {
    pub fn ent_of_avg(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::In => self.in_ent_of_avg,
            Direction::Out => self.out_ent_of_avg,
        }
    }

    pub fn diff(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::In => self.in_diff,
            Direction::Out => self.out_diff,
        }
    }

    /// `out_diff + in_diff` when both are defined and finite.
    pub fn total(&self) -> Option<f64> {
        Some(self.out_diff? + self.in_diff?).filter(|t| t.is_finite())
    }

    /// Values in [`FLOW_FIELDS`] order.
    pub fn values(&self) -> [Option<f64>; 8] {
        [
            self.in_ent_of_avg,
            self.out_ent_of_avg,
            self.in_entropy,
            self.out_entropy,
            self.in_mean_entropy,
            self.out_mean_entropy,
            self.in_diff,
            self.out_diff,
        ]
    }
}

/// Upstream and downstream records of one node; absent flows are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecializationRow {
    pub upstream: Option<FlowRecord>,
    pub downstream: Option<FlowRecord>,
}

impl SpecializationRow {
    pub fn get(&self, flow: Flow) -> Option<&FlowRecord> {
        match flow {
            Flow::Upstream => self.upstream.as_ref(),
            Flow::Downstream => self.downstream.as_ref(),
        }
    }

    fn slot(&mut self, flow: Flow) -> &mut Option<FlowRecord> {
        match flow {
            Flow::Upstream => &mut self.upstream,
            Flow::Downstream => &mut self.downstream,
        }
    }
}

/// Specialization-diversity records keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecializationTable {
    rows: BTreeMap<NodeId, SpecializationRow>,
}

impl SpecializationTable {
    /// Outer join of per-flow records: a node appears if it has a record in
    /// either flow.
    pub fn join(
        upstream: BTreeMap<NodeId, FlowRecord>,
        downstream: BTreeMap<NodeId, FlowRecord>,
    ) -> Self {
        let mut rows: BTreeMap<NodeId, SpecializationRow> = BTreeMap::new();
        for (flow, records) in [(Flow::Upstream, upstream), (Flow::Downstream, downstream)] {
            for (id, record) in records {
                *rows.entry(id).or_default().slot(flow) = Some(record);
            }
        }
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SpecializationRow> {
        self.rows.get(id)
    }

    /// Record of `id` along `flow`, if the node has one.
    pub fn record(&self, id: &str, flow: Flow) -> Option<&FlowRecord> {
        self.rows.get(id)?.get(flow)
    }

    /// Rows in node-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &SpecializationRow)> + '_ {
        self.rows.iter()
    }

    /// Flat column names, per flow: `in_ent_of_avg_U, out_ent_of_avg_U, ...`.
    pub fn columns() -> Vec<String> {
        Flow::BOTH
            .iter()
            .flat_map(|flow| {
                FLOW_FIELDS
                    .iter()
                    .map(move |field| format!("{field}_{}", flow.suffix()))
            })
            .collect()
    }
}

/// Computes specialization-diversity from a fingerprint table and the raw edges.
#[derive(Debug, Clone)]
pub struct SpecializationEngine<'a> {
    table: &'a FingerprintTable,
    edges: &'a EdgeTable,
    nodes: Option<Vec<NodeId>>,
}

impl<'a> SpecializationEngine<'a> {
    pub fn new(table: &'a FingerprintTable, edges: &'a EdgeTable) -> Self {
        Self {
            table,
            edges,
            nodes: None,
        }
    }

    /// Compute records for these ids instead of every fingerprinted node.
    pub fn nodes<I, N>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.nodes = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    fn target_ids(&self) -> Result<Vec<NodeId>> {
        match &self.nodes {
            None => {
                if self.table.is_empty() {
                    return Err(Error::NoValidNodes("fingerprint table is empty".into()));
                }
                Ok(self.table.node_ids().cloned().collect())
            }
            Some(requested) => {
                let ids: BTreeSet<NodeId> = requested.iter().cloned().collect();
                if !ids.iter().any(|id| self.table.contains(id.as_str())) {
                    return Err(Error::NoValidNodes(format!(
                        "none of the {} requested node ids have a fingerprint",
                        ids.len()
                    )));
                }
                Ok(ids.into_iter().collect())
            }
        }
    }

    /// Record for one node, or `None` when it has no partners along `flow`.
    pub fn record(&self, id: &str, flow: Flow) -> Option<FlowRecord> {
        let partners = partners(self.edges, id, flow);
        if partners.is_empty() {
            return None;
        }

        let average = neighborhood_average(self.table, &partners);
        let in_ent_of_avg = shannon_entropy(average.fingerprint.inbound.iter().copied());
        let out_ent_of_avg = shannon_entropy(average.fingerprint.outbound.iter().copied());
        let in_entropy = self.table.entropy(id, Direction::In);
        let out_entropy = self.table.entropy(id, Direction::Out);

        Some(FlowRecord {
            partners: partners.len(),
            contributors: average.contributors,
            in_ent_of_avg,
            out_ent_of_avg,
            in_entropy,
            out_entropy,
            in_mean_entropy: average.in_mean_entropy,
            out_mean_entropy: average.out_mean_entropy,
            in_diff: difference(in_ent_of_avg, in_entropy),
            out_diff: difference(out_ent_of_avg, out_entropy),
        })
    }

    /// Records along one flow. Nodes without partners are absent.
    pub fn one_way(&self, flow: Flow) -> Result<BTreeMap<NodeId, FlowRecord>> {
        let ids = self.target_ids()?;
        let records: BTreeMap<NodeId, FlowRecord> = ids
            .into_iter()
            .filter_map(|id| {
                let record = self.record(id.as_str(), flow)?;
                Some((id, record))
            })
            .collect();
        tracing::debug!(%flow, records = records.len(), "computed flow records");
        Ok(records)
    }

    /// Upstream and downstream records, outer-joined by node id.
    pub fn compute(&self) -> Result<SpecializationTable> {
        let start = Instant::now();
        let upstream = self.one_way(Flow::Upstream)?;
        let downstream = self.one_way(Flow::Downstream)?;
        let table = SpecializationTable::join(upstream, downstream);
        tracing::info!(
            nodes = table.len(),
            elapsed = ?start.elapsed(),
            "computed specialization-diversity"
        );
        Ok(table)
    }

    /// Return the table stored under `key` if present, otherwise compute and store it.
    pub fn compute_cached<S: ArtifactStore>(&self, store: &mut S, key: &str) -> Result<SpecializationTable> {
        let key = artifact_key(key, SPECIALIZATION_ARTIFACT);
        if let Some(table) = store.get::<SpecializationTable>(&key)? {
            tracing::info!(key = %key, rows = table.len(), "loaded cached specialization table");
            return Ok(table);
        }
        let table = self.compute()?;
        store.put(&key, &table)?;
        Ok(table)
    }
}
