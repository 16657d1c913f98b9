//! Connectivity fingerprints: where a node's edges go, by partner category.
//!
//! # Construction
//!
//! For one node and one direction:
//!
//! 1. take the edges where the node sits at the anchor endpoint,
//! 2. look up each partner's category, dropping partners without one,
//! 3. sum weights per category, keeping only categories on the axis,
//! 4. divide by the total so the half sums to 1.
//!
//! Categories with no weight get an explicit `0.0`. A half with nothing left
//! after step 3 stays entirely `None`, so "no edges this way" remains
//! distinguishable from "edges, but none to category c".
//!
//! Fingerprints of different nodes are independent; with the `parallel`
//! feature the table is built across node ids with rayon. Rows are collected
//! into a `BTreeMap` keyed by node id, so the result never depends on
//! scheduling.

use crate::algo::entropy::shannon_entropy;
use crate::category::{CategoryIndex, Direction};
use crate::edge::{EdgeTable, Endpoint, NodeId};
use crate::metadata::NodeMetadata;
use crate::store::{artifact_key, ArtifactStore, FINGERPRINT_ARTIFACT};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How one half of a fingerprint is gathered from the edge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionSpec {
    /// Endpoint occupied by the node being fingerprinted.
    pub anchor: Endpoint,
    /// Endpoint whose category is counted.
    pub partner: Endpoint,
    /// Half of the axis the result fills.
    pub direction: Direction,
}

impl DirectionSpec {
    /// Incoming edges, grouped by source category.
    pub const IN: Self = Self {
        anchor: Endpoint::Sink,
        partner: Endpoint::Source,
        direction: Direction::In,
    };

    /// Outgoing edges, grouped by sink category.
    pub const OUT: Self = Self {
        anchor: Endpoint::Source,
        partner: Endpoint::Sink,
        direction: Direction::Out,
    };

    pub const BOTH: [Self; 2] = [Self::IN, Self::OUT];
}

/// A node's in/out category distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Share of incoming weight per category; all `None` without incoming edges.
    pub inbound: Vec<Option<f64>>,
    /// Share of outgoing weight per category; all `None` without outgoing edges.
    pub outbound: Vec<Option<f64>>,
}

impl Fingerprint {
    /// A fingerprint with both halves undefined.
    pub fn undefined(width: usize) -> Self {
        Self {
            inbound: vec![None; width],
            outbound: vec![None; width],
        }
    }

    pub fn half(&self, direction: Direction) -> &[Option<f64>] {
        match direction {
            Direction::In => &self.inbound,
            Direction::Out => &self.outbound,
        }
    }

    fn half_mut(&mut self, direction: Direction) -> &mut Vec<Option<f64>> {
        match direction {
            Direction::In => &mut self.inbound,
            Direction::Out => &mut self.outbound,
        }
    }

    /// Whether the half carries a distribution.
    pub fn is_defined(&self, direction: Direction) -> bool {
        self.half(direction).iter().any(Option::is_some)
    }

    /// Entropy of one half.
    pub fn entropy(&self, direction: Direction) -> Option<f64> {
        shannon_entropy(self.half(direction).iter().copied())
    }

    /// Values laid out like [`CategoryIndex::axis`]: `c0_in, c0_out, c1_in, ...`.
    pub fn axis_values(&self) -> Vec<Option<f64>> {
        self.inbound
            .iter()
            .zip(&self.outbound)
            .flat_map(|(&i, &o)| [i, o])
            .collect()
    }
}

/// Normalized category distribution of one half, or `None` when empty.
fn category_distribution(
    id: &str,
    edges: &EdgeTable,
    metadata: &NodeMetadata,
    index: &CategoryIndex,
    spec: DirectionSpec,
) -> Option<Vec<f64>> {
    let matched: Vec<(usize, f64)> = edges
        .incident(id, spec.anchor)
        .into_iter()
        .filter_map(|edge| {
            let partner = edge.endpoint(spec.partner);
            let pos = metadata
                .category(partner.as_str())
                .and_then(|c| index.position(c))?;
            Some((pos, edge.weight))
        })
        .collect();
    if matched.is_empty() {
        return None;
    }

    let mut grouped = group_weights(&matched, index.len(), 1.0);
    let mut total: f64 = grouped.iter().sum();
    if !total.is_finite() {
        // Individually finite weights whose sum overflows: scale by the largest first.
        let largest = matched.iter().map(|&(_, w)| w).fold(0.0, f64::max);
        grouped = group_weights(&matched, index.len(), largest);
        total = grouped.iter().sum();
    }
    // All-zero weights cannot be normalized; treat like no edges.
    if total <= 0.0 {
        return None;
    }
    Some(grouped.into_iter().map(|w| w / total).collect())
}

fn group_weights(matched: &[(usize, f64)], len: usize, scale: f64) -> Vec<f64> {
    let mut grouped = vec![0.0; len];
    for &(pos, weight) in matched {
        grouped[pos] += weight / scale;
    }
    grouped
}

/// Fingerprint of one node over the given direction specs.
///
/// Halves not covered by `specs` stay undefined. Never fails: a node with no
/// edges, or none whose partner category is known, gets undefined halves.
pub fn node_fingerprint_with(
    id: &str,
    edges: &EdgeTable,
    metadata: &NodeMetadata,
    index: &CategoryIndex,
    specs: &[DirectionSpec],
) -> Fingerprint {
    let mut fingerprint = Fingerprint::undefined(index.len());
    for &spec in specs {
        if let Some(distribution) = category_distribution(id, edges, metadata, index, spec) {
            *fingerprint.half_mut(spec.direction) = distribution.into_iter().map(Some).collect();
        }
    }
    fingerprint
}

/// Fingerprint of one node, both halves.
///
/// # Example
///
/// ```rust
/// use connectropy_core::algo::fingerprint::node_fingerprint;
/// use connectropy_core::{CategoryIndex, Edge, EdgeTable, NodeMetadata};
///
/// let edges = EdgeTable::from_edges([Edge::new("X", "Y", 2.0), Edge::new("X", "Z", 2.0)]).unwrap();
/// let meta: NodeMetadata = [
///     ("X", Some("a".to_string())),
///     ("Y", Some("b".to_string())),
///     ("Z", Some("b".to_string())),
/// ]
/// .into_iter()
/// .collect();
/// let index = CategoryIndex::from_metadata(&meta, None).unwrap();
///
/// let fp = node_fingerprint("X", &edges, &meta, &index);
/// assert_eq!(fp.outbound, [Some(0.0), Some(1.0)]);
/// assert_eq!(fp.inbound, [None, None]);
/// ```
pub fn node_fingerprint(
    id: &str,
    edges: &EdgeTable,
    metadata: &NodeMetadata,
    index: &CategoryIndex,
) -> Fingerprint {
    node_fingerprint_with(id, edges, metadata, index, &DirectionSpec::BOTH)
}

/// One row of a fingerprint table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintRow {
    pub fingerprint: Fingerprint,
    /// Entropy of the in half, when the table was annotated.
    pub in_entropy: Option<f64>,
    /// Entropy of the out half, when the table was annotated.
    pub out_entropy: Option<f64>,
}

impl FingerprintRow {
    fn new(fingerprint: Fingerprint, annotate: bool) -> Self {
        let (in_entropy, out_entropy) = if annotate {
            (
                fingerprint.entropy(Direction::In),
                fingerprint.entropy(Direction::Out),
            )
        } else {
            (None, None)
        };
        Self {
            fingerprint,
            in_entropy,
            out_entropy,
        }
    }

    /// Stored entropy annotation for `direction`.
    pub fn stored_entropy(&self, direction: Direction) -> Option<f64> {
        match direction {
            Direction::In => self.in_entropy,
            Direction::Out => self.out_entropy,
        }
    }
}

/// Fingerprints for a node set over one fixed category axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintTable {
    index: CategoryIndex,
    annotated: bool,
    rows: BTreeMap<NodeId, FingerprintRow>,
}

impl FingerprintTable {
    /// The axis every row is laid out on.
    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    /// Whether rows carry entropy annotations.
    pub fn is_annotated(&self) -> bool {
        self.annotated
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&FingerprintRow> {
        self.rows.get(id)
    }

    /// Rows in node-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &FingerprintRow)> + '_ {
        self.rows.iter()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.rows.keys()
    }

    /// Entropy of a node's half: the annotation if present, otherwise computed.
    ///
    /// `None` for unknown ids and undefined halves.
    pub fn entropy(&self, id: &str, direction: Direction) -> Option<f64> {
        let row = self.rows.get(id)?;
        if self.annotated {
            row.stored_entropy(direction)
        } else {
            row.fingerprint.entropy(direction)
        }
    }

    /// Annotate every row with its in/out entropy.
    pub fn with_entropy(mut self) -> Self {
        if !self.annotated {
            for row in self.rows.values_mut() {
                row.in_entropy = row.fingerprint.entropy(Direction::In);
                row.out_entropy = row.fingerprint.entropy(Direction::Out);
            }
            self.annotated = true;
        }
        self
    }
}

/// Builds a [`FingerprintTable`].
///
/// # Example
///
/// ```rust
/// use connectropy_core::algo::fingerprint::FingerprintTableBuilder;
/// use connectropy_core::{CategoryIndex, Edge, EdgeTable, NodeMetadata};
///
/// let edges = EdgeTable::from_edges([Edge::new("X", "Y", 1.0)]).unwrap();
/// let meta: NodeMetadata = [("X", Some("a".to_string())), ("Y", Some("b".to_string()))]
///     .into_iter()
///     .collect();
/// let index = CategoryIndex::from_metadata(&meta, None).unwrap();
///
/// let table = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.entropy("X", connectropy_core::Direction::Out), Some(0.0));
/// ```
#[derive(Debug, Clone)]
pub struct FingerprintTableBuilder<'a> {
    edges: &'a EdgeTable,
    metadata: &'a NodeMetadata,
    index: &'a CategoryIndex,
    nodes: Option<Vec<NodeId>>,
    entropy: bool,
    parallel: bool,
}

impl<'a> FingerprintTableBuilder<'a> {
    pub fn new(edges: &'a EdgeTable, metadata: &'a NodeMetadata, index: &'a CategoryIndex) -> Self {
        Self {
            edges,
            metadata,
            index,
            nodes: None,
            entropy: true,
            parallel: cfg!(feature = "parallel"),
        }
    }

    /// Restrict the table to these ids instead of every edge endpoint.
    pub fn nodes<I, N>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.nodes = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Annotate rows with in/out entropy (default: on).
    pub fn with_entropy(mut self, entropy: bool) -> Self {
        self.entropy = entropy;
        self
    }

    /// Build rows in parallel when the `parallel` feature is enabled (default: on).
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Row for a single node, without building the table.
    pub fn node_row(&self, id: &str) -> FingerprintRow {
        let fingerprint = node_fingerprint(id, self.edges, self.metadata, self.index);
        FingerprintRow::new(fingerprint, self.entropy)
    }

    fn target_ids(&self) -> Result<Vec<NodeId>> {
        match &self.nodes {
            None => {
                if self.edges.is_empty() {
                    return Err(Error::NoValidNodes("edge table is empty".into()));
                }
                Ok(self.edges.node_ids())
            }
            Some(requested) => {
                let ids: BTreeSet<NodeId> = requested.iter().cloned().collect();
                let found = ids
                    .iter()
                    .filter(|id| self.edges.contains_node(id.as_str()))
                    .count();
                if found == 0 {
                    return Err(Error::NoValidNodes(format!(
                        "none of the {} requested node ids appear in the edge table",
                        ids.len()
                    )));
                }
                if found < ids.len() {
                    tracing::debug!(
                        requested = ids.len(),
                        found,
                        "some requested nodes have no edges; their rows stay undefined"
                    );
                }
                Ok(ids.into_iter().collect())
            }
        }
    }

    /// Compute fingerprints for the node set.
    ///
    /// Fails with [`Error::NoValidNodes`] when the node set is empty or no
    /// requested id occurs in the edge table.
    pub fn build(&self) -> Result<FingerprintTable> {
        let start = Instant::now();
        let ids = self.target_ids()?;

        let rows: BTreeMap<NodeId, FingerprintRow> = if self.parallel {
            self.rows_parallel(&ids)
        } else {
            ids.iter()
                .map(|id| (id.clone(), self.node_row(id.as_str())))
                .collect()
        };

        tracing::info!(
            nodes = rows.len(),
            categories = self.index.len(),
            entropy = self.entropy,
            elapsed = ?start.elapsed(),
            "built fingerprint table"
        );

        Ok(FingerprintTable {
            index: self.index.clone(),
            annotated: self.entropy,
            rows,
        })
    }

    #[cfg(feature = "parallel")]
    fn rows_parallel(&self, ids: &[NodeId]) -> BTreeMap<NodeId, FingerprintRow> {
        ids.par_iter()
            .map(|id| (id.clone(), self.node_row(id.as_str())))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn rows_parallel(&self, ids: &[NodeId]) -> BTreeMap<NodeId, FingerprintRow> {
        ids.iter()
            .map(|id| (id.clone(), self.node_row(id.as_str())))
            .collect()
    }

    /// Return the table stored under `key` if present, otherwise build it and store it.
    ///
    /// Presence is all that is checked. A stored table built on a different
    /// axis is still returned unchanged (with a warning); deciding when a
    /// cached table is stale is up to the caller.
    pub fn build_cached<S: ArtifactStore>(&self, store: &mut S, key: &str) -> Result<FingerprintTable> {
        let key = artifact_key(key, FINGERPRINT_ARTIFACT);
        if let Some(table) = store.get::<FingerprintTable>(&key)? {
            if table.index() != self.index {
                tracing::warn!(
                    key = %key,
                    cached = ?table.index().categories(),
                    requested = ?self.index.categories(),
                    "cached fingerprint table was built on a different category axis"
                );
            }
            tracing::info!(key = %key, rows = table.len(), "loaded cached fingerprint table");
            return Ok(table);
        }

        let table = self.build()?;
        store.put(&key, &table)?;
        Ok(table)
    }
}
