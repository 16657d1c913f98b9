//! Hub ranking by total specialization-diversity.
//!
//! A node's score along one flow is `out_diff + in_diff`. Nodes whose record
//! is missing, or whose diffs are undefined or non-finite, are not ranked.
//! Ties break by node id so the ranking is reproducible.

use crate::algo::specialization::{Flow, FlowRecord, SpecializationTable};
use crate::edge::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A ranked node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubScore {
    pub node: NodeId,
    /// `out_diff + in_diff`.
    pub total: f64,
    pub record: FlowRecord,
}

/// Top `k` nodes by total specialization-diversity along `flow`, descending.
///
/// Returns fewer than `k` when fewer nodes are rankable.
pub fn rank_hubs(table: &SpecializationTable, flow: Flow, k: usize) -> Vec<HubScore> {
    let mut scores: Vec<HubScore> = table
        .iter()
        .filter_map(|(id, row)| {
            let record = row.get(flow)?;
            Some(HubScore {
                node: id.clone(),
                total: record.total()?,
                record: record.clone(),
            })
        })
        .collect();

    scores.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.node.cmp(&b.node))
    });
    scores.truncate(k);
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(in_diff: Option<f64>, out_diff: Option<f64>) -> FlowRecord {
        FlowRecord {
            partners: 1,
            contributors: 1,
            in_ent_of_avg: None,
            out_ent_of_avg: None,
            in_entropy: None,
            out_entropy: None,
            in_mean_entropy: None,
            out_mean_entropy: None,
            in_diff,
            out_diff,
        }
    }

    fn table(rows: &[(&str, Option<f64>, Option<f64>)]) -> SpecializationTable {
        let downstream: BTreeMap<NodeId, FlowRecord> = rows
            .iter()
            .map(|&(id, i, o)| (NodeId::from(id), record(i, o)))
            .collect();
        SpecializationTable::join(BTreeMap::new(), downstream)
    }

    fn names(hubs: &[HubScore]) -> Vec<&str> {
        hubs.iter().map(|h| h.node.as_str()).collect()
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let t = table(&[
            ("a", Some(0.1), Some(0.1)),
            ("b", Some(1.0), Some(0.5)),
            ("c", Some(-0.2), Some(0.0)),
            ("d", Some(0.5), Some(0.5)),
        ]);
        let hubs = rank_hubs(&t, Flow::Downstream, 3);
        assert_eq!(names(&hubs), ["b", "d", "a"]);
        assert!((hubs[0].total - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_and_non_finite_are_skipped() {
        let t = table(&[
            ("a", Some(0.1), None),
            ("b", None, None),
            ("c", Some(f64::INFINITY), Some(0.0)),
            ("d", Some(0.0), Some(0.0)),
        ]);
        assert_eq!(names(&rank_hubs(&t, Flow::Downstream, 10)), ["d"]);
    }

    #[test]
    fn test_ties_break_by_node_id() {
        let t = table(&[("z", Some(1.0), Some(0.0)), ("m", Some(0.5), Some(0.5))]);
        assert_eq!(names(&rank_hubs(&t, Flow::Downstream, 2)), ["m", "z"]);
    }

    #[test]
    fn test_other_flow_and_zero_k() {
        let t = table(&[("a", Some(1.0), Some(1.0))]);
        assert!(rank_hubs(&t, Flow::Upstream, 5).is_empty());
        assert!(rank_hubs(&t, Flow::Downstream, 0).is_empty());
    }
}
