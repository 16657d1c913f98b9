//! End-to-end scenarios over small hand-checked networks.

use connectropy_core::{
    rank_hubs, CategoryIndex, Direction, Edge, EdgeTable, FingerprintTableBuilder, Flow,
    MemoryStore, NodeMetadata, Pipeline, PipelineConfig, SpecializationEngine,
};

fn metadata(rows: &[(&str, &str)]) -> NodeMetadata {
    rows.iter()
        .map(|&(id, c)| (id, Some(c.to_string())))
        .collect()
}

/// Ring of `n` nodes with both directions plus a skip chord, categories cycling over three labels.
fn ring(n: usize) -> (EdgeTable, NodeMetadata) {
    let mut edges = EdgeTable::new();
    let mut meta = NodeMetadata::new();
    for i in 0..n {
        let id = format!("n{i:02}");
        let next = format!("n{:02}", (i + 1) % n);
        let skip = format!("n{:02}", (i + 2) % n);
        edges.push_bidirectional(id.as_str(), next.as_str(), (i % 4 + 1) as f64).unwrap();
        edges.push(Edge::new(id.as_str(), skip.as_str(), 1.0)).unwrap();
        meta.insert(id, Some(["alpha", "beta", "gamma"][i % 3].to_string()));
    }
    (edges, meta)
}

#[test]
fn scenario_same_category_targets_collapse() {
    // X -> Y (2), X -> Z (2); Y and Z are both "b".
    let edges = EdgeTable::from_edges([Edge::new("X", "Y", 2.0), Edge::new("X", "Z", 2.0)]).unwrap();
    let meta = metadata(&[("X", "a"), ("Y", "b"), ("Z", "b")]);
    let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    assert_eq!(index.axis(), ["a_in", "a_out", "b_in", "b_out"]);

    let table = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();
    let x = &table.get("X").unwrap().fingerprint;
    assert_eq!(x.outbound, [Some(0.0), Some(1.0)]);
    assert_eq!(x.inbound, [None, None]);
    assert_eq!(table.entropy("X", Direction::Out), Some(0.0));
    assert_eq!(table.entropy("X", Direction::In), None);

    let y = &table.get("Y").unwrap().fingerprint;
    assert_eq!(y.inbound, [Some(1.0), Some(0.0)]);
    assert_eq!(table.entropy("Y", Direction::In), Some(0.0));
}

#[test]
fn scenario_sink_node_is_never_ranked() {
    // N only receives.
    let edges = EdgeTable::from_edges([
        Edge::new("A", "B", 1.0),
        Edge::new("B", "A", 1.0),
        Edge::new("A", "N", 3.0),
        Edge::new("B", "N", 1.0),
    ])
    .unwrap();
    let meta = metadata(&[("A", "p"), ("B", "q"), ("N", "r")]);
    let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    let fingerprints = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();
    assert_eq!(fingerprints.entropy("N", Direction::Out), None);

    let table = SpecializationEngine::new(&fingerprints, &edges).compute().unwrap();
    assert!(table.record("N", Flow::Downstream).is_none());
    let up = table.record("N", Flow::Upstream).unwrap();
    assert_eq!(up.out_entropy, None);
    assert_eq!(up.out_diff, None);

    for flow in Flow::BOTH {
        assert!(rank_hubs(&table, flow, 100).iter().all(|h| h.node.as_str() != "N"));
    }
}

#[test]
fn scenario_k_larger_than_table() {
    let (edges, meta) = ring(10);
    let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    let fingerprints = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();
    let table = SpecializationEngine::new(&fingerprints, &edges).compute().unwrap();

    let hubs = rank_hubs(&table, Flow::Downstream, 1000);
    assert_eq!(hubs.len(), 10);
    assert!(hubs.windows(2).all(|w| w[0].total >= w[1].total));
}

#[test]
fn undefined_partner_halves_propagate_to_diffs() {
    // Both of H's downstream partners are pure sinks.
    let edges = EdgeTable::from_edges([
        Edge::new("S", "H", 1.0),
        Edge::new("H", "T1", 1.0),
        Edge::new("H", "T2", 1.0),
    ])
    .unwrap();
    let meta = metadata(&[("S", "s"), ("H", "h"), ("T1", "t"), ("T2", "u")]);
    let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    let fingerprints = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();
    let table = SpecializationEngine::new(&fingerprints, &edges).compute().unwrap();

    let down = table.record("H", Flow::Downstream).unwrap();
    assert_eq!(down.out_ent_of_avg, None);
    assert_eq!(down.out_diff, None);
    assert_eq!(down.total(), None);
    // The in-halves are defined: both sinks receive only from "h".
    assert_eq!(down.in_ent_of_avg, Some(0.0));
    assert_eq!(down.in_diff, Some(0.0));
    assert!(rank_hubs(&table, Flow::Downstream, 10).is_empty());
}

#[test]
fn explicit_axis_restricts_categories() {
    let (edges, meta) = ring(6);
    let categories = vec!["gamma".to_string(), "alpha".to_string()];
    let index = CategoryIndex::from_metadata(&meta, Some(categories.as_slice())).unwrap();
    let table = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();

    assert_eq!(table.index().categories(), ["gamma", "alpha"]);
    for (_, row) in table.iter() {
        for direction in Direction::BOTH {
            let half = row.fingerprint.half(direction);
            assert_eq!(half.len(), 2);
            if row.fingerprint.is_defined(direction) {
                let sum: f64 = half.iter().flatten().sum();
                assert!((sum - 1.0).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn cached_tables_survive_input_changes() {
    let (edges, meta) = ring(8);
    let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    let mut store = MemoryStore::new();

    let fingerprints = FingerprintTableBuilder::new(&edges, &meta, &index)
        .build_cached(&mut store, "ring")
        .unwrap();
    let first = SpecializationEngine::new(&fingerprints, &edges)
        .compute_cached(&mut store, "ring")
        .unwrap();
    assert_eq!(store.len(), 2);

    // A different network under the same key returns the stored tables.
    let (other, other_meta) = ring(5);
    let cached = FingerprintTableBuilder::new(&other, &other_meta, &index)
        .build_cached(&mut store, "ring")
        .unwrap();
    assert_eq!(cached, fingerprints);
    let second = SpecializationEngine::new(&cached, &other)
        .compute_cached(&mut store, "ring")
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn pipeline_matches_manual_stages() {
    let (edges, meta) = ring(7);
    let pipeline = Pipeline::new(edges.clone(), meta.clone(), PipelineConfig::default()).unwrap();

    let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    let fingerprints = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();
    let manual = SpecializationEngine::new(&fingerprints, &edges).compute().unwrap();

    assert_eq!(pipeline.specialization().unwrap(), manual);
    assert_eq!(
        pipeline.hubs(Flow::Upstream, Some(3)).unwrap(),
        rank_hubs(&manual, Flow::Upstream, 3)
    );
}
