//! Connectivity fingerprints, entropy and hub ranking for annotated connectomes.
//!
//! This crate re-exports `connectropy-core`. The command-line driver lives in
//! `connectropy-cli`.
//!
//! # Example
//!
//! ```rust
//! use connectropy::{Edge, EdgeTable, Flow, NodeMetadata, Pipeline, PipelineConfig};
//!
//! let edges = EdgeTable::from_edges([
//!     Edge::new("PN1", "KC1", 5.0),
//!     Edge::new("PN2", "KC1", 3.0),
//!     Edge::new("KC1", "MBON1", 4.0),
//!     Edge::new("MBON1", "PN1", 1.0),
//! ])
//! .unwrap();
//! let metadata: NodeMetadata = [("PN1", "PN"), ("PN2", "PN"), ("KC1", "KC"), ("MBON1", "MBON")]
//!     .into_iter()
//!     .map(|(id, c)| (id, Some(c.to_string())))
//!     .collect();
//!
//! let pipeline = Pipeline::new(edges, metadata, PipelineConfig::default()).unwrap();
//! let fingerprints = pipeline.fingerprints().unwrap();
//! println!("{} fingerprints over {:?}", fingerprints.len(), pipeline.index().axis());
//!
//! for hub in pipeline.hubs(Flow::Downstream, Some(3)).unwrap() {
//!     println!("{} {:.3}", hub.node, hub.total);
//! }
//! ```
//!
//! # Loading CSV inputs
//!
//! ```rust,ignore
//! use connectropy::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::from_json_file("connectropy.json")?;
//! let pipeline = Pipeline::load("edges.csv", "nodes.csv", config)?;
//! let table = pipeline.specialization()?;
//! ```

// Re-export core types
pub use connectropy_core::{
    node_fingerprint, partners, rank_hubs, shannon_entropy, ArtifactStore, CacheConfig,
    CategoryIndex, Coverage, DirStore, Direction, DirectionSpec, Edge, EdgeRecord, EdgeTable,
    EdgeTableStats, Encoding, Endpoint, Error, Fingerprint, FingerprintRow, FingerprintTable,
    FingerprintTableBuilder, Flow, FlowRecord, HubScore, MemoryStore, NodeId, NodeMetadata,
    Pipeline, PipelineConfig, Result, SpecializationEngine, SpecializationRow,
    SpecializationTable,
};

// Re-export petgraph for advanced graph operations
pub use connectropy_core::petgraph;

/// CSV input and output.
pub mod formats {
    pub use connectropy_core::formats::*;
}

/// Fingerprint, entropy, specialization and hub algorithms.
pub mod algo {
    pub use connectropy_core::algo::*;
}

/// Keyed storage for computed tables.
pub mod store {
    pub use connectropy_core::store::*;
}
