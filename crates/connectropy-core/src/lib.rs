// Allow minor clippy style warnings at crate level
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

//! Connectivity fingerprints and entropy-based specialization metrics for
//! annotated, weighted directed graphs.
//!
//! The typical input is a connectome: cells annotated with a cell type,
//! edges weighted by synapse count. For every node this crate computes
//!
//! - [`Fingerprint`]: which categories its incoming and outgoing weight connects to,
//! - the Shannon entropy of each half of that fingerprint,
//! - a neighborhood-averaged entropy over its upstream or downstream partners,
//!   and the difference between the two,
//!
//! and ranks nodes whose own specialization diverges most from their
//! neighborhood as hubs.
//!
//! # Example
//!
//! ```rust
//! use connectropy_core::{
//!     rank_hubs, CategoryIndex, Direction, Edge, EdgeTable, FingerprintTableBuilder, Flow,
//!     NodeMetadata, SpecializationEngine,
//! };
//!
//! let edges = EdgeTable::from_edges([
//!     Edge::new("X", "Y", 2.0),
//!     Edge::new("X", "Z", 2.0),
//!     Edge::new("Y", "X", 1.0),
//! ])
//! .unwrap();
//! let metadata: NodeMetadata = [("X", "a"), ("Y", "b"), ("Z", "b")]
//!     .into_iter()
//!     .map(|(id, c)| (id, Some(c.to_string())))
//!     .collect();
//!
//! let index = CategoryIndex::from_metadata(&metadata, None).unwrap();
//! let fingerprints = FingerprintTableBuilder::new(&edges, &metadata, &index)
//!     .build()
//!     .unwrap();
//! // Both of X's targets are category "b".
//! assert_eq!(fingerprints.entropy("X", Direction::Out), Some(0.0));
//!
//! let table = SpecializationEngine::new(&fingerprints, &edges).compute().unwrap();
//! let hubs = rank_hubs(&table, Flow::Downstream, 5);
//! assert!(hubs.len() <= 5);
//! ```
//!
//! # Undefined values
//!
//! A node without edges in some direction has no distribution there, and so
//! no entropy. Those values are `None` throughout, never `0.0` and never an
//! error.

pub mod algo;
mod category;
pub mod config;
mod edge;
mod error;
pub mod formats;
mod metadata;
pub mod pipeline;
pub mod store;

pub use algo::entropy::shannon_entropy;
pub use algo::fingerprint::{
    node_fingerprint, DirectionSpec, Fingerprint, FingerprintRow, FingerprintTable,
    FingerprintTableBuilder,
};
pub use algo::hubs::{rank_hubs, HubScore};
pub use algo::specialization::{
    partners, Flow, FlowRecord, SpecializationEngine, SpecializationRow, SpecializationTable,
};
pub use category::{CategoryIndex, Direction};
pub use config::{CacheConfig, PipelineConfig};
pub use edge::{Coverage, Edge, EdgeRecord, EdgeTable, EdgeTableStats, Endpoint, NodeId};
pub use error::{Error, Result};
pub use metadata::NodeMetadata;
pub use pipeline::Pipeline;
pub use store::{ArtifactStore, DirStore, Encoding, MemoryStore};

// Re-export petgraph for callers that want the underlying graph types.
pub use petgraph;
