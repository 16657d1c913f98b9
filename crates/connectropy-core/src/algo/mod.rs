//! Entropy-based connectivity algorithms.
//!
//! - **Fingerprints**: per-node category distribution of edges ([`fingerprint`])
//! - **Entropy**: Shannon entropy of a distribution ([`entropy`])
//! - **Specialization**: node entropy versus neighborhood entropy ([`specialization`])
//! - **Hubs**: ranking by specialization-diversity ([`hubs`])
//!
//! | Stage | Input | Output | Cost |
//! |-------|-------|--------|------|
//! | Fingerprint | edges, metadata, axis | one row per node | O(E) |
//! | Specialization | fingerprints, edges | one row per node | O(E × C) |
//! | Hubs | specialization table | top K nodes | O(V log V) |

/// Shannon entropy over sparse probability vectors.
pub mod entropy;

/// Connectivity fingerprints and the fingerprint table.
pub mod fingerprint;

/// Neighborhood specialization-diversity.
pub mod specialization;

/// Hub ranking.
pub mod hubs;
