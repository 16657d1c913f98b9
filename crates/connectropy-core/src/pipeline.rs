//! End-to-end batch: inputs -> fingerprints -> specialization -> hubs.

use crate::algo::fingerprint::{FingerprintTable, FingerprintTableBuilder};
use crate::algo::hubs::{rank_hubs, HubScore};
use crate::algo::specialization::{Flow, SpecializationEngine, SpecializationTable};
use crate::category::CategoryIndex;
use crate::config::PipelineConfig;
use crate::edge::{Coverage, EdgeTable};
use crate::formats::Csv;
use crate::metadata::NodeMetadata;
use crate::store::{artifact_key, ArtifactStore, DirStore, SPECIALIZATION_ARTIFACT};
use crate::Result;
use std::path::Path;

/// Loaded inputs plus the category axis derived from them.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    edges: EdgeTable,
    metadata: NodeMetadata,
    index: CategoryIndex,
}

impl Pipeline {
    /// Validate `config`, optionally aggregate duplicate edges, and fix the category axis.
    pub fn new(edges: EdgeTable, metadata: NodeMetadata, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let edges = if config.aggregate {
            edges.aggregated()?
        } else {
            edges
        };
        let index = CategoryIndex::from_metadata(&metadata, config.categories.as_deref())?;

        let coverage = edges.coverage(&metadata, &index);
        log_coverage(&coverage);

        Ok(Self {
            config,
            edges,
            metadata,
            index,
        })
    }

    /// Read both CSV inputs using the column names in `config`.
    pub fn load(
        edges: impl AsRef<Path>,
        metadata: impl AsRef<Path>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let edge_table = Csv::read_edges_path(edges, &config.edge_columns)?;
        let metadata = Csv::read_metadata_path(metadata, &config.metadata_columns)?;
        Self::new(edge_table, metadata, config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    pub fn metadata(&self) -> &NodeMetadata {
        &self.metadata
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    pub fn coverage(&self) -> Coverage {
        self.edges.coverage(&self.metadata, &self.index)
    }

    /// Builder over every edge endpoint, configured from the pipeline config.
    pub fn fingerprint_builder(&self) -> FingerprintTableBuilder<'_> {
        FingerprintTableBuilder::new(&self.edges, &self.metadata, &self.index)
            .with_entropy(self.config.with_entropy)
            .parallel(self.config.parallel)
    }

    fn store(&self) -> Result<Option<(DirStore, &str)>> {
        let Some(cache) = &self.config.cache else {
            return Ok(None);
        };
        let store = DirStore::new(&cache.dir, cache.encoding)?;
        Ok(Some((store, cache.key.as_str())))
    }

    /// Fingerprints of every edge endpoint, read from the cache when configured.
    ///
    /// Partners of a node can be any endpoint, so the table always covers all
    /// of them; `config.nodes` only narrows the specialization output.
    pub fn fingerprints(&self) -> Result<FingerprintTable> {
        match self.store()? {
            Some((mut store, key)) => self.fingerprint_builder().build_cached(&mut store, key),
            None => self.fingerprint_builder().build(),
        }
    }

    fn engine<'a>(&'a self, table: &'a FingerprintTable) -> SpecializationEngine<'a> {
        let engine = SpecializationEngine::new(table, &self.edges);
        match &self.config.nodes {
            Some(nodes) => engine.nodes(nodes.iter().map(String::as_str)),
            None => engine,
        }
    }

    /// Upstream/downstream specialization table.
    ///
    /// With a cache configured, a stored specialization table is returned
    /// without touching fingerprints at all.
    pub fn specialization(&self) -> Result<SpecializationTable> {
        let Some((mut store, key)) = self.store()? else {
            let table = self.fingerprints()?;
            return self.engine(&table).compute();
        };

        let cached = artifact_key(key, SPECIALIZATION_ARTIFACT);
        if let Some(table) = store.get::<SpecializationTable>(&cached)? {
            tracing::info!(key = %cached, rows = table.len(), "loaded cached specialization table");
            return Ok(table);
        }
        let fingerprints = self.fingerprint_builder().build_cached(&mut store, key)?;
        let table = self.engine(&fingerprints).compute()?;
        store.put(&cached, &table)?;
        Ok(table)
    }

    /// Top hubs along `flow`; `top` falls back to `config.top`.
    pub fn hubs(&self, flow: Flow, top: Option<usize>) -> Result<Vec<HubScore>> {
        let table = self.specialization()?;
        Ok(rank_hubs(&table, flow, top.unwrap_or(self.config.top)))
    }
}

fn log_coverage(coverage: &Coverage) {
    if coverage.endpoints > 0 && coverage.resolved() == 0 {
        tracing::warn!(
            endpoints = coverage.endpoints,
            unknown = coverage.unknown,
            outside_axis = coverage.outside_axis,
            "no edge endpoint has a category on the axis; every fingerprint will be undefined"
        );
    } else {
        tracing::debug!(
            endpoints = coverage.endpoints,
            unknown = coverage.unknown,
            outside_axis = coverage.outside_axis,
            resolved = coverage.resolved_fraction(),
            "annotation coverage"
        );
    }
}
