//! CSV format support.
//!
//! Columns are looked up by header name, so extra columns and any column
//! order are accepted. In weight and category cells the null tokens `""`,
//! `nan`, `na`, `null` and `none` (any case) mark a missing value. Node id
//! cells are only missing when blank.

use crate::algo::fingerprint::{FingerprintRow, FingerprintTable};
use crate::algo::hubs::HubScore;
use crate::algo::specialization::{Flow, SpecializationTable};
use crate::category::{CategoryIndex, Direction};
use crate::edge::{Edge, EdgeTable, NodeId};
use crate::metadata::NodeMetadata;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const NULL_TOKENS: [&str; 5] = ["", "nan", "na", "null", "none"];

fn is_null(cell: &str) -> bool {
    let cell = cell.trim();
    NULL_TOKENS.iter().any(|t| cell.eq_ignore_ascii_case(t))
}

/// Node ids are opaque: only a blank cell is missing.
fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Rows whose `column` equals `value` are symmetric connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndirectedRule {
    pub column: String,
    pub value: String,
}

/// Column names of an edge list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeColumns {
    pub source: String,
    pub sink: String,
    /// Weight column; every edge weighs 1 when `None`.
    pub weight: Option<String>,
    /// Insert matching rows in both directions.
    pub undirected: Option<UndirectedRule>,
}

impl Default for EdgeColumns {
    fn default() -> Self {
        Self {
            source: "source".to_string(),
            sink: "sink".to_string(),
            weight: Some("weight".to_string()),
            undirected: None,
        }
    }
}

/// Column names of a node metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataColumns {
    pub id: String,
    pub category: String,
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            category: "type".to_string(),
        }
    }
}

fn column(headers: &::csv::StringRecord, name: &str, table: &'static str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            table,
        })
}

/// CSV format handler.
pub struct Csv;

impl Csv {
    /// Read a headered edge list.
    ///
    /// Rows with a null source or sink are skipped, as are rows with a null
    /// weight. A weight that is present but not a number is an error.
    pub fn read_edges<R: Read>(reader: R, columns: &EdgeColumns) -> Result<EdgeTable> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let source = column(&headers, &columns.source, "edge")?;
        let sink = column(&headers, &columns.sink, "edge")?;
        let weight = columns
            .weight
            .as_deref()
            .map(|w| column(&headers, w, "edge"))
            .transpose()?;
        let undirected = columns
            .undirected
            .as_ref()
            .map(|rule| column(&headers, &rule.column, "edge").map(|i| (i, rule.value.as_str())))
            .transpose()?;

        let mut edges = EdgeTable::new();
        let mut skipped = 0usize;
        for result in reader.records() {
            let record = result?;
            let line = record.position().map_or(0, |p| p.line());
            let (Some(s), Some(t)) = (record.get(source), record.get(sink)) else {
                skipped += 1;
                continue;
            };
            if is_blank(s) || is_blank(t) {
                skipped += 1;
                continue;
            }

            let w = match weight {
                None => 1.0,
                Some(i) => {
                    let raw = record.get(i).unwrap_or("");
                    if is_null(raw) {
                        skipped += 1;
                        continue;
                    }
                    raw.trim().parse::<f64>().map_err(|_| Error::ParseWeight {
                        value: raw.to_string(),
                        line,
                    })?
                }
            };

            let symmetric = undirected
                .is_some_and(|(i, value)| record.get(i).is_some_and(|v| v.trim() == value));
            if symmetric {
                edges.push_bidirectional(s.trim(), t.trim(), w)?;
            } else {
                edges.push(Edge::new(s.trim(), t.trim(), w))?;
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "skipped edge rows with null fields");
        }
        tracing::debug!(edges = edges.edge_count(), nodes = edges.node_count(), "read edge list");
        Ok(edges)
    }

    /// Read an edge list from a file.
    pub fn read_edges_path(path: impl AsRef<Path>, columns: &EdgeColumns) -> Result<EdgeTable> {
        Self::read_edges(File::open(path)?, columns)
    }

    /// Read a headered metadata table. Null category cells become `None`.
    pub fn read_metadata<R: Read>(reader: R, columns: &MetadataColumns) -> Result<NodeMetadata> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let id = column(&headers, &columns.id, "metadata")?;
        let category = column(&headers, &columns.category, "metadata")?;

        let mut metadata = NodeMetadata::new();
        for result in reader.records() {
            let record = result?;
            let Some(node) = record.get(id).filter(|v| !is_blank(v)) else {
                continue;
            };
            let label = record
                .get(category)
                .filter(|c| !is_null(c))
                .map(|c| c.trim().to_string());
            metadata.insert(node.trim(), label);
        }
        tracing::debug!(rows = metadata.len(), "read node metadata");
        Ok(metadata)
    }

    /// Read a metadata table from a file.
    pub fn read_metadata_path(
        path: impl AsRef<Path>,
        columns: &MetadataColumns,
    ) -> Result<NodeMetadata> {
        Self::read_metadata(File::open(path)?, columns)
    }

    /// Write `node,<axis...>,in_entropy,out_entropy`.
    pub fn write_fingerprints<W: Write>(writer: W, table: &FingerprintTable) -> Result<()> {
        Self::write_fingerprint_rows(writer, table.index(), table.iter())
    }

    /// Write fingerprint rows laid out on `index`, in the order given.
    pub fn write_fingerprint_rows<'a, W, I>(writer: W, index: &CategoryIndex, rows: I) -> Result<()>
    where
        W: Write,
        I: IntoIterator<Item = (&'a NodeId, &'a FingerprintRow)>,
    {
        let mut writer = ::csv::Writer::from_writer(writer);
        let mut header = vec!["node".to_string()];
        header.extend(index.axis());
        header.extend(Direction::BOTH.map(|d| format!("{}_entropy", d.name())));
        writer.write_record(&header)?;

        for (id, row) in rows {
            let mut record = vec![id.to_string()];
            record.extend(row.fingerprint.axis_values().into_iter().map(cell));
            record.push(cell(row.in_entropy));
            record.push(cell(row.out_entropy));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write `node` followed by every per-flow column, `U` before `D`.
    pub fn write_specialization<W: Write>(writer: W, table: &SpecializationTable) -> Result<()> {
        let mut writer = ::csv::Writer::from_writer(writer);
        let mut header = vec!["node".to_string()];
        header.extend(SpecializationTable::columns());
        writer.write_record(&header)?;

        for (id, row) in table.iter() {
            let mut record = vec![id.to_string()];
            for flow in Flow::BOTH {
                let values = row.get(flow).map(|r| r.values()).unwrap_or([None; 8]);
                record.extend(values.into_iter().map(cell));
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write `rank,node,total,out_diff,in_diff`, rank starting at 1.
    pub fn write_hubs<W: Write>(writer: W, hubs: &[HubScore]) -> Result<()> {
        let mut writer = ::csv::Writer::from_writer(writer);
        writer.write_record(["rank", "node", "total", "out_diff", "in_diff"])?;
        for (rank, hub) in hubs.iter().enumerate() {
            writer.write_record([
                (rank + 1).to_string(),
                hub.node.to_string(),
                hub.total.to_string(),
                cell(hub.record.out_diff),
                cell(hub.record.in_diff),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::fingerprint::FingerprintTableBuilder;
    use crate::edge::Endpoint;

    const EDGES: &str = "\
pre,post,syn,kind
a,b,2,chem
a,c,NaN,chem
b,c,1.5,gap
,c,3,chem
";

    fn edge_columns() -> EdgeColumns {
        EdgeColumns {
            source: "pre".into(),
            sink: "post".into(),
            weight: Some("syn".into()),
            undirected: None,
        }
    }

    #[test]
    fn test_read_edges_named_columns() {
        let edges = Csv::read_edges(EDGES.as_bytes(), &edge_columns()).unwrap();
        // NaN-weight row and null-source row are skipped.
        assert_eq!(edges.edge_count(), 2);
        assert_eq!(edges.incident("a", Endpoint::Source)[0].weight, 2.0);
    }

    #[test]
    fn test_read_edges_undirected_rule() {
        let columns = EdgeColumns {
            undirected: Some(UndirectedRule {
                column: "kind".into(),
                value: "gap".into(),
            }),
            ..edge_columns()
        };
        let edges = Csv::read_edges(EDGES.as_bytes(), &columns).unwrap();
        assert_eq!(edges.edge_count(), 3);
        assert_eq!(edges.incident("c", Endpoint::Source)[0].sink.as_str(), "b");
    }

    #[test]
    fn test_read_edges_without_weight_column() {
        let columns = EdgeColumns {
            weight: None,
            ..edge_columns()
        };
        let edges = Csv::read_edges(EDGES.as_bytes(), &columns).unwrap();
        assert_eq!(edges.edge_count(), 3);
        assert!(edges.edges().all(|e| e.weight == 1.0));
    }

    #[test]
    fn test_missing_column() {
        let err = Csv::read_edges(EDGES.as_bytes(), &EdgeColumns::default()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "source"));
    }

    #[test]
    fn test_bad_weight_reports_line() {
        let data = "source,sink,weight\na,b,1\na,c,heavy\n";
        let err = Csv::read_edges(data.as_bytes(), &EdgeColumns::default()).unwrap_err();
        assert!(matches!(err, Error::ParseWeight { line: 3, .. }));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let data = "source,sink,weight\na,b,-1\n";
        let err = Csv::read_edges(data.as_bytes(), &EdgeColumns::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidWeight { .. }));
    }

    #[test]
    fn test_read_metadata_nulls() {
        let data = "id,type,extra\nn1,motor,x\nn2,,y\nn3,None,z\nn4,sensory,w\n";
        let meta = Csv::read_metadata(data.as_bytes(), &MetadataColumns::default()).unwrap();
        assert_eq!(meta.len(), 4);
        assert_eq!(meta.category("n1"), Some("motor"));
        assert_eq!(meta.category("n2"), None);
        assert_eq!(meta.category("n3"), None);
        assert_eq!(meta.observed_categories(), ["motor", "sensory"]);
    }

    #[test]
    fn test_null_like_ids_are_kept() {
        let data = "source,sink,weight\nNA,None,1\nnull,NA,2\n , NA,3\n";
        let edges = Csv::read_edges(data.as_bytes(), &EdgeColumns::default()).unwrap();
        assert_eq!(edges.edge_count(), 2);
        assert_eq!(edges.incident("NA", Endpoint::Source)[0].sink.as_str(), "None");
        assert_eq!(edges.incident("null", Endpoint::Source)[0].weight, 2.0);

        let data = "id,type\nNA,motor\nnull,NA\n,sensory\n";
        let meta = Csv::read_metadata(data.as_bytes(), &MetadataColumns::default()).unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.category("NA"), Some("motor"));
        assert_eq!(meta.category("null"), None);
    }

    #[test]
    fn test_write_fingerprints_empty_cells() {
        let edges = Csv::read_edges("source,sink,weight\nX,Y,1\n".as_bytes(), &EdgeColumns::default()).unwrap();
        let meta = Csv::read_metadata("id,type\nX,a\nY,b\n".as_bytes(), &MetadataColumns::default()).unwrap();
        let index = CategoryIndex::from_metadata(&meta, None).unwrap();
        let table = FingerprintTableBuilder::new(&edges, &meta, &index).build().unwrap();

        let mut out = Vec::new();
        Csv::write_fingerprints(&mut out, &table).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "node,a_in,a_out,b_in,b_out,in_entropy,out_entropy");
        assert_eq!(lines[1], "X,,0,,1,,0");
        assert_eq!(lines[2], "Y,1,,0,,0,");
    }
}
