//! Tabular input and output.
//!
//! Inputs are headered CSV tables addressed by column name:
//! - an edge list (`source`, `sink`, optional `weight`)
//! - node metadata (`id`, `type`)
//!
//! Outputs are flat CSV tables with undefined values written as empty cells.
//! Every computed table also implements `serde::Serialize` for JSON export.

mod csv;

pub use self::csv::{Csv, EdgeColumns, MetadataColumns, UndirectedRule};
