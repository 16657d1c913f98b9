//! Connectropy CLI - connectivity fingerprints and specialization from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Node/edge counts, category axis and annotation coverage
//! connectropy stats edges.csv nodes.csv
//!
//! # Fingerprint table (or a single node)
//! connectropy fingerprint edges.csv nodes.csv -o fingerprints.csv
//! connectropy fingerprint edges.csv nodes.csv --node 10977
//!
//! # Upstream/downstream specialization, cached between runs
//! connectropy specialization edges.csv nodes.csv --cache-dir cache --cache-key manc
//!
//! # Top hubs
//! connectropy hubs edges.csv nodes.csv --flow down --top 20
//! ```
//!
//! Inputs are headered CSV files. Column names default to
//! `source,sink,weight` and `id,type`; override them with flags or a JSON
//! `--config` file.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use connectropy_core::formats::{Csv, UndirectedRule};
use connectropy_core::{CacheConfig, Encoding, Flow, NodeId, Pipeline, PipelineConfig};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "connectropy")]
#[command(about = "Connectivity fingerprints and entropy-based hub detection", long_about = None)]
struct Cli {
    /// Log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about the inputs
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Compute connectivity fingerprints
    Fingerprint {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Fingerprint a single node without building the table
        #[arg(long, conflicts_with = "nodes")]
        node: Option<String>,

        /// Only fingerprint these nodes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        nodes: Option<Vec<String>>,

        /// Leave out the entropy columns
        #[arg(long)]
        no_entropy: bool,
    },

    /// Compute upstream and downstream specialization-diversity
    Specialization {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Only report these nodes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        nodes: Option<Vec<String>>,
    },

    /// Rank nodes by total specialization-diversity
    Hubs {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Neighborhood to compare against
        #[arg(long, default_value = "down")]
        flow: FlowArg,

        /// Number of hubs to report (defaults to the config value)
        #[arg(short, long)]
        top: Option<usize>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Edge list (CSV with header)
    edges: PathBuf,

    /// Node metadata (CSV with header)
    metadata: PathBuf,

    /// JSON pipeline config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source column of the edge list
    #[arg(long)]
    source_column: Option<String>,

    /// Sink column of the edge list
    #[arg(long)]
    sink_column: Option<String>,

    /// Weight column of the edge list
    #[arg(long, conflicts_with = "unweighted")]
    weight_column: Option<String>,

    /// Treat every edge as weight 1
    #[arg(long)]
    unweighted: bool,

    /// Column marking symmetric connections
    #[arg(long, requires = "undirected_value")]
    undirected_column: Option<String>,

    /// Value of --undirected-column that marks a symmetric connection
    #[arg(long, requires = "undirected_column")]
    undirected_value: Option<String>,

    /// Node id column of the metadata
    #[arg(long)]
    id_column: Option<String>,

    /// Category column of the metadata
    #[arg(long)]
    category_column: Option<String>,

    /// Explicit category axis, in order (comma-separated)
    #[arg(long, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Keep duplicate (source, sink) rows instead of summing them
    #[arg(long)]
    no_aggregate: bool,

    /// Build fingerprints on a single thread
    #[arg(long)]
    sequential: bool,

    /// Directory for cached tables
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Dataset key for cached tables
    #[arg(long, requires = "cache_dir")]
    cache_key: Option<String>,

    /// Encoding of cached tables
    #[arg(long, requires = "cache_dir")]
    cache_encoding: Option<EncodingArg>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "csv")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Flat table, undefined values as empty cells
    Csv,
    /// Pretty-printed JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FlowArg {
    /// Partners are sources of incoming edges
    #[value(alias = "upstream")]
    Up,
    /// Partners are sinks of outgoing edges
    #[value(alias = "downstream")]
    Down,
}

impl From<FlowArg> for Flow {
    fn from(arg: FlowArg) -> Self {
        match arg {
            FlowArg::Up => Flow::Upstream,
            FlowArg::Down => Flow::Downstream,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    Json,
    Bincode,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Json => Encoding::Json,
            EncodingArg::Bincode => Encoding::Bincode,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Stats { input } => cmd_stats(&input),
        Commands::Fingerprint {
            input,
            output,
            node,
            nodes,
            no_entropy,
        } => cmd_fingerprint(&input, &output, node, nodes, no_entropy),
        Commands::Specialization {
            input,
            output,
            nodes,
        } => cmd_specialization(&input, &output, nodes),
        Commands::Hubs {
            input,
            output,
            flow,
            top,
        } => cmd_hubs(&input, &output, flow.into(), top),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

impl InputArgs {
    fn config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        let columns = &mut config.edge_columns;
        if let Some(c) = &self.source_column {
            columns.source = c.clone();
        }
        if let Some(c) = &self.sink_column {
            columns.sink = c.clone();
        }
        if let Some(c) = &self.weight_column {
            columns.weight = Some(c.clone());
        }
        if self.unweighted {
            columns.weight = None;
        }
        if let (Some(column), Some(value)) = (&self.undirected_column, &self.undirected_value) {
            columns.undirected = Some(UndirectedRule {
                column: column.clone(),
                value: value.clone(),
            });
        }

        if let Some(c) = &self.id_column {
            config.metadata_columns.id = c.clone();
        }
        if let Some(c) = &self.category_column {
            config.metadata_columns.category = c.clone();
        }
        if let Some(categories) = &self.categories {
            config.categories = Some(categories.clone());
        }
        if self.no_aggregate {
            config.aggregate = false;
        }
        if self.sequential {
            config.parallel = false;
        }

        if let Some(dir) = &self.cache_dir {
            let mut cache = config
                .cache
                .take()
                .map(|c| CacheConfig { dir: dir.clone(), ..c })
                .unwrap_or_else(|| CacheConfig::new(dir));
            if let Some(key) = &self.cache_key {
                cache.key = key.clone();
            }
            if let Some(encoding) = self.cache_encoding {
                cache.encoding = encoding.into();
            }
            config.cache = Some(cache);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn load(&self, config: PipelineConfig) -> Result<Pipeline> {
        let start = Instant::now();
        let pb = ProgressBar::new_spinner();
        pb.set_message(format!(
            "Loading {} and {}...",
            self.edges.display(),
            self.metadata.display()
        ));

        let edges = Csv::read_edges_path(&self.edges, &config.edge_columns)
            .with_context(|| format!("Failed to read edge list {}", self.edges.display()))?;
        let metadata = Csv::read_metadata_path(&self.metadata, &config.metadata_columns)
            .with_context(|| format!("Failed to read metadata {}", self.metadata.display()))?;
        let pipeline = Pipeline::new(edges, metadata, config).context("Failed to prepare inputs")?;

        pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
        Ok(pipeline)
    }
}

impl OutputArgs {
    fn writer(&self) -> Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        })
    }

    fn write_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let mut writer = self.writer()?;
        serde_json::to_writer_pretty(&mut writer, value)?;
        writeln!(writer)?;
        writer.flush()?;
        self.report();
        Ok(())
    }

    fn report(&self) {
        if let Some(path) = &self.output {
            eprintln!("Wrote {}", path.display());
        }
    }
}

fn spinner(message: &str) -> (ProgressBar, Instant) {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    (pb, Instant::now())
}

fn cmd_stats(input: &InputArgs) -> Result<()> {
    let pipeline = input.load(input.config()?)?;
    let stats = pipeline.edges().stats();
    let coverage = pipeline.coverage();
    let categories = pipeline.index().categories();

    println!("Connectome Statistics");
    println!("=====================");
    println!("Nodes:          {}", stats.node_count);
    println!("Edges:          {}", stats.edge_count);
    println!("Total weight:   {}", stats.total_weight);
    println!("Avg out-degree: {:.2}", stats.avg_out_degree);
    println!("Annotated:      {}", pipeline.metadata().len());
    println!("Categories:     {} ({})", categories.len(), categories.join(", "));
    println!(
        "Coverage:       {}/{} endpoints ({:.1}%)",
        coverage.resolved(),
        coverage.endpoints,
        coverage.resolved_fraction() * 100.0
    );
    println!("Unknown:        {}", coverage.unknown);
    println!("Outside axis:   {}", coverage.outside_axis);

    Ok(())
}

fn cmd_fingerprint(
    input: &InputArgs,
    output: &OutputArgs,
    node: Option<String>,
    nodes: Option<Vec<String>>,
    no_entropy: bool,
) -> Result<()> {
    let mut config = input.config()?;
    config.with_entropy = !no_entropy;
    let pipeline = input.load(config)?;

    if let Some(node) = node {
        let builder = pipeline.fingerprint_builder();
        if !pipeline.edges().contains_node(&node) {
            tracing::warn!(node = %node, "node has no edges; its fingerprint is undefined");
        }
        let row = builder.node_row(&node);
        let id = NodeId::new(node);
        return match output.format {
            OutputFormat::Csv => {
                Csv::write_fingerprint_rows(output.writer()?, pipeline.index(), [(&id, &row)])?;
                output.report();
                Ok(())
            }
            OutputFormat::Json => output.write_json(&row),
        };
    }

    let (pb, start) = spinner("Building fingerprints...");
    let table = match nodes {
        Some(nodes) => pipeline.fingerprint_builder().nodes(nodes).build()?,
        None => pipeline.fingerprints()?,
    };
    pb.finish_with_message(format!(
        "Built {} fingerprints in {:.2?}",
        table.len(),
        start.elapsed()
    ));

    match output.format {
        OutputFormat::Csv => {
            Csv::write_fingerprints(output.writer()?, &table)?;
            output.report();
            Ok(())
        }
        OutputFormat::Json => output.write_json(&table),
    }
}

fn cmd_specialization(
    input: &InputArgs,
    output: &OutputArgs,
    nodes: Option<Vec<String>>,
) -> Result<()> {
    let mut config = input.config()?;
    if nodes.is_some() {
        config.nodes = nodes;
    }
    let pipeline = input.load(config)?;

    let (pb, start) = spinner("Computing specialization-diversity...");
    let table = pipeline.specialization()?;
    pb.finish_with_message(format!(
        "Computed {} rows in {:.2?}",
        table.len(),
        start.elapsed()
    ));

    match output.format {
        OutputFormat::Csv => {
            Csv::write_specialization(output.writer()?, &table)?;
            output.report();
            Ok(())
        }
        OutputFormat::Json => output.write_json(&table),
    }
}

fn cmd_hubs(input: &InputArgs, output: &OutputArgs, flow: Flow, top: Option<usize>) -> Result<()> {
    if top == Some(0) {
        bail!("--top must be at least 1");
    }
    let pipeline = input.load(input.config()?)?;

    let (pb, start) = spinner(&format!("Ranking {flow} hubs..."));
    let hubs = pipeline.hubs(flow, top)?;
    pb.finish_with_message(format!("Ranked in {:.2?}", start.elapsed()));

    if hubs.is_empty() {
        tracing::warn!(%flow, "no node has a defined total; nothing to rank");
    }

    match output.format {
        OutputFormat::Csv => {
            Csv::write_hubs(output.writer()?, &hubs)?;
            output.report();
            Ok(())
        }
        OutputFormat::Json => output.write_json(&hubs),
    }
}
