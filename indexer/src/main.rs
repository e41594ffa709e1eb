use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use metahub_core::{load_catalog_dir, Analyzer, Field, Operator, Page, SearchEngine, SearchRequest, SearchResult, Snapshot, SnapshotStats};
use std::sync::Arc;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the metadata catalog index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CatalogArgs {
    /// Directory holding one <dataset>.yaml, .json or .jsonl file per dataset
    #[arg(short = 'c', long)]
    config_directory: String,
    /// Analyzer kind: ngram or word
    #[arg(long, default_value = "ngram")]
    analyzer: String,
    /// Smallest n-gram length
    #[arg(long, default_value_t = 1)]
    min_gram: usize,
    /// Largest n-gram length
    #[arg(long, default_value_t = 3)]
    max_gram: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Tables,
    Columns,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog, build both indices and print their statistics
    Check {
        #[command(flatten)]
        catalog: CatalogArgs,
    },
    /// Run one query against a freshly built index
    Search {
        #[command(flatten)]
        catalog: CatalogArgs,
        #[arg(long, value_enum, default_value = "tables")]
        kind: Kind,
        #[arg(short, long)]
        query: String,
        #[arg(long, default_value_t = 0)]
        from: i64,
        #[arg(long, default_value_t = 10)]
        size: i64,
        /// Comma-separated fields to search: name, comments, document
        #[arg(long, default_value = "document")]
        fields: String,
        /// Term combination within a field: and, or
        #[arg(long, default_value = "and")]
        operator: String,
    },
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    stats: SnapshotStats,
    #[serde(flatten)]
    result: SearchResult,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { catalog } => {
            let snapshot = build_snapshot(&catalog)?;
            println!("{}", serde_json::to_string_pretty(&snapshot.stats())?);
            Ok(())
        }
        Commands::Search { catalog, kind, query, from, size, fields, operator } => {
            let snapshot = build_snapshot(&catalog)?;
            let request = SearchRequest::new(query.as_str())
                .fields(parse_fields(&fields)?)
                .operator(Operator::parse(&operator).ok_or_else(|| anyhow!("unknown operator: {operator}"))?)
                .page(Page::new(from, size)?);
            let result = match kind {
                Kind::Tables => snapshot.search_tables(&request),
                Kind::Columns => snapshot.search_columns(&request),
            };
            let out = SearchOutput { query: &query, stats: snapshot.stats(), result };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

/// Build and publish the first snapshot of a fresh engine (version 1).
fn build_snapshot(args: &CatalogArgs) -> Result<Arc<Snapshot>> {
    let analyzer = Analyzer::from_parts(&args.analyzer, args.min_gram, args.max_gram)?;
    let datasets = load_catalog_dir(&args.config_directory)?;
    let engine = SearchEngine::new(analyzer);
    let snapshot = engine.rebuild(datasets)?;
    let stats = snapshot.stats();
    tracing::info!(tables = stats.tables, columns = stats.columns, "index build complete");
    Ok(snapshot)
}

fn parse_fields(raw: &str) -> Result<Vec<Field>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| Field::parse(s).ok_or_else(|| anyhow!("unknown field: {}", s.trim())))
        .collect()
}
