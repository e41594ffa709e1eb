use anyhow::Result;
use axum::Router;
use clap::Parser;
use metahub_core::Analyzer;
use metahub_server::{build_app, AppConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Catalog directory: one <dataset>.yaml, .json or .jsonl file per dataset
    #[arg(short = 'c', long)]
    config_directory: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Analyzer kind: ngram or word
    #[arg(long, default_value = "ngram")]
    analyzer: String,
    #[arg(long, default_value_t = 1)]
    min_gram: usize,
    #[arg(long, default_value_t = 3)]
    max_gram: usize,
    /// Largest page a search request may ask for
    #[arg(long, default_value_t = 100)]
    max_page_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let analyzer = Analyzer::from_parts(&args.analyzer, args.min_gram, args.max_gram)?;
    let mut config = AppConfig::from_env(&args.config_directory, analyzer);
    config.max_page_size = args.max_page_size;
    let app: Router = build_app(config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, ?analyzer, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
