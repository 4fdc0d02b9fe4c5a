//! Query a catalog from the command line
//!
//! Usage:
//!   cargo run --bin yomi -- --db catalog.sqlite3 search song "初音ミク"
//!   cargo run --bin yomi -- --db catalog.sqlite3 suggest miku --types song,vocalist
//!   cargo run --bin yomi -- --db catalog.sqlite3 stats
//!
//! Results are printed as JSON. Logging goes to stderr; set RUST_LOG=debug
//! for per-query timings.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use yomi::{Category, Database, SearchStore, StoreConfig};

#[derive(Parser)]
#[command(name = "yomi")]
#[command(about = "Multi-script entity name search")]
struct Args {
    /// SQLite catalog to index
    #[arg(long, default_value = "catalog.sqlite3")]
    db: PathBuf,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ranked matches in one category
    Search {
        category: String,
        keyword: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// One page of matching ids
    Page {
        category: String,
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },
    /// Ranked matches merged across categories
    Suggest {
        keyword: String,
        /// Comma-separated categories (default: configured suggest categories)
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<String>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Build every index and print its counts
    Stats,
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = StoreConfig::from_env();
    let db = Database::open(&args.db)
        .with_context(|| format!("opening catalog {}", args.db.display()))?;
    let store = SearchStore::new(Arc::new(db), config);

    match args.command {
        Command::Search { category, keyword, limit } => {
            let limit = limit.unwrap_or(store.config().default_limit);
            let hits = store.search_named(&category, &keyword, limit).await?;
            print_json(&hits, args.pretty)?;
        }
        Command::Page { category, keyword, page, page_size } => {
            let category: Category = category.parse()?;
            let page = store.search_page(category, &keyword, page, page_size).await?;
            print_json(&page, args.pretty)?;
        }
        Command::Suggest { keyword, types, limit } => {
            let limit = limit.unwrap_or(store.config().suggest_limit);
            let names: Vec<&str> = types.iter().map(String::as_str).collect();
            let suggestions = store.suggest_named(&keyword, &names, limit).await?;
            print_json(&suggestions, args.pretty)?;
        }
        Command::Stats => {
            store.warm_all().await?;
            let stats: Vec<_> = Category::ALL
                .into_iter()
                .filter_map(|category| store.index_stats(category).map(|s| (category, s)))
                .collect();
            print_json(&stats, args.pretty)?;
        }
    }

    store.shutdown().await;
    Ok(())
}
