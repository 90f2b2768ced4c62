//! Binary entry point for chronograph: a CLI over the bitemporal
//! knowledge-graph facade.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stdout in main binary for CLI output
#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use chronograph::config::ChronographConfig;
use chronograph::graph::EntityInput;
use chronograph::observability::{self, LoggingConfig};
use chronograph::search::SearchOptions;
use chronograph::{Error, KnowledgeGraph, Result};

#[derive(Parser)]
#[command(name = "chronograph")]
#[command(about = "Bitemporal knowledge-graph memory store with hybrid vector search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to ~/.config/chronograph/config.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates an entity with the given observations
    AddEntity {
        /// Entity name, used as its identity key
        name: String,
        /// Entity type (e.g. "person", "project")
        #[arg(long = "type")]
        entity_type: String,
        /// Observation strings describing the entity
        #[arg(long = "observation")]
        observations: Vec<String>,
    },
    /// Searches the graph by text, vector similarity, or both
    Search {
        /// Query text
        query: String,
        /// Maximum hits to return
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Restrict results to entities of this type
        #[arg(long)]
        entity_type: Option<String>,
    },
    /// Prints an entity's full version history
    History {
        /// Entity name
        name: String,
    },
    /// Prints graph analytics (degree, components, centrality)
    Stats,
}

fn load_config(path: Option<&PathBuf>) -> Result<ChronographConfig> {
    path.map_or_else(|| Ok(ChronographConfig::load_default()), |path| ChronographConfig::load_from_file(path))
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    observability::init_tracing(&LoggingConfig { filter: config.observability.log_level.clone(), format: config.observability.log_format });
    if config.observability.metrics_enabled {
        observability::init_metrics()?;
    }

    let kg = KnowledgeGraph::open_sqlite(config)?;

    match cli.command {
        Commands::AddEntity { name, entity_type, observations } => {
            let entities = kg.create_entities(vec![EntityInput { name, entity_type, observations }])?;
            for entity in entities {
                println!("created {} ({})", entity.name, entity.entity_type);
            }
        }
        Commands::Search { query, limit, entity_type } => {
            let response = kg.search(&query, SearchOptions { limit, entity_type, ..Default::default() })?;
            println!("strategy: {:?} (partial: {})", response.strategy, response.partial);
            for hit in response.hits {
                println!("{:>6.3}  {}  ({})", hit.score, hit.entity.name, hit.entity.entity_type);
            }
        }
        Commands::History { name } => {
            let versions = kg.get_entity_history(&name)?;
            if versions.is_empty() {
                return Err(Error::NotFound(format!("no history for entity {name}")));
            }
            for version in versions {
                println!("{:?}", version);
            }
        }
        Commands::Stats => {
            let snapshot = kg.analytics_snapshot()?;
            let stats = chronograph::analytics::stats::compute(&snapshot, chronograph::analytics::stats::StatisticsOptions::default());
            println!("{stats:#?}");
        }
    }

    kg.shutdown(Duration::from_secs(5));
    Ok(())
}

fn main() -> Result<()> {
    run(Cli::parse())
}
