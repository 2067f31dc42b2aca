//! Mnemo CLI - Command-line access to a memory store

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mnemo_core::prelude::*;

#[derive(Parser)]
#[command(name = "mnemo")]
#[command(about = "Conversational memory store CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to mnemo.toml and MNEMO_* variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store file, overriding the configured path
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest records from a JSON array or JSON lines file
    Ingest {
        /// Input file
        file: PathBuf,
    },
    /// Retrieve records for a conversation
    Retrieve {
        /// Conversation ID
        #[arg(long)]
        conversation: String,
        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,
        /// episodic, semantic or hybrid
        #[arg(short, long, default_value = "hybrid")]
        mode: String,
        /// Query text
        #[arg(short, long)]
        query: Option<String>,
        /// Facet kind or value to favour (repeatable)
        #[arg(long = "facet")]
        facets: Vec<String>,
    },
    /// Remove records from a conversation
    Forget {
        /// Conversation ID
        #[arg(long)]
        conversation: String,
        /// Remove records older than this many days
        #[arg(long)]
        ttl_days: Option<f64>,
        /// Keep at most this many records
        #[arg(long)]
        keep_last_n: Option<usize>,
    },
    /// Show conversation stats
    Snapshot {
        /// Conversation ID
        #[arg(long)]
        conversation: String,
    },
    /// Run TTL expiry and capacity enforcement
    Cleanup,
    /// Version information
    Version,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("mnemo {}", env!("CARGO_PKG_VERSION"));
        println!("mnemo-core {}", mnemo_core::VERSION);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref(), cli.store)?;
    let mut engine = MemoryEngine::open(&config).context("Failed to open memory engine")?;

    let output = match cli.command {
        Commands::Ingest { file } => {
            let records = read_records(&file)?;
            let mut ids = Vec::with_capacity(records.len());
            for record in records {
                ids.push(engine.ingest(record)?);
            }
            tracing::info!(ingested = ids.len(), file = %file.display(), "Ingest finished");
            serde_json::json!({ "ingested": ids.len(), "ids": ids })
        }
        Commands::Retrieve {
            conversation,
            k,
            mode,
            query,
            facets,
        } => {
            let mut request = RetrieveRequest::new(conversation)
                .with_mode(mode.parse()?)
                .with_facets(facets);
            request.k = k;
            request.query = query;
            serde_json::to_value(engine.retrieve(&request))?
        }
        Commands::Forget {
            conversation,
            ttl_days,
            keep_last_n,
        } => {
            let removed = engine.forget(
                &conversation,
                &ForgetRequest {
                    ttl_days,
                    keep_last_n,
                },
            );
            serde_json::json!({ "conversation_id": conversation, "removed": removed })
        }
        Commands::Snapshot { conversation } => {
            serde_json::to_value(engine.snapshot(&conversation))?
        }
        Commands::Cleanup => serde_json::to_value(engine.cleanup(chrono::Utc::now()))?,
        Commands::Version => unreachable!("handled before the engine is opened"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(path: Option<&Path>, store: Option<PathBuf>) -> Result<MnemoConfig> {
    let mut config = match path {
        Some(path) => MnemoConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MnemoConfig::load().context("Failed to load configuration")?,
    };
    if let Some(store) = store {
        config.store = StoreConfig::at(store);
    }
    Ok(config)
}

/// Records from a JSON array, or one JSON object per line
fn read_records(path: &Path) -> Result<Vec<MemoryRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let values: Vec<serde_json::Value> = if contents.trim_start().starts_with('[') {
        serde_json::from_str(&contents).context("Input is not a JSON array")?
    } else {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Invalid JSON on line {}", n + 1))
            })
            .collect::<Result<_>>()?
    };

    values
        .into_iter()
        .map(|value| MemoryRecord::from_value(value).map_err(Into::into))
        .collect()
}
