//! Trellis CLI: incremental document-graph builder for knowledge vaults.
//!
//! Usage:
//!   trellis apply --source <name> [--vault <dir>] [--merge-cmd <cmd>] <batch.json>...
//!   trellis stats [--vault <dir>]
//!   trellis sources [--vault <dir>]

use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trellis::{AnalysisResult, ChunkMerger, CommandMergeClient, UpsertEngine, Vault, VaultStats};

#[derive(Parser)]
#[command(
    name = "trellis",
    version,
    about = "Incremental document-graph builder for knowledge vaults"
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply analyzed batch files to the vault
    Apply {
        /// Source name recorded in frontmatter and sync state
        #[arg(long)]
        source: String,
        /// Vault root directory
        #[arg(long)]
        vault: Option<PathBuf>,
        /// External command merging multiple chunks into one batch
        #[arg(long)]
        merge_cmd: Option<String>,
        /// Analyzed batch files (JSON)
        #[arg(required = true)]
        batches: Vec<PathBuf>,
    },
    /// Print vault statistics
    Stats {
        /// Vault root directory
        #[arg(long)]
        vault: Option<PathBuf>,
    },
    /// List per-source sync bookkeeping
    Sources {
        /// Vault root directory
        #[arg(long)]
        vault: Option<PathBuf>,
    },
}

/// Get the default vault root (~/.local/share/trellis/vault)
fn default_vault_root() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("trellis").join("vault")
}

fn open_vault(root: Option<PathBuf>) -> Result<Vault, String> {
    let root = root.unwrap_or_else(default_vault_root);
    Vault::open(&root).map_err(|e| format!("Failed to open vault at {}: {}", root.display(), e))
}

fn load_chunks(paths: &[PathBuf]) -> Result<Vec<AnalysisResult>, String> {
    let mut chunks = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read batch '{}': {}", path.display(), e))?;
        let chunk: AnalysisResult = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse batch '{}': {}", path.display(), e))?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

fn cmd_apply(
    root: Option<PathBuf>,
    source: &str,
    merge_cmd: Option<String>,
    batches: &[PathBuf],
) -> i32 {
    let vault = match open_vault(root) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let chunks = match load_chunks(batches) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let batch = if chunks.len() <= 1 {
        match chunks.into_iter().next() {
            Some(batch) => batch,
            None => {
                eprintln!("error: no batch files given");
                return 1;
            }
        }
    } else {
        let cmd = match merge_cmd {
            Some(cmd) => cmd,
            None => {
                eprintln!(
                    "error: {} batch files given; merging them requires --merge-cmd",
                    chunks.len()
                );
                return 1;
            }
        };
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("failed to create tokio runtime: {}", e);
                return 1;
            }
        };
        let merger = ChunkMerger::new(Box::new(CommandMergeClient::new(cmd)));
        match rt.block_on(merger.merge_chunks(chunks)) {
            Ok(batch) => batch,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    };

    let engine = UpsertEngine::new(&vault);
    let report = match engine.apply(&batch, source) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    // Remember the newest contribution date applied from this source.
    let last_sync_date = batch
        .contributions()
        .map(|c| c.date())
        .max()
        .unwrap_or_else(Utc::now);
    match vault.load_sync_state() {
        Ok(mut state) => {
            state.record_sync(source, last_sync_date);
            if let Err(e) = vault.save_sync_state(&state) {
                eprintln!("Warning: failed to save sync state: {}", e);
            }
        }
        Err(e) => eprintln!("Warning: failed to load sync state: {}", e),
    }

    println!("Applied batch from '{}': {}", source, report.summary());
    for failure in &report.failures {
        eprintln!("  failed: {}", failure);
    }
    if report.failures.is_empty() {
        0
    } else {
        1
    }
}

fn cmd_stats(root: Option<PathBuf>) -> i32 {
    let vault = match open_vault(root) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match VaultStats::collect(&vault) {
        Ok(stats) => {
            stats.print();
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_sources(root: Option<PathBuf>) -> i32 {
    let vault = match open_vault(root) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let state = match vault.load_sync_state() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if state.sources.is_empty() {
        println!("No sources synced.");
        return 0;
    }
    println!("{:<24}  {:<20}  {:<20}", "SOURCE", "LAST SYNC DATE", "UPDATED AT");
    println!("{}", "-".repeat(68));
    for (name, sync) in &state.sources {
        println!(
            "{:<24}  {:<20}  {:<20}",
            name,
            sync.last_sync_date.to_rfc3339_opts(SecondsFormat::Secs, true),
            sync.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    0
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let code = match cli.command {
        Commands::Apply {
            source,
            vault,
            merge_cmd,
            batches,
        } => cmd_apply(vault, &source, merge_cmd, &batches),
        Commands::Stats { vault } => cmd_stats(vault),
        Commands::Sources { vault } => cmd_sources(vault),
    };
    std::process::exit(code);
}
