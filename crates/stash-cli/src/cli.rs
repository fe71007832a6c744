use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use stash_types::Kind;

#[derive(Parser)]
#[command(
    name = "stash",
    about = "Stash: content-addressed storage for models and data",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (default: ./stash.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize blobs, records and inconsistencies per kind
    Status(KindArgs),
    /// List blobs no record references
    Unreferenced(KindArgs),
    /// List records whose blob is missing
    Empty(KindArgs),
    /// List blobs stored more than once
    Duplicates(KindArgs),
    /// Remove duplicates, unreferenced blobs and empty records
    Gc(GcArgs),
    /// Delete blobs no record references
    DeleteUnreferenced(KindArgs),
    /// Delete records whose blob is missing
    DeleteEmpty(KindArgs),
    /// Delete redundant copies of duplicated blobs
    DeleteDuplicates(KindArgs),
    /// Create records for unreferenced blobs
    Reconcile(KindArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct KindArgs {
    /// Restrict to one kind (default: all kinds)
    #[arg(short, long)]
    pub kind: Option<Kind>,
}

impl KindArgs {
    pub fn kinds(&self) -> Vec<Kind> {
        match self.kind {
            Some(kind) => vec![kind],
            None => Kind::ALL.to_vec(),
        }
    }
}

#[derive(Args)]
pub struct GcArgs {
    #[command(flatten)]
    pub kind: KindArgs,
    /// Report what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
}
