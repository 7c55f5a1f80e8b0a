use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keep the fasm version dataset current.
#[derive(Debug, Parser)]
#[command(name = "fasm-version-tracker", version, about)]
pub struct Cli {
    /// Dataset to read and (when something changed) rewrite
    #[arg(long, global = true, default_value = "fasm_versions.json")]
    pub data: PathBuf,

    /// Sources config; defaults to resources/sources.json next to the manifest
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Re-download the newest official artifacts and fix stored hashes that no longer match
    CheckHashes {
        /// Stop after this many versions across all editions
        #[arg(long)]
        max_versions: Option<usize>,
        /// Retries after a connection or TLS failure before giving up
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Scrape the download page and add versions the dataset does not know yet
    CheckNewVersions,
}
