mod cli;
mod commands;
mod config;
mod dataset;
mod editions;
mod fetch;
mod logging;
mod retry;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

use cli::{Cli, Command};
use commands::{HashChecker, VersionDiscoverer};
use fetch::{HashCache, HttpsDownload};
use retry::RetryPolicy;

fn construct_sources_file_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources").join("sources.json")
}

async fn run(cli: Cli) -> Result<()> {
    let sources_path = cli.config.unwrap_or_else(construct_sources_file_path);
    let config = config::init_from_file(&sources_path)
        .with_context(|| format!("load sources config {}", sources_path.display()))?;

    let download = Arc::new(HttpsDownload::new().context("build HTTPS client")?);
    let cache = HashCache::new(download.clone());

    let summary = match cli.command {
        Command::CheckHashes {
            max_versions,
            max_retries,
        } => {
            let checker = HashChecker {
                cache: &cache,
                urls: config,
                official_origin: config.official_origin(),
                policy: RetryPolicy {
                    max_transport_retries: max_retries.unwrap_or(config.max_transport_retries()),
                },
                max_versions: max_versions.unwrap_or(config.max_versions_to_check()),
            };
            commands::check_hashes(&cli.data, &checker)
                .await
                .with_context(|| format!("check hashes in {}", cli.data.display()))?
                .summary()
        }
        Command::CheckNewVersions => {
            let discoverer = VersionDiscoverer {
                download: download.as_ref(),
                cache: &cache,
                urls: config,
                scraper: config,
                download_page: config.download_page(),
                platforms: config.platforms(),
            };
            commands::check_new_versions(&cli.data, &discoverer)
                .await
                .with_context(|| format!("check for new versions of {}", cli.data.display()))?
                .summary()
        }
    };

    // The summary is the only thing on stdout.
    if let Some(line) = summary {
        println!("{line}");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
