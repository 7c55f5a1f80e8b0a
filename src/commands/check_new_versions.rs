use futures::future::try_join_all;
use indexmap::IndexMap;
use std::path::Path;
use tracing::info;
use url::Url;

use super::{RunError, bracket_list};
use crate::dataset::{self, Dataset, Edition, Platform, Version};
use crate::editions::{EditionError, UrlTable, VersionScraper};
use crate::fetch::{Download, HashCache};

#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub added: Vec<(Edition, String)>,
}

impl DiscoveryReport {
    pub fn is_changed(&self) -> bool {
        !self.added.is_empty()
    }

    /// `added [[fasm1 1.73.33]]`, or `None` when nothing was found.
    pub fn summary(&self) -> Option<String> {
        self.is_changed().then(|| {
            let entries = self.added.iter().map(|(edition, name)| (*edition, name.as_str()));
            format!("added {}", bracket_list(entries))
        })
    }
}

/// Scrapes the download page for versions the dataset does not know yet and
/// hashes their artifacts.
pub struct VersionDiscoverer<'a> {
    pub download: &'a dyn Download,
    pub cache: &'a HashCache,
    pub urls: &'a dyn UrlTable,
    pub scraper: &'a dyn VersionScraper,
    pub download_page: &'a Url,
    pub platforms: &'a [Platform],
}

impl VersionDiscoverer<'_> {
    /// Editions, new versions and platforms are all hashed concurrently; the
    /// dataset is only touched once every download has succeeded.
    pub async fn discover(&self, dataset: &mut Dataset) -> Result<DiscoveryReport, RunError> {
        info!(url = %self.download_page, "downloading fasm page");
        let page = self.download.text(self.download_page).await?;

        let found = {
            let known: &Dataset = dataset;
            try_join_all(Edition::ALL.map(|edition| self.new_versions(known, edition, &page))).await?
        };

        let mut report = DiscoveryReport::default();
        for (edition, versions) in found {
            report
                .added
                .extend(versions.iter().map(|v| (edition, v.name().to_string())));
            dataset.prepend(edition, versions);
        }
        Ok(report)
    }

    /// Hashed records for the versions of `edition` on `page` that `known`
    /// lacks, sorted by name.
    async fn new_versions(
        &self,
        known: &Dataset,
        edition: Edition,
        page: &str,
    ) -> Result<(Edition, Vec<Version>), RunError> {
        let found = self.scraper.find_versions(edition, page)?;
        let new: Vec<String> = found.into_iter().filter(|name| !known.contains(edition, name)).collect();
        if new.is_empty() {
            return Ok((edition, Vec::new()));
        }
        info!(%edition, versions = %new.join(", "), "found new version(s)");

        let versions = try_join_all(new.into_iter().map(|name| self.hash_version(edition, name))).await?;
        Ok((edition, versions))
    }

    async fn hash_version(&self, edition: Edition, name: String) -> Result<Version, RunError> {
        let hashes = try_join_all(self.platforms.iter().map(|&platform| {
            let name = name.as_str();
            async move {
                let url = self
                    .urls
                    .version_urls(edition, name, platform)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| EditionError::NoUrl {
                        edition,
                        version: name.to_string(),
                        platform,
                    })?;
                let digest = self.cache.get_hash(&url, false).await?;
                Ok::<_, RunError>((platform, digest))
            }
        }))
        .await?;

        Ok(Version::new(name, hashes.into_iter().collect::<IndexMap<_, _>>()))
    }
}

/// Load the dataset at `path`, add whatever is new, and rewrite it only when
/// something was added.
pub async fn check_new_versions(path: &Path, discoverer: &VersionDiscoverer<'_>) -> Result<DiscoveryReport, RunError> {
    let mut data = dataset::load(path)?;
    let report = discoverer.discover(&mut data).await?;

    if report.is_changed() {
        dataset::save(path, &data)?;
        info!(added = report.added.len(), path = %path.display(), "dataset rewritten");
    } else {
        info!("no new versions found");
    }

    Ok(report)
}
