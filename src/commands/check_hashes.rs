use std::fmt;
use std::path::Path;
use tracing::info;
use url::Origin;

use super::{RunError, bracket_list};
use crate::dataset::{self, Dataset, Edition, Platform};
use crate::editions::UrlTable;
use crate::fetch::HashCache;
use crate::retry::{RetryPolicy, fetch_with_retry};

/// A stored digest that no longer matches what the official server serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashUpdate {
    pub edition: Edition,
    pub version: String,
    pub platform: Platform,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for HashUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: stored {}, served {}",
            self.edition, self.version, self.platform, self.expected, self.actual
        )
    }
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub versions_checked: usize,
    pub updates: Vec<HashUpdate>,
}

impl CheckReport {
    pub fn is_changed(&self) -> bool {
        !self.updates.is_empty()
    }

    /// `updated hashes for [[fasm1 1.73.32]]`, or `None` when nothing changed.
    pub fn summary(&self) -> Option<String> {
        self.is_changed().then(|| {
            let entries = self.updates.iter().map(|u| (u.edition, u.version.as_str()));
            format!("updated hashes for {}", bracket_list(entries))
        })
    }
}

/// Re-downloads the newest official artifacts and compares their digests.
///
/// Versions are walked newest first, edition after edition, strictly one
/// download at a time.
pub struct HashChecker<'a> {
    pub cache: &'a HashCache,
    pub urls: &'a dyn UrlTable,
    pub official_origin: &'a Origin,
    pub policy: RetryPolicy,
    /// Versions examined across all editions before the scan stops; older
    /// releases are not expected to change.
    pub max_versions: usize,
}

impl HashChecker<'_> {
    pub async fn check(&self, dataset: &mut Dataset) -> Result<CheckReport, RunError> {
        let mut report = CheckReport::default();

        'scan: for edition in Edition::ALL {
            for version in dataset.versions_mut(edition).iter_mut() {
                if report.versions_checked == self.max_versions {
                    info!("reached limit of versions to check");
                    break 'scan;
                }
                report.versions_checked += 1;

                let Some(hashes) = version.hashes().cloned() else {
                    continue;
                };

                let mut official_download_available = false;
                for (platform, expected) in hashes {
                    let urls = self.urls.version_urls(edition, version.name(), platform)?;
                    for url in urls.iter().filter(|u| u.origin() == *self.official_origin) {
                        let Some(actual) = fetch_with_retry(self.cache, url, &self.policy).await? else {
                            continue;
                        };
                        official_download_available = true;

                        if actual != expected {
                            version.set_hash(platform, actual.clone());
                            let update = HashUpdate {
                                edition,
                                version: version.name().to_string(),
                                platform,
                                expected: expected.clone(),
                                actual,
                            };
                            info!(%update, "hash mismatch");
                            report.updates.push(update);
                        }
                    }
                }

                // Older releases predate the official download scheme.
                if !official_download_available {
                    info!(
                        %edition,
                        version = version.name(),
                        "no official downloads found, assuming we hit an old version"
                    );
                    break;
                }
            }
        }

        Ok(report)
    }
}

/// Load the dataset at `path`, verify it, and rewrite it only when a digest
/// changed.
pub async fn check_hashes(path: &Path, checker: &HashChecker<'_>) -> Result<CheckReport, RunError> {
    let mut data = dataset::load(path)?;
    let report = checker.check(&mut data).await?;

    if report.is_changed() {
        dataset::save(path, &data)?;
        info!(updated = report.updates.len(), path = %path.display(), "dataset rewritten");
    } else {
        info!(versions_checked = report.versions_checked, "all checked official hashes are OK");
    }

    Ok(report)
}
