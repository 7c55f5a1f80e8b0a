//! Per-edition lookup tables: where a version's artifacts live and how the
//! download page names versions.
//!
//! Both are traits so the page-format assumption stays a single replaceable
//! unit; [`Config`] is the implementation the binary ships with.

mod template;

pub use template::{TemplateError, UrlTemplate};

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

use crate::config::Config;
use crate::dataset::{Edition, Platform};

/// `edition → (version, platform) → download URLs`, official ones first.
pub trait UrlTable: Send + Sync {
    fn version_urls(&self, edition: Edition, version: &str, platform: Platform) -> Result<Vec<Url>, EditionError>;
}

/// `edition → page text → version names` found on it.
pub trait VersionScraper: Send + Sync {
    fn find_versions(&self, edition: Edition, page: &str) -> Result<BTreeSet<String>, EditionError>;
}

/// Discovery pattern and URL templates of one edition.
#[derive(Debug, Clone)]
pub struct EditionSource {
    pattern: Regex,
    urls: BTreeMap<Platform, Vec<UrlTemplate>>,
}

impl EditionSource {
    pub fn new(pattern: Regex, urls: BTreeMap<Platform, Vec<UrlTemplate>>) -> Self {
        Self { pattern, urls }
    }

    pub fn urls(&self, version: &str, platform: Platform) -> Result<Vec<Url>, TemplateError> {
        self.urls
            .get(&platform)
            .into_iter()
            .flatten()
            .filter_map(|t| t.render(version))
            .collect()
    }

    /// Version names on `page`, de-duplicated.
    pub fn scan(&self, page: &str) -> BTreeSet<String> {
        extract_versions(&self.pattern, page)
    }
}

/// First non-empty capture group of every match of `pattern`.
pub fn extract_versions(pattern: &Regex, page: &str) -> BTreeSet<String> {
    pattern
        .captures_iter(page)
        .filter_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str())
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect()
}

impl UrlTable for Config {
    fn version_urls(&self, edition: Edition, version: &str, platform: Platform) -> Result<Vec<Url>, EditionError> {
        let source = self.edition(edition).ok_or(EditionError::NotConfigured(edition))?;
        Ok(source.urls(version, platform)?)
    }
}

impl VersionScraper for Config {
    fn find_versions(&self, edition: Edition, page: &str) -> Result<BTreeSet<String>, EditionError> {
        let source = self.edition(edition).ok_or(EditionError::NotConfigured(edition))?;
        let found = source.scan(page);
        if found.is_empty() {
            // Most likely the page layout changed under us.
            return Err(EditionError::ZeroMatches(edition));
        }
        Ok(found)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EditionError {
    #[error("found 0 versions for {0}")]
    ZeroMatches(Edition),
    #[error("edition {0} is not configured")]
    NotConfigured(Edition),
    #[error("no download URL for {edition} {version} on {platform}")]
    NoUrl {
        edition: Edition,
        version: String,
        platform: Platform,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
}
