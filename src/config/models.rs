use serde::Deserialize;
use std::collections::BTreeMap;

use crate::dataset::{Edition, Platform};

/// On-disk shape of `resources/sources.json`; serde is confined to this
/// module tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesFile {
    pub(crate) download_page: String,
    pub(crate) official_origin: String,
    #[serde(default = "default_max_versions")]
    pub(crate) max_versions_to_check: usize,
    #[serde(default = "default_max_retries")]
    pub(crate) max_transport_retries: u32,
    pub(crate) platforms: Vec<Platform>,
    pub(crate) editions: BTreeMap<Edition, EditionFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditionFile {
    /// Regex run over the download page; the first non-empty group of each
    /// match is a version name.
    pub(crate) pattern: String,
    #[serde(default)]
    pub(crate) urls: BTreeMap<Platform, Vec<TemplateFile>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateFile {
    pub(crate) template: String,
    /// Restrict the template to version names matching this regex.
    #[serde(default)]
    pub(crate) only: Option<String>,
}

fn default_max_versions() -> usize {
    10
}

fn default_max_retries() -> u32 {
    6
}
