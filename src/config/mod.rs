mod models;

use regex::Regex;
use std::collections::BTreeMap;
use std::{fs, path::Path, sync::OnceLock};
use url::{Origin, Url};

use crate::dataset::{Edition, Platform};
use crate::editions::{EditionSource, UrlTemplate};
use models::SourcesFile;

/// Single, module-private cache (set exactly once).
static CACHE: OnceLock<Config> = OnceLock::new();

/// Where to look, what to look for, and how hard to try.
#[derive(Debug, Clone)]
pub struct Config {
    download_page: Url,
    official_origin: Origin,
    max_versions_to_check: usize,
    max_transport_retries: u32,
    platforms: Vec<Platform>,
    editions: BTreeMap<Edition, EditionSource>,
}

impl Config {
    /// Parse and validate a sources document. Every regex and URL is checked
    /// here so a bad config fails before any download starts.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: SourcesFile = serde_json::from_str(json)?;

        let download_page = parse_url(&file.download_page)?;
        let official_origin = parse_url(&file.official_origin)?.origin();
        if !official_origin.is_tuple() {
            return Err(ConfigError::OpaqueOrigin(file.official_origin));
        }

        let mut editions = BTreeMap::new();
        for (edition, source) in file.editions {
            let pattern = compile(&source.pattern)?;
            let mut urls = BTreeMap::new();
            for (platform, templates) in source.urls {
                let templates = templates
                    .into_iter()
                    .map(|t| {
                        let only = t.only.as_deref().map(compile).transpose()?;
                        UrlTemplate::new(t.template, only).map_err(ConfigError::from)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                urls.insert(platform, templates);
            }
            editions.insert(edition, EditionSource::new(pattern, urls));
        }

        if let Some(missing) = Edition::ALL.into_iter().find(|e| !editions.contains_key(e)) {
            return Err(ConfigError::MissingEdition(missing));
        }

        Ok(Self {
            download_page,
            official_origin,
            max_versions_to_check: file.max_versions_to_check,
            max_transport_retries: file.max_transport_retries,
            platforms: file.platforms,
            editions,
        })
    }

    pub fn download_page(&self) -> &Url {
        &self.download_page
    }

    pub fn official_origin(&self) -> &Origin {
        &self.official_origin
    }

    pub fn max_versions_to_check(&self) -> usize {
        self.max_versions_to_check
    }

    pub fn max_transport_retries(&self) -> u32 {
        self.max_transport_retries
    }

    /// Platforms a newly discovered version gets hashed for.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn edition(&self, edition: Edition) -> Option<&EditionSource> {
        self.editions.get(&edition)
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::Url {
        url: raw.to_string(),
        source,
    })
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Ok(Regex::new(pattern)?)
}

// ---- Process-wide instance ----

/// Initialize from a JSON file path.
pub fn init_from_file(path: impl AsRef<Path>) -> Result<&'static Config, ConfigError> {
    let data = fs::read_to_string(path).map_err(ConfigError::Io)?;
    init_from_json_str(&data)
}

/// Initialize from a JSON string.
pub fn init_from_json_str(json: &str) -> Result<&'static Config, ConfigError> {
    let parsed = Config::from_json_str(json)?;
    CACHE.set(parsed).map_err(|_| ConfigError::AlreadyInitialized)?;
    get()
}

fn get() -> Result<&'static Config, ConfigError> {
    CACHE.get().ok_or(ConfigError::NotInitialized)
}

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("sources config is not initialized")]
    NotInitialized,
    #[error("sources config already initialized")]
    AlreadyInitialized,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("invalid URL '{url}': {source}")]
    Url { url: String, source: url::ParseError },
    #[error("official origin '{0}' has no host")]
    OpaqueOrigin(String),
    #[error("edition {0} is not configured")]
    MissingEdition(Edition),
    #[error(transparent)]
    Template(#[from] crate::editions::TemplateError),
}
