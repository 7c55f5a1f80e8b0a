use regex::Regex;
use url::Url;

const VERSION: &str = "{version}";
const VERSION_COMPACT: &str = "{version_compact}";

/// Download URL pattern for one edition/platform.
///
/// Placeholders:
/// - `{version}`: the version name as recorded, e.g. `1.73.32`
/// - `{version_compact}`: the same without dots, e.g. `17332`
#[derive(Debug, Clone)]
pub struct UrlTemplate {
    template: String,
    only: Option<Regex>,
}

impl UrlTemplate {
    /// Checks that the template has a placeholder and renders to a valid URL.
    pub fn new(template: String, only: Option<Regex>) -> Result<Self, TemplateError> {
        if !template.contains(VERSION) && !template.contains(VERSION_COMPACT) {
            return Err(TemplateError::NoPlaceholder(template));
        }
        let this = Self { template, only };
        this.render_unchecked("1.0")?;
        Ok(this)
    }

    pub fn applies_to(&self, version: &str) -> bool {
        self.only.as_ref().is_none_or(|re| re.is_match(version))
    }

    /// `None` when the template is restricted to other versions.
    pub fn render(&self, version: &str) -> Option<Result<Url, TemplateError>> {
        self.applies_to(version).then(|| self.render_unchecked(version))
    }

    fn render_unchecked(&self, version: &str) -> Result<Url, TemplateError> {
        let compact: String = version.chars().filter(|c| *c != '.').collect();
        let raw = self
            .template
            .replace(VERSION_COMPACT, &compact)
            .replace(VERSION, version);
        Url::parse(&raw).map_err(|source| TemplateError::InvalidUrl { url: raw, source })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("URL template '{0}' has no version placeholder")]
    NoPlaceholder(String),
    #[error("invalid download URL '{url}': {source}")]
    InvalidUrl { url: String, source: url::ParseError },
}
