pub mod check_hashes;
pub mod check_new_versions;

pub use check_hashes::{HashChecker, check_hashes};
pub use check_new_versions::{VersionDiscoverer, check_new_versions};

use crate::dataset::{DatasetError, Edition};
use crate::editions::EditionError;
use crate::fetch::HttpError;

/// Anything that aborts a run.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Edition(#[from] EditionError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// `[[fasm1 1.73.32, fasmg kl0e]]`, with consecutive duplicates folded.
fn bracket_list<'a>(entries: impl IntoIterator<Item = (Edition, &'a str)>) -> String {
    let mut items: Vec<String> = Vec::new();
    let mut last: Option<(Edition, &str)> = None;
    for entry in entries {
        if last != Some(entry) {
            items.push(format!("{} {}", entry.0, entry.1));
            last = Some(entry);
        }
    }
    format!("[[{}]]", items.join(", "))
}
