//! Retry policy for re-downloading official artifacts.
//!
//! A 404 means the artifact is gone and is skipped, a failure without any
//! status (connection, TLS, broken body) is retried with the cache entry
//! dropped, and everything else stops the run.

use tracing::{info, warn};
use url::Url;

use crate::fetch::{ErrorKind, HashCache, HttpError};

/// Upper bound on retries after a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_transport_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_transport_retries: 6 }
    }
}

/// One state of a fetch. `retries` counts attempts made after the first.
#[derive(Debug)]
pub enum Step {
    Attempt { retries: u32 },
    RetryableFailure { retries: u32, error: HttpError },
    Skip(HttpError),
    Fatal(HttpError),
}

impl RetryPolicy {
    /// Where a failed attempt leads.
    pub fn after_failure(&self, retries: u32, error: HttpError) -> Step {
        match error.kind() {
            ErrorKind::NotFound => Step::Skip(error),
            ErrorKind::TransientTransport if retries < self.max_transport_retries => {
                Step::RetryableFailure { retries, error }
            }
            ErrorKind::TransientTransport | ErrorKind::OtherHttp(_) => Step::Fatal(error),
        }
    }
}

/// Digest of `url`, or `None` when the server says it does not exist.
pub async fn fetch_with_retry(cache: &HashCache, url: &Url, policy: &RetryPolicy) -> Result<Option<String>, HttpError> {
    let mut step = Step::Attempt { retries: 0 };
    loop {
        step = match step {
            Step::Attempt { retries } => match cache.get_hash(url, retries > 0).await {
                Ok(digest) => return Ok(Some(digest)),
                Err(error) => policy.after_failure(retries, error),
            },
            Step::RetryableFailure { retries, error } => {
                warn!(%error, retry = retries + 1, "transport error, retrying");
                Step::Attempt { retries: retries + 1 }
            }
            Step::Skip(error) => {
                info!(%error, "not published, skipping");
                return Ok(None);
            }
            Step::Fatal(error) => return Err(error),
        };
    }
}
