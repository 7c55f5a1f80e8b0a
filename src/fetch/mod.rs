//! HTTPS downloads and the per-process URL → digest cache.
//!
//! Everything network-facing goes through the [`Download`] trait so the
//! commands can be exercised against a scripted fake.

mod cache;
mod https;

pub use cache::HashCache;
pub use https::HttpsDownload;

use blake2::{Blake2b512, Digest};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Status code the hash checker treats as "not published (any more)".
pub const NOT_FOUND: u16 = 404;

#[async_trait::async_trait]
pub trait Download: Send + Sync {
    /// GET `url` and return the body as text.
    async fn text(&self, url: &Url) -> Result<String, HttpError>;

    /// GET `url` and return the hex digest of the body.
    async fn digest(&self, url: &Url) -> Result<String, HttpError>;
}

/// How a failed download should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404: the artifact is not (or no longer) published.
    NotFound,
    /// No status code at all: connection, TLS or body-stream failure.
    TransientTransport,
    /// Any other status.
    OtherHttp(u16),
}

/// A download failure. `status` is `None` when the request never produced
/// a response (or the body could not be read to the end).
#[derive(thiserror::Error, Debug, Clone)]
#[error("HTTP error{} while downloading {url}", StatusSuffix(.status))]
pub struct HttpError {
    url: Url,
    status: Option<u16>,
    #[source]
    cause: Option<Arc<reqwest::Error>>,
}

impl HttpError {
    pub fn from_status(url: &Url, status: u16) -> Self {
        Self {
            url: url.clone(),
            status: Some(status),
            cause: None,
        }
    }

    pub fn transport(url: &Url, cause: Option<reqwest::Error>) -> Self {
        Self {
            url: url.clone(),
            status: None,
            cause: cause.map(Arc::new),
        }
    }

    #[cfg(test)]
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn kind(&self) -> ErrorKind {
        match self.status {
            Some(NOT_FOUND) => ErrorKind::NotFound,
            Some(code) => ErrorKind::OtherHttp(code),
            None => ErrorKind::TransientTransport,
        }
    }
}

struct StatusSuffix<'a>(&'a Option<u16>);

impl fmt::Display for StatusSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, " ({code})"),
            None => Ok(()),
        }
    }
}

/// Incremental BLAKE2b-512 over a streamed body.
#[derive(Default)]
pub struct DigestWriter(Blake2b512);

impl DigestWriter {
    pub fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    /// Lowercase hex of the final digest.
    pub fn finish(self) -> String {
        hex::encode(self.0.finalize())
    }
}

/// Digest of an in-memory buffer, same encoding as [`DigestWriter`].
#[cfg(test)]
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut writer = DigestWriter::default();
    writer.update(bytes);
    writer.finish()
}
