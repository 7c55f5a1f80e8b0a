use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use url::Url;

use super::{Download, HttpError};

type SharedDigest = Shared<BoxFuture<'static, Result<String, HttpError>>>;

/// Per-process memo of URL → digest.
///
/// Every URL maps to one shared future, so callers asking for the same URL
/// while a download is running wait on that download instead of starting
/// another. Failures are memoized as well; `force_retry` is the only way to
/// get rid of an entry.
pub struct HashCache {
    download: Arc<dyn Download>,
    entries: Mutex<HashMap<String, SharedDigest>>,
}

impl HashCache {
    pub fn new(download: Arc<dyn Download>) -> Self {
        Self {
            download,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Digest of the body at `url`.
    ///
    /// With `force_retry` any cached entry (finished or still in flight) is
    /// dropped first and a fresh download is started.
    pub async fn get_hash(&self, url: &Url, force_retry: bool) -> Result<String, HttpError> {
        let pending = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if force_retry {
                entries.remove(url.as_str());
            }
            entries
                .entry(url.as_str().to_string())
                .or_insert_with(|| self.start(url.clone()))
                .clone()
        };
        pending.await
    }

    fn start(&self, url: Url) -> SharedDigest {
        let download = Arc::clone(&self.download);
        async move {
            let digest = download.digest(&url).await?;
            info!(url = %url, "downloaded");
            Ok(digest)
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::digest_bytes;
    use crate::testing::{FakeDownload, Reply};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_download() {
        let fake = Arc::new(FakeDownload::new());
        let u = url("https://flatassembler.net/fasmg.kl0e.zip");
        fake.script(u.as_str(), [Reply::Body(b"fasmg".to_vec())]);
        let cache = HashCache::new(fake.clone());

        let (a, b, c) = tokio::join!(
            cache.get_hash(&u, false),
            cache.get_hash(&u, false),
            cache.get_hash(&u, false)
        );

        let expected = digest_bytes(b"fasmg");
        assert_eq!(a.unwrap(), expected);
        assert_eq!(b.unwrap(), expected);
        assert_eq!(c.unwrap(), expected);
        assert_eq!(fake.calls(u.as_str()), 1);
    }

    #[tokio::test]
    async fn later_requests_hit_the_cache() {
        let fake = Arc::new(FakeDownload::new());
        let u = url("https://flatassembler.net/fasm-1.73.32.tgz");
        fake.script(u.as_str(), [Reply::Body(b"one".to_vec())]);
        let cache = HashCache::new(fake.clone());

        cache.get_hash(&u, false).await.unwrap();
        cache.get_hash(&u, false).await.unwrap();
        assert_eq!(fake.calls(u.as_str()), 1);
    }

    #[tokio::test]
    async fn force_retry_downloads_again() {
        let fake = Arc::new(FakeDownload::new());
        let u = url("https://flatassembler.net/fasm-1.73.32.tgz");
        fake.script(
            u.as_str(),
            [Reply::Body(b"old".to_vec()), Reply::Body(b"new".to_vec())],
        );
        let cache = HashCache::new(fake.clone());

        assert_eq!(cache.get_hash(&u, false).await.unwrap(), digest_bytes(b"old"));
        assert_eq!(cache.get_hash(&u, true).await.unwrap(), digest_bytes(b"new"));
        assert_eq!(fake.calls(u.as_str()), 2);

        // The fresh result replaces the old entry.
        assert_eq!(cache.get_hash(&u, false).await.unwrap(), digest_bytes(b"new"));
        assert_eq!(fake.calls(u.as_str()), 2);
    }

    #[tokio::test]
    async fn failures_are_memoized_until_forced() {
        let fake = Arc::new(FakeDownload::new());
        let u = url("https://flatassembler.net/fasmw17332.zip");
        fake.script(u.as_str(), [Reply::Transport, Reply::Body(b"ok".to_vec())]);
        let cache = HashCache::new(fake.clone());

        let err = cache.get_hash(&u, false).await.unwrap_err();
        assert_eq!(err.status_code(), None);
        assert!(cache.get_hash(&u, false).await.is_err());
        assert_eq!(fake.calls(u.as_str()), 1);

        assert!(cache.get_hash(&u, true).await.is_ok());
        assert_eq!(fake.calls(u.as_str()), 2);
    }

    #[tokio::test]
    async fn different_urls_download_separately() {
        let fake = Arc::new(FakeDownload::new());
        let a = url("https://flatassembler.net/fasm-1.0.tgz");
        let b = url("https://flatassembler.net/fasm-1.0.tar.gz");
        fake.script(a.as_str(), [Reply::Body(b"a".to_vec())]);
        fake.script(b.as_str(), [Reply::Status(404)]);
        let cache = HashCache::new(fake.clone());

        let (ra, rb) = tokio::join!(cache.get_hash(&a, false), cache.get_hash(&b, false));
        assert_eq!(ra.unwrap(), digest_bytes(b"a"));
        assert_eq!(rb.unwrap_err().status_code(), Some(404));
        assert_eq!(fake.calls(a.as_str()), 1);
        assert_eq!(fake.calls(b.as_str()), 1);
    }
}
