use reqwest::{Client, Response, StatusCode, redirect};
use url::Url;

use super::{DigestWriter, Download, HttpError};

const USER_AGENT: &str = concat!("fasm-version-tracker/", env!("CARGO_PKG_VERSION"));

/// Plain HTTPS GETs through reqwest.
///
/// The client is built on rustls, which never renegotiates a session, so the
/// unpatched legacy server the pages live on is reachable without any extra
/// TLS switches. Transparent decompression stays off: digests must cover the
/// bytes exactly as served. Redirects are not followed, so a moved artifact
/// surfaces as its 3xx status instead of hashing whatever page it points to.
pub struct HttpsDownload {
    client: Client,
}

impl HttpsDownload {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .use_rustls_tls()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<Response, HttpError> {
        let res = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| HttpError::transport(url, Some(e)))?;

        // Anything but a plain 200 is a failure.
        if res.status() != StatusCode::OK {
            return Err(HttpError::from_status(url, res.status().as_u16()));
        }
        Ok(res)
    }
}

#[async_trait::async_trait]
impl Download for HttpsDownload {
    async fn text(&self, url: &Url) -> Result<String, HttpError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| HttpError::transport(url, Some(e)))
    }

    async fn digest(&self, url: &Url) -> Result<String, HttpError> {
        let mut res = self.get(url).await?;
        let mut writer = DigestWriter::default();

        // Hash chunk by chunk; artifacts never sit in memory as a whole.
        while let Some(chunk) = res.chunk().await.map_err(|e| HttpError::transport(url, Some(e)))? {
            writer.update(&chunk);
        }

        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{ErrorKind, digest_bytes};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Loopback HTTP/1.1 server answering each path with a canned raw
    /// response, one connection per request. Unknown paths get a 404.
    struct Server {
        addr: SocketAddr,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Server {
        fn start(routes: Vec<(&'static str, Vec<u8>)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let seen = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&seen);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let path = read_request_path(&mut stream);
                    let reply = routes
                        .iter()
                        .find(|(route, _)| *route == path)
                        .map(|(_, raw)| raw.clone())
                        .unwrap_or_else(|| response("404 Not Found", b"not here"));
                    log.lock().unwrap().push(path);
                    let _ = stream.write_all(&reply);
                }
            });
            Self { addr, seen }
        }

        fn url(&self, path: &str) -> Url {
            Url::parse(&format!("http://{}{path}", self.addr)).unwrap()
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    fn read_request_path(stream: &mut TcpStream) -> String {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        String::from_utf8_lossy(&head)
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string()
    }

    fn response(status: &str, body: &[u8]) -> Vec<u8> {
        let mut raw = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(body);
        raw
    }

    #[tokio::test]
    async fn digest_covers_the_whole_body() {
        let body: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let server = Server::start(vec![("/fasm-1.73.32.tgz", response("200 OK", &body))]);

        let digest = HttpsDownload::new()
            .unwrap()
            .digest(&server.url("/fasm-1.73.32.tgz"))
            .await
            .unwrap();

        assert_eq!(digest, digest_bytes(&body));
    }

    #[tokio::test]
    async fn text_returns_the_page() {
        let server = Server::start(vec![("/download.php", response("200 OK", b"fasm-1.73.32.tgz"))]);

        let page = HttpsDownload::new()
            .unwrap()
            .text(&server.url("/download.php"))
            .await
            .unwrap();

        assert_eq!(page, "fasm-1.73.32.tgz");
    }

    #[tokio::test]
    async fn missing_artifact_is_not_found() {
        let server = Server::start(vec![]);

        let err = HttpsDownload::new()
            .unwrap()
            .digest(&server.url("/fasm-1.0.tgz"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn server_error_keeps_its_status() {
        let server = Server::start(vec![("/download.php", response("500 Internal Server Error", b"oops"))]);

        let err = HttpsDownload::new()
            .unwrap()
            .text(&server.url("/download.php"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OtherHttp(500));
    }

    #[tokio::test]
    async fn redirect_is_an_error_and_not_followed() {
        let redirect = b"HTTP/1.1 302 Found\r\nLocation: /landing\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let server = Server::start(vec![
            ("/fasmw17332.zip", redirect.to_vec()),
            ("/landing", response("200 OK", b"landing")),
        ]);

        let err = HttpsDownload::new()
            .unwrap()
            .digest(&server.url("/fasmw17332.zip"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OtherHttp(302));
        assert_eq!(server.seen(), ["/fasmw17332.zip"]);
    }

    #[tokio::test]
    async fn truncated_body_is_a_transport_error() {
        let truncated = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort";
        let server = Server::start(vec![("/fasmg.kl0e.zip", truncated.to_vec())]);

        let err = HttpsDownload::new()
            .unwrap()
            .digest(&server.url("/fasmg.kl0e.zip"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), None);
        assert_eq!(err.kind(), ErrorKind::TransientTransport);
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let url = Url::parse(&format!("http://{addr}/download.php")).unwrap();

        let err = HttpsDownload::new().unwrap().text(&url).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransientTransport);
    }
}
