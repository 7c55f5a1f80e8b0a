//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use url::Url;

use crate::config::Config;
use crate::fetch::{Download, HttpError, digest_bytes};

pub const SOURCES_JSON: &str = include_str!("../resources/sources.json");

pub fn shipped_config() -> Config {
    Config::from_json_str(SOURCES_JSON).unwrap()
}

/// One scripted answer for a URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    Status(u16),
    Transport,
}

/// In-memory [`Download`]: each URL answers from its own queue, and the last
/// reply in a queue repeats forever. Unscripted URLs answer 404.
#[derive(Default)]
pub struct FakeDownload {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeDownload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, url: &str, replies: impl IntoIterator<Item = Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    async fn respond(&self, url: &Url) -> Result<Vec<u8>, HttpError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url.as_str()) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        // Give concurrent callers a chance to pile up on the same request.
        tokio::task::yield_now().await;

        match reply {
            Some(Reply::Body(bytes)) => Ok(bytes),
            Some(Reply::Status(code)) => Err(HttpError::from_status(url, code)),
            Some(Reply::Transport) => Err(HttpError::transport(url, None)),
            None => Err(HttpError::from_status(url, 404)),
        }
    }
}

#[async_trait::async_trait]
impl Download for FakeDownload {
    async fn text(&self, url: &Url) -> Result<String, HttpError> {
        let bytes = self.respond(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn digest(&self, url: &Url) -> Result<String, HttpError> {
        let bytes = self.respond(url).await?;
        Ok(digest_bytes(&bytes))
    }
}
