//! Direct content acquisition for rewritten archive-text URLs.
//!
//! Ordinary URLs are not fetched here at all: the browsing-capable
//! summarization call retrieves those itself, which avoids double-fetching.

use std::time::Duration;

use async_trait::async_trait;

use crate::{errors::Error, Result};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; gazette/0.1)";

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the plain-text body of `url`.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

#[derive(Clone, Debug)]
pub struct HttpContentFetcher {
    http: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client build");
        Self { http }
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let resp = self.http.get(url).send().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }

        let body = resp.text().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if body.trim().is_empty() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: "empty body".to_string(),
            });
        }

        Ok(body)
    }
}
