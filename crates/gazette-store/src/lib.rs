//! Persistence adapters for the article store port.
//!
//! `MemoryStore` keeps everything in process memory; `JsonFileStore` layers
//! load-on-open / rewrite-on-mutation JSON persistence on top of it.
//! Follow-up subscriptions are created by an external collaborator, so the
//! file store only ever reads and updates them; seeding happens through the
//! same JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use gazette_core::{
    domain::{ArticleRecord, FollowUpStatus, FollowUpSubscription},
    errors::Error,
    store::ArticleStore,
    Result,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreData {
    articles: Vec<ArticleRecord>,
    subscriptions: Vec<FollowUpSubscription>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Test/bootstrap helper: add a subscription directly.
    pub async fn add_subscription(&self, sub: FollowUpSubscription) {
        self.data.write().await.subscriptions.push(sub);
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn find_article_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        Ok(self
            .data
            .read()
            .await
            .articles
            .iter()
            .find(|r| r.url == url)
            .cloned())
    }

    async fn persist_article(&self, record: &ArticleRecord) -> Result<()> {
        let mut data = self.data.write().await;
        if let Some(existing) = data.articles.iter_mut().find(|r| r.url == record.url) {
            *existing = record.clone();
        } else {
            data.articles.push(record.clone());
        }
        Ok(())
    }

    async fn find_related_articles(
        &self,
        topic: &str,
        exclude_url: &str,
        limit: usize,
    ) -> Result<Vec<ArticleRecord>> {
        let data = self.data.read().await;
        let mut related: Vec<ArticleRecord> = data
            .articles
            .iter()
            .filter(|r| r.topic == topic && r.url != exclude_url)
            .cloned()
            .collect();
        related.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        related.truncate(limit);
        Ok(related)
    }

    async fn articles_for_follow_up(&self) -> Result<Vec<FollowUpSubscription>> {
        Ok(self
            .data
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.status == FollowUpStatus::Pending)
            .cloned()
            .collect())
    }

    async fn update_follow_up_status(&self, url: &str, status: FollowUpStatus) -> Result<()> {
        let mut data = self.data.write().await;
        for sub in data.subscriptions.iter_mut() {
            if sub.url == url {
                sub.status = status;
            }
        }
        Ok(())
    }
}

/// JSON-file-backed store: the whole dataset is loaded at open and the file
/// is rewritten after every mutation.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = load_data(&path).await?;
        info!(
            path = %path.display(),
            articles = data.articles.len(),
            subscriptions = data.subscriptions.len(),
            "article store opened"
        );
        Ok(Self {
            path,
            inner: MemoryStore::with_data(data),
        })
    }

    async fn flush(&self) -> Result<()> {
        let data = self.inner.data.read().await;
        let txt = serde_json::to_string_pretty(&*data)?;
        tokio::fs::write(&self.path, txt)
            .await
            .map_err(|e| Error::Store(format!("write {}: {e}", self.path.display())))
    }
}

async fn load_data(path: &Path) -> Result<StoreData> {
    match tokio::fs::read_to_string(path).await {
        Ok(txt) if !txt.trim().is_empty() => serde_json::from_str(&txt)
            .map_err(|e| Error::Store(format!("parse {}: {e}", path.display()))),
        Ok(_) => Ok(StoreData::default()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
        Err(e) => Err(Error::Store(format!("read {}: {e}", path.display()))),
    }
}

#[async_trait]
impl ArticleStore for JsonFileStore {
    async fn find_article_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
        self.inner.find_article_by_url(url).await
    }

    async fn persist_article(&self, record: &ArticleRecord) -> Result<()> {
        self.inner.persist_article(record).await?;
        self.flush().await
    }

    async fn find_related_articles(
        &self,
        topic: &str,
        exclude_url: &str,
        limit: usize,
    ) -> Result<Vec<ArticleRecord>> {
        self.inner
            .find_related_articles(topic, exclude_url, limit)
            .await
    }

    async fn articles_for_follow_up(&self) -> Result<Vec<FollowUpSubscription>> {
        self.inner.articles_for_follow_up().await
    }

    async fn update_follow_up_status(&self, url: &str, status: FollowUpStatus) -> Result<()> {
        self.inner.update_follow_up_status(url, status).await?;
        self.flush().await
    }
}
