use async_trait::async_trait;

use crate::{
    domain::{ArticleRecord, FollowUpStatus, FollowUpSubscription},
    Result,
};

/// Port for the persistent article store.
///
/// Lookups are by exact URL string; the store performs no normalization.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn find_article_by_url(&self, url: &str) -> Result<Option<ArticleRecord>>;

    /// Insert or replace the record for its exact URL.
    async fn persist_article(&self, record: &ArticleRecord) -> Result<()>;

    /// Prior articles sharing `topic`, excluding `exclude_url`, most recent
    /// first, at most `limit`.
    async fn find_related_articles(
        &self,
        topic: &str,
        exclude_url: &str,
        limit: usize,
    ) -> Result<Vec<ArticleRecord>>;

    /// All subscriptions still waiting for a follow-up article.
    async fn articles_for_follow_up(&self) -> Result<Vec<FollowUpSubscription>>;

    async fn update_follow_up_status(&self, url: &str, status: FollowUpStatus) -> Result<()>;
}
