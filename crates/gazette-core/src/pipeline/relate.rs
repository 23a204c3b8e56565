//! Related-content lookup by derived topic.

use tracing::warn;

use crate::{domain::ArticleRecord, store::ArticleStore};

/// Prior articles sharing `topic`, excluding the article being processed.
///
/// Runs after the summary already exists, so a store failure degrades to an
/// empty list instead of discarding paid work.
pub async fn find_related(
    store: &dyn ArticleStore,
    topic: &str,
    exclude_url: &str,
    limit: usize,
) -> Vec<ArticleRecord> {
    match store.find_related_articles(topic, exclude_url, limit).await {
        Ok(related) => related,
        Err(e) => {
            warn!(error = %e, topic, "related-article lookup failed");
            Vec::new()
        }
    }
}
