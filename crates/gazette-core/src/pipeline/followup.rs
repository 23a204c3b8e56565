//! Follow-up notification fan-out.
//!
//! After a successful summarization with a usable topic, pending
//! subscriptions whose topic exactly equals the new article's topic are
//! notified by DM and marked completed. Matching is deliberate exact string
//! equality, not semantic similarity.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    domain::{ArticleRecord, FollowUpStatus},
    formatting::follow_up_dm,
    messaging::MessagingPort,
    store::ArticleStore,
};

pub struct FollowUpNotifier {
    store: Arc<dyn ArticleStore>,
    messenger: Arc<dyn MessagingPort>,
}

impl FollowUpNotifier {
    pub fn new(store: Arc<dyn ArticleStore>, messenger: Arc<dyn MessagingPort>) -> Self {
        Self { store, messenger }
    }

    /// Match `article` against pending subscriptions and DM subscribers.
    ///
    /// Per-user delivery failures are logged and skipped; a matched
    /// subscription still moves to `Completed`.
    pub async fn notify_subscribers(&self, article: &ArticleRecord, summary: &str) {
        let subscriptions = match self.store.articles_for_follow_up().await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, "could not load follow-up subscriptions");
                return;
            }
        };

        for sub in subscriptions {
            if sub.status != FollowUpStatus::Pending {
                continue;
            }
            if sub.topic != article.topic || sub.url == article.url {
                continue;
            }

            let text = follow_up_dm(&sub, article, summary);
            let mut delivered = 0usize;
            for user in &sub.follow_up_users {
                match self.messenger.send_direct(*user, &text).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        warn!(error = %e, user_id = user.0, "follow-up DM failed");
                    }
                }
            }

            info!(
                topic = %sub.topic,
                subscription_url = %sub.url,
                delivered,
                subscribers = sub.follow_up_users.len(),
                "follow-up subscription completed"
            );

            if let Err(e) = self
                .store
                .update_follow_up_status(&sub.url, FollowUpStatus::Completed)
                .await
            {
                warn!(error = %e, url = %sub.url, "could not mark follow-up completed");
            }
        }
    }
}
