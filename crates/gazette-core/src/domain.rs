use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Chat channel id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Chat message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// A stable reference to a chat message, used for replies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// A summarized article as persisted in the store.
///
/// `url` is the lookup key, compared as an exact string: no trailing-slash,
/// query-order or tracking-parameter normalization is applied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub requesting_user_id: UserId,
    pub requesting_username: String,
    pub topic: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub created_at: DateTime<Utc>,
    pub source: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowUpStatus {
    Pending,
    Completed,
}

/// A request by one or more users to be notified when a future article lands
/// on the same topic. Created elsewhere; this pipeline only consumes it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FollowUpSubscription {
    pub url: String,
    pub topic: String,
    pub follow_up_users: Vec<UserId>,
    pub status: FollowUpStatus,
}

/// Everything the pipeline needs to know about one shared link.
#[derive(Clone, Debug)]
pub struct SummaryRequest {
    pub url: String,
    pub channel_id: ChannelId,
    pub message: MessageRef,
    pub user_id: UserId,
    pub username: String,

    pub style: Option<String>,
    pub mood: Option<String>,
    pub narrator: Option<String>,
    pub historical_perspective: Option<String>,
    pub cultural_context: Option<String>,

    pub force_resummarize: bool,
}

impl SummaryRequest {
    pub fn new(
        url: impl Into<String>,
        channel_id: ChannelId,
        message: MessageRef,
        user_id: UserId,
        username: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            channel_id,
            message,
            user_id,
            username: username.into(),
            style: None,
            mood: None,
            narrator: None,
            historical_perspective: None,
            cultural_context: None,
            force_resummarize: false,
        }
    }
}
