use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Token usage as reported by the provider. Local models typically report
/// nothing, in which case the whole struct is absent from the reply.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub cached_input_tokens: u64,
    pub output_tokens: u64,
}

impl LlmUsage {
    /// Input tokens billed at the regular (non-cached) rate.
    pub fn uncached_input_tokens(&self) -> u64 {
        self.input_tokens.saturating_sub(self.cached_input_tokens)
    }
}

/// One chat message for the completion-style call shape.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request for the tool-augmented call shape (instructions + free-form input).
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub instructions: String,
    pub input: String,
    /// Attach the provider's browsing tool so the model can fetch pages.
    pub enable_browsing: bool,
}

/// Request for the two-message chat-completion call shape.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Normalized reply shared by both call shapes.
#[derive(Clone, Debug)]
pub struct LlmReply {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

/// Port for the LLM provider. One client instance serves the summarization
/// engine and every enrichment sub-call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, req: GenerateRequest) -> Result<LlmReply>;
    async fn complete(&self, req: ChatRequest) -> Result<LlmReply>;

    /// Model identifier used for pricing lookups.
    fn model(&self) -> &str;
}
