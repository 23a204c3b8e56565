//! Metadata enrichment around a finished summary.
//!
//! Every sub-call here is best-effort: a failed call degrades its own field
//! to "N/A" (or drops the optional section) and never aborts the stage.

use std::sync::Arc;

use tracing::warn;

use crate::llm::{ChatMessage, ChatRequest, LlmClient};

pub const DEGRADED_FIELD: &str = "N/A";

/// Approximate reading time from a word count: `~N min read`, rounded up.
/// Empty text yields an empty label.
pub fn reading_time_label(text: &str, wpm: u32) -> String {
    let words = text.split_whitespace().count() as u32;
    if words == 0 {
        return String::new();
    }
    let minutes = (words + wpm - 1) / wpm.max(1);
    format!("~{minutes} min read")
}

#[derive(Clone, Debug)]
pub struct Enrichment {
    pub topic: String,
    pub sentiment: String,
    pub reading_time: String,
    pub bias: Option<String>,
    pub quote: Option<String>,
}

impl Enrichment {
    /// A topic usable for relation lookups and follow-up matching.
    pub fn has_topic(&self) -> bool {
        !self.topic.is_empty() && self.topic != DEGRADED_FIELD
    }
}

pub struct Enricher {
    llm: Arc<dyn LlmClient>,
    reading_wpm: u32,
}

impl Enricher {
    pub fn new(llm: Arc<dyn LlmClient>, reading_wpm: u32) -> Self {
        Self { llm, reading_wpm }
    }

    pub async fn enrich(
        &self,
        summary: &str,
        content: Option<&str>,
        bias_enabled: bool,
    ) -> Enrichment {
        let reading_time = reading_time_label(content.unwrap_or(""), self.reading_wpm);

        let topic = self
            .field(
                "Give a single short topic label for this article summary, one or two \
                 words, capitalized. Reply with the label only.",
                summary,
            )
            .await
            .unwrap_or_else(|| DEGRADED_FIELD.to_string());

        let sentiment = self
            .field(
                "Give a one-word sentiment label for this article summary: Positive, \
                 Negative, Neutral or Mixed. Reply with the label only.",
                summary,
            )
            .await
            .unwrap_or_else(|| DEGRADED_FIELD.to_string());

        let bias = if bias_enabled {
            let basis = content.unwrap_or(summary);
            Some(
                self.field(
                    "Briefly analyze this article for framing or bias: loaded wording, \
                     one-sided sourcing, missing perspectives. Two sentences at most.",
                    basis,
                )
                .await
                .unwrap_or_else(|| DEGRADED_FIELD.to_string()),
            )
        } else {
            None
        };

        let quote = match content {
            Some(text) => self.notable_quote(text).await,
            None => None,
        };

        Enrichment {
            topic,
            sentiment,
            reading_time,
            bias,
            quote,
        }
    }

    /// Background paragraph for `process_url_with_context`. `None` skips the
    /// section.
    pub async fn background_context(&self, summary: &str, prompt: &str) -> Option<String> {
        self.field(prompt, summary).await
    }

    async fn notable_quote(&self, content: &str) -> Option<String> {
        let reply = self
            .field(
                "Pick the single most striking direct quotation from this article. \
                 Reply with the quotation only, no attribution. If there is no direct \
                 quotation, reply NONE.",
                content,
            )
            .await?;
        if reply.eq_ignore_ascii_case("none") {
            return None;
        }
        Some(reply)
    }

    /// One small completion call; `None` on any failure or empty reply.
    async fn field(&self, system: &str, user: &str) -> Option<String> {
        let result = self
            .llm
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(system),
                    ChatMessage::user(user.to_string()),
                ],
            })
            .await;

        match result {
            Ok(reply) => {
                let text = reply.text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
            Err(e) => {
                warn!(error = %e, "enrichment sub-call failed");
                None
            }
        }
    }
}
