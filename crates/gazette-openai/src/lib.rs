//! OpenAI-compatible LLM adapter.
//!
//! Implements both calling conventions of the core `LlmClient` port:
//! `complete` against `/chat/completions` and `generate` against
//! `/responses`, the latter optionally carrying the provider's `web_search`
//! tool so the model can fetch pages itself.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use gazette_core::{
    errors::Error,
    llm::{ChatRequest, GenerateRequest, LlmClient, LlmReply, LlmUsage},
    Result,
};

const API_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .expect("reqwest client build");
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "llm request");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "{path} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::Llm(format!("json error: {e}")))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, req: GenerateRequest) -> Result<LlmReply> {
        let mut body = json!({
            "model": self.model,
            "instructions": req.instructions,
            "input": req.input,
        });
        if req.enable_browsing {
            body["tools"] = json!([{ "type": "web_search" }]);
        }

        let v = self.post_json("/responses", body).await?;
        Ok(LlmReply {
            text: extract_response_text(&v),
            usage: parse_responses_usage(v.get("usage")),
        })
    }

    async fn complete(&self, req: ChatRequest) -> Result<LlmReply> {
        let body = json!({
            "model": self.model,
            "messages": req.messages,
        });

        let v = self.post_json("/chat/completions", body).await?;

        let parsed: ChatCompletion =
            serde_json::from_value(v).map_err(|e| Error::Llm(format!("unexpected body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(LlmReply {
            text,
            usage: parsed.usage.map(Into::into),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Deserialize)]
struct PromptTokensDetails {
    cached_tokens: Option<u64>,
}

impl From<ChatUsage> for LlmUsage {
    fn from(u: ChatUsage) -> Self {
        LlmUsage {
            input_tokens: u.prompt_tokens,
            cached_input_tokens: u
                .prompt_tokens_details
                .and_then(|d| d.cached_tokens)
                .unwrap_or(0),
            output_tokens: u.completion_tokens,
        }
    }
}

/// Collect assistant text out of a `/responses` body: the convenience
/// `output_text` field when present, otherwise the text parts of `output`
/// message items.
fn extract_response_text(v: &serde_json::Value) -> String {
    if let Some(text) = v.get("output_text").and_then(|t| t.as_str()) {
        return text.to_string();
    }

    let Some(items) = v.get("output").and_then(|o| o.as_array()) else {
        return String::new();
    };

    let mut out = String::new();
    for item in items {
        if item.get("type").and_then(|t| t.as_str()) != Some("message") {
            continue;
        }
        let Some(parts) = item.get("content").and_then(|c| c.as_array()) else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(|t| t.as_str()) == Some("output_text") {
                if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                    out.push_str(text);
                }
            }
        }
    }
    out
}

fn parse_responses_usage(v: Option<&serde_json::Value>) -> Option<LlmUsage> {
    let v = v?;
    let input_tokens = v.get("input_tokens").and_then(|x| x.as_u64())?;
    let output_tokens = v.get("output_tokens").and_then(|x| x.as_u64()).unwrap_or(0);
    let cached_input_tokens = v
        .get("input_tokens_details")
        .and_then(|d| d.get("cached_tokens"))
        .and_then(|x| x.as_u64())
        .unwrap_or(0);

    Some(LlmUsage {
        input_tokens,
        cached_input_tokens,
        output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_output_text_field() {
        let v = json!({ "output_text": "Hello" });
        assert_eq!(extract_response_text(&v), "Hello");
    }

    #[test]
    fn extracts_text_from_output_message_items() {
        let v = json!({
            "output": [
                { "type": "web_search_call", "status": "completed" },
                {
                    "type": "message",
                    "content": [
                        { "type": "output_text", "text": "Part one. " },
                        { "type": "output_text", "text": "Part two." }
                    ]
                }
            ]
        });
        assert_eq!(extract_response_text(&v), "Part one. Part two.");
    }

    #[test]
    fn missing_output_yields_empty_text() {
        assert_eq!(extract_response_text(&json!({})), "");
    }

    #[test]
    fn parses_responses_usage_with_cached_details() {
        let v = json!({
            "input_tokens": 1200,
            "output_tokens": 340,
            "input_tokens_details": { "cached_tokens": 1000 }
        });
        let usage = parse_responses_usage(Some(&v)).unwrap();
        assert_eq!(usage.input_tokens, 1200);
        assert_eq!(usage.cached_input_tokens, 1000);
        assert_eq!(usage.output_tokens, 340);
        assert_eq!(usage.uncached_input_tokens(), 200);
    }

    #[test]
    fn absent_usage_yields_none() {
        assert!(parse_responses_usage(None).is_none());
        assert!(parse_responses_usage(Some(&json!({}))).is_none());
    }

    #[test]
    fn chat_usage_maps_prompt_and_completion_tokens() {
        let u = ChatUsage {
            prompt_tokens: 100,
            completion_tokens: 25,
            prompt_tokens_details: Some(PromptTokensDetails {
                cached_tokens: Some(60),
            }),
        };
        let mapped: LlmUsage = u.into();
        assert_eq!(mapped.input_tokens, 100);
        assert_eq!(mapped.cached_input_tokens, 60);
        assert_eq!(mapped.output_tokens, 25);
    }
}
