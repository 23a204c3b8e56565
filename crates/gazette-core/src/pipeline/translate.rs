//! Optional auto-translation of fetched article text.
//!
//! Two sequential LLM calls: detect the dominant language, then translate
//! when it differs from the configured target. Failure at either step hands
//! the original text through untouched; translation never aborts a run.

use std::sync::Arc;

use tracing::warn;

use crate::llm::{ChatMessage, ChatRequest, LlmClient};

const DETECT_SAMPLE_CHARS: usize = 600;

#[derive(Clone, Debug)]
pub struct TranslationOutcome {
    pub text: String,
    pub was_translated: bool,
    pub detected_language: Option<String>,
}

pub struct Translator {
    llm: Arc<dyn LlmClient>,
    target_language: String,
}

impl Translator {
    pub fn new(llm: Arc<dyn LlmClient>, target_language: impl Into<String>) -> Self {
        Self {
            llm,
            target_language: target_language.into(),
        }
    }

    pub async fn translate_if_needed(&self, text: &str) -> TranslationOutcome {
        let original = || TranslationOutcome {
            text: text.to_string(),
            was_translated: false,
            detected_language: None,
        };

        let detected = match self.detect_language(text).await {
            Ok(lang) if !lang.is_empty() => lang,
            Ok(_) => return original(),
            Err(e) => {
                warn!(error = %e, "language detection failed; keeping original text");
                return original();
            }
        };

        if detected.eq_ignore_ascii_case(&self.target_language) {
            return TranslationOutcome {
                text: text.to_string(),
                was_translated: false,
                detected_language: Some(detected),
            };
        }

        match self.translate(text, &detected).await {
            Ok(translated) if !translated.is_empty() => TranslationOutcome {
                text: translated,
                was_translated: true,
                detected_language: Some(detected),
            },
            Ok(_) => original(),
            Err(e) => {
                warn!(error = %e, "translation failed; keeping original text");
                original()
            }
        }
    }

    async fn detect_language(&self, text: &str) -> crate::Result<String> {
        let sample: String = text.chars().take(DETECT_SAMPLE_CHARS).collect();
        let reply = self
            .llm
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(
                        "Identify the dominant language of the text. Reply with the \
                         English name of the language and nothing else.",
                    ),
                    ChatMessage::user(sample),
                ],
            })
            .await?;
        Ok(reply.text.trim().to_string())
    }

    async fn translate(&self, text: &str, from: &str) -> crate::Result<String> {
        let reply = self
            .llm
            .complete(ChatRequest {
                messages: vec![
                    ChatMessage::system(format!(
                        "Translate the text from {} into {}. Preserve meaning, tone and \
                         paragraph breaks. Output only the translation.",
                        from, self.target_language
                    )),
                    ChatMessage::user(text.to_string()),
                ],
            })
            .await?;
        Ok(reply.text.trim().to_string())
    }
}
