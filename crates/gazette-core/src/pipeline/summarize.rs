//! The summarization engine: one of two calling conventions, chosen at
//! construction, plus token/cost accounting around the call.

use std::sync::Arc;

use tracing::debug;

use crate::{
    config::SummarizerMode,
    errors::Error,
    llm::{ChatMessage, ChatRequest, GenerateRequest, LlmClient, LlmReply, LlmUsage},
    pipeline::modifiers::{apply_modifiers, ModifierDirective},
    pricing::{estimate_tokens, CostTracker, RequestCost},
    Result,
};

const BASE_PROMPT: &str = "You are a news summarization assistant. Summarize the article \
faithfully and concisely for a chat channel: lead with the core finding, keep names, \
numbers and dates exact, and do not editorialize.";

/// Result contract shared by both calling conventions.
#[derive(Clone, Debug)]
pub struct SummaryOutcome {
    pub text: String,
    pub usage: Option<LlmUsage>,
    pub cost: Option<RequestCost>,
}

pub struct SummarizationEngine {
    llm: Arc<dyn LlmClient>,
    mode: SummarizerMode,
    max_summary_length: usize,
    costs: Arc<CostTracker>,
}

impl SummarizationEngine {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        mode: SummarizerMode,
        max_summary_length: usize,
        costs: Arc<CostTracker>,
    ) -> Self {
        Self {
            llm,
            mode,
            max_summary_length,
            costs,
        }
    }

    /// Produce the core summary for `url`. `content` is the directly fetched
    /// article text when the URL was rewritten to an archive-text endpoint;
    /// `None` means the browsing-capable call fetches the page itself.
    pub async fn summarize(
        &self,
        url: &str,
        content: Option<&str>,
        directives: &[ModifierDirective],
    ) -> Result<SummaryOutcome> {
        let system = apply_modifiers(BASE_PROMPT, directives);

        let reply = match self.mode {
            SummarizerMode::Browsing => self.run_browsing(&system, url, content).await?,
            SummarizerMode::Completion => self.run_completion(&system, url, content).await?,
        };

        let text = reply.text.trim().to_string();
        if text.is_empty() {
            return Err(Error::Generation(
                "provider returned an empty summary".to_string(),
            ));
        }

        Ok(SummaryOutcome {
            text,
            usage: reply.usage,
            cost: reply.cost,
        })
    }

    async fn run_browsing(
        &self,
        system: &str,
        url: &str,
        content: Option<&str>,
    ) -> Result<PricedReply> {
        let input = match content {
            Some(text) => format!("Article from {url}:\n\n{text}"),
            None => url.to_string(),
        };

        let estimated = estimate_tokens(system) + estimate_tokens(&input);
        debug!(estimated_input_tokens = estimated, "browsing summarization call");

        let reply = self
            .llm
            .generate(GenerateRequest {
                instructions: system.to_string(),
                input,
                enable_browsing: true,
            })
            .await?;

        Ok(self.price(estimated, reply))
    }

    async fn run_completion(
        &self,
        system: &str,
        url: &str,
        content: Option<&str>,
    ) -> Result<PricedReply> {
        let user = match content {
            Some(text) => format!(
                "Summarize the following article in at most {} characters.\n\n{}",
                self.max_summary_length, text
            ),
            None => format!(
                "Summarize the article at {} in at most {} characters.",
                url, self.max_summary_length
            ),
        };

        let estimated = estimate_tokens(system) + estimate_tokens(&user);
        debug!(
            estimated_input_tokens = estimated,
            "completion summarization call"
        );

        let reply = self
            .llm
            .complete(ChatRequest {
                messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            })
            .await?;

        Ok(self.price(estimated, reply))
    }

    fn price(&self, estimated_input_tokens: u64, reply: LlmReply) -> PricedReply {
        let cost = self
            .costs
            .record(self.llm.model(), estimated_input_tokens, reply.usage.as_ref());
        PricedReply {
            text: reply.text,
            usage: reply.usage,
            cost,
        }
    }
}

struct PricedReply {
    text: String,
    usage: Option<LlmUsage>,
    cost: Option<RequestCost>,
}
