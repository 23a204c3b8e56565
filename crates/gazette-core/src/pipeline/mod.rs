//! The article processing pipeline.
//!
//! One shared URL in, one posted enriched summary out. Stage order:
//! busy gate → dedup → archive classification/rewrite → content acquisition →
//! translation → summarization → enrichment → related lookup → persist →
//! post → follow-up notification. All user-visible output goes through the
//! messaging port; callers treat `process_url` as fire-and-forget.

pub mod archive;
pub mod enhance;
pub mod fetch;
pub mod followup;
pub mod modifiers;
pub mod relate;
pub mod summarize;
pub mod translate;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    domain::{ArticleRecord, SummaryRequest},
    errors::Error,
    formatting::{duplicate_notice, summary_message, MessageExtras},
    llm::LlmClient,
    messaging::MessagingPort,
    pricing::CostTracker,
    store::ArticleStore,
    Result,
};

use self::{
    enhance::Enricher, fetch::ContentFetcher, followup::FollowUpNotifier,
    modifiers::resolve_modifiers, summarize::SummarizationEngine, translate::Translator,
};

pub struct ArticlePipeline {
    cfg: Arc<Config>,
    store: Arc<dyn ArticleStore>,
    messenger: Arc<dyn MessagingPort>,
    fetcher: Arc<dyn ContentFetcher>,

    engine: SummarizationEngine,
    translator: Translator,
    enricher: Enricher,
    notifier: Arc<FollowUpNotifier>,
    costs: Arc<CostTracker>,

    // Single-permit gate: one run per service instance; arrivals while busy
    // are dropped, never queued. The permit drop at the end of `run` clears
    // the flag on success and failure alike.
    busy: Semaphore,
}

impl ArticlePipeline {
    pub fn new(
        cfg: Arc<Config>,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn ArticleStore>,
        messenger: Arc<dyn MessagingPort>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        let costs = Arc::new(CostTracker::new());
        let engine = SummarizationEngine::new(
            llm.clone(),
            cfg.summarizer_mode,
            cfg.max_summary_length,
            costs.clone(),
        );
        let translator = Translator::new(llm.clone(), cfg.target_language.clone());
        let enricher = Enricher::new(llm, cfg.reading_wpm);
        let notifier = Arc::new(FollowUpNotifier::new(store.clone(), messenger.clone()));

        Self {
            cfg,
            store,
            messenger,
            fetcher,
            engine,
            translator,
            enricher,
            notifier,
            costs,
            busy: Semaphore::new(1),
        }
    }

    pub fn cost_tracker(&self) -> &CostTracker {
        &self.costs
    }

    /// Summarize one shared link. All output is emitted through the
    /// messaging port.
    pub async fn process_url(&self, req: SummaryRequest) {
        self.run(req, false).await;
    }

    /// Like [`process_url`], with an extra background-context lookup stage.
    ///
    /// [`process_url`]: Self::process_url
    pub async fn process_url_with_context(&self, req: SummaryRequest) {
        self.run(req, true).await;
    }

    async fn run(&self, req: SummaryRequest, with_context: bool) {
        let Ok(_permit) = self.busy.try_acquire() else {
            warn!(url = %req.url, "pipeline busy; dropping request");
            return;
        };

        info!(url = %req.url, user = %req.username, "processing shared link");

        if let Err(e) = self.run_inner(&req, with_context).await {
            error!(error = %e, url = %req.url, "article pipeline failed");
            if let Err(send_err) = self.messenger.reply(req.message, &e.user_message()).await {
                error!(error = %send_err, "could not deliver failure notice");
            }
        }
    }

    async fn run_inner(&self, req: &SummaryRequest, with_context: bool) -> Result<()> {
        // Dedup gate: exact-string lookup before any paid work.
        if !req.force_resummarize {
            if let Some(existing) = self.store.find_article_by_url(&req.url).await? {
                info!(url = %req.url, "duplicate link; skipping");
                self.messenger
                    .reply(req.message, &duplicate_notice(&existing))
                    .await?;
                return Ok(());
            }
        }

        // Modifier validation also happens before any paid work.
        let directives = resolve_modifiers(&self.cfg, req)?;

        let host = archive::host_of(&req.url);
        let rewritten = match host.as_deref() {
            Some(h) if self.cfg.is_archive_host(h) => {
                match archive::transform(&req.url, &self.cfg.archive_text_host) {
                    Ok(text_url) => {
                        info!(url = %req.url, text_url = %text_url, "archive link rewritten");
                        Some(text_url)
                    }
                    Err(e) => {
                        // Keeps the three malformed-input cases apart in logs.
                        error!(url = %req.url, "archive rewrite failed: {e}");
                        return Err(Error::InvalidRequest(e.user_message()));
                    }
                }
            }
            _ => None,
        };

        // Only rewritten archive-text URLs are fetched directly; ordinary
        // URLs go to the browsing-capable summarization call untouched.
        let content = match &rewritten {
            Some(text_url) => Some(self.fetcher.fetch_text(text_url).await?),
            None => None,
        };

        let mut translated_from = None;
        let content = match content {
            Some(text) if self.cfg.auto_translate => {
                let outcome = self.translator.translate_if_needed(&text).await;
                if outcome.was_translated {
                    translated_from = outcome.detected_language;
                }
                Some(outcome.text)
            }
            other => other,
        };

        let summary = self
            .engine
            .summarize(&req.url, content.as_deref(), &directives)
            .await?;

        let enrichment = self
            .enricher
            .enrich(&summary.text, content.as_deref(), self.cfg.bias_detection)
            .await;

        let context = if with_context && self.cfg.context_provider {
            self.enricher
                .background_context(&summary.text, &self.cfg.context_provider_prompt)
                .await
        } else {
            None
        };

        let related = if enrichment.has_topic() {
            relate::find_related(
                self.store.as_ref(),
                &enrichment.topic,
                &req.url,
                self.cfg.related_articles_limit,
            )
            .await
        } else {
            Vec::new()
        };

        let (input_tokens, output_tokens) = summary
            .usage
            .as_ref()
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        let record = ArticleRecord {
            url: req.url.clone(),
            requesting_user_id: req.user_id,
            requesting_username: req.username.clone(),
            topic: enrichment.topic.clone(),
            input_tokens,
            output_tokens,
            created_at: Utc::now(),
            source: host.unwrap_or_default(),
        };
        self.store.persist_article(&record).await?;

        let extras = MessageExtras {
            translated_from,
            context,
            related,
        };
        let message = summary_message(&req.url, &req.username, &summary.text, &enrichment, &extras);
        self.messenger
            .send_to_channel(req.channel_id, &message)
            .await?;

        if self.cfg.follow_up_tracker && enrichment.has_topic() {
            let notifier = self.notifier.clone();
            let summary_text = summary.text.clone();
            tokio::spawn(async move {
                notifier.notify_subscribers(&record, &summary_text).await;
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::domain::{
        ChannelId, FollowUpStatus, FollowUpSubscription, MessageId, MessageRef, UserId,
    };
    use crate::llm::{ChatRequest, GenerateRequest, LlmReply, LlmUsage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// LLM fake: fixed summary reply, optional failure for every call after
    /// the first, optional gate making the first call block until released.
    struct FakeLlm {
        summary_text: String,
        usage: Option<LlmUsage>,
        fail_after_first: bool,
        calls: AtomicUsize,
        completes: Mutex<Vec<ChatRequest>>,
        started: Notify,
        gate: tokio::sync::Semaphore,
        gated: bool,
    }

    impl FakeLlm {
        fn new(summary_text: &str) -> Self {
            Self {
                summary_text: summary_text.to_string(),
                usage: Some(LlmUsage {
                    input_tokens: 120,
                    cached_input_tokens: 0,
                    output_tokens: 40,
                }),
                fail_after_first: false,
                calls: AtomicUsize::new(0),
                completes: Mutex::new(Vec::new()),
                started: Notify::new(),
                gate: tokio::sync::Semaphore::new(0),
                gated: false,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn answer(&self) -> Result<LlmReply> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.started.notify_one();
                if self.gated {
                    let _ = self.gate.acquire().await;
                }
                return Ok(LlmReply {
                    text: self.summary_text.clone(),
                    usage: self.usage.clone(),
                });
            }
            if self.fail_after_first {
                return Err(Error::Llm("provider down".to_string()));
            }
            Ok(LlmReply {
                text: "Technology".to_string(),
                usage: None,
            })
        }
    }

    #[async_trait]
    impl crate::llm::LlmClient for FakeLlm {
        async fn generate(&self, _req: GenerateRequest) -> Result<LlmReply> {
            self.answer().await
        }

        async fn complete(&self, req: ChatRequest) -> Result<LlmReply> {
            self.completes.lock().unwrap().push(req.clone());
            self.answer().await
        }

        fn model(&self) -> &str {
            "gpt-4o-mini"
        }
    }

    #[derive(Default)]
    struct FakeStore {
        articles: Mutex<HashMap<String, ArticleRecord>>,
        subscriptions: Mutex<Vec<FollowUpSubscription>>,
        persists: AtomicUsize,
    }

    #[async_trait]
    impl ArticleStore for FakeStore {
        async fn find_article_by_url(&self, url: &str) -> Result<Option<ArticleRecord>> {
            Ok(self.articles.lock().unwrap().get(url).cloned())
        }

        async fn persist_article(&self, record: &ArticleRecord) -> Result<()> {
            self.persists.fetch_add(1, Ordering::SeqCst);
            self.articles
                .lock()
                .unwrap()
                .insert(record.url.clone(), record.clone());
            Ok(())
        }

        async fn find_related_articles(
            &self,
            topic: &str,
            exclude_url: &str,
            limit: usize,
        ) -> Result<Vec<ArticleRecord>> {
            Ok(self
                .articles
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.topic == topic && r.url != exclude_url)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn articles_for_follow_up(&self) -> Result<Vec<FollowUpSubscription>> {
            Ok(self.subscriptions.lock().unwrap().clone())
        }

        async fn update_follow_up_status(
            &self,
            url: &str,
            status: FollowUpStatus,
        ) -> Result<()> {
            for sub in self.subscriptions.lock().unwrap().iter_mut() {
                if sub.url == url {
                    sub.status = status;
                }
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        channel_sends: Mutex<Vec<(ChannelId, String)>>,
        replies: Mutex<Vec<(MessageRef, String)>>,
        dms: Mutex<Vec<(UserId, String)>>,
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_to_channel(&self, channel_id: ChannelId, text: &str) -> Result<()> {
            self.channel_sends
                .lock()
                .unwrap()
                .push((channel_id, text.to_string()));
            Ok(())
        }

        async fn reply(&self, msg: MessageRef, text: &str) -> Result<()> {
            self.replies.lock().unwrap().push((msg, text.to_string()));
            Ok(())
        }

        async fn send_direct(&self, user_id: UserId, text: &str) -> Result<()> {
            self.dms.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeFetcher {
        body: Option<String>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentFetcher for FakeFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.fetched.lock().unwrap().push(url.to_string());
            match &self.body {
                Some(body) => Ok(body.clone()),
                None => Err(Error::Fetch {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    struct Harness {
        pipeline: Arc<ArticlePipeline>,
        llm: Arc<FakeLlm>,
        store: Arc<FakeStore>,
        messenger: Arc<FakeMessenger>,
        fetcher: Arc<FakeFetcher>,
    }

    fn harness_with(cfg: Config, llm: FakeLlm, fetcher: FakeFetcher) -> Harness {
        let llm = Arc::new(llm);
        let store = Arc::new(FakeStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        let fetcher = Arc::new(fetcher);
        let pipeline = Arc::new(ArticlePipeline::new(
            Arc::new(cfg),
            llm.clone(),
            store.clone(),
            messenger.clone(),
            fetcher.clone(),
        ));
        Harness {
            pipeline,
            llm,
            store,
            messenger,
            fetcher,
        }
    }

    fn harness() -> Harness {
        harness_with(test_config(), FakeLlm::new("Great summary."), FakeFetcher::default())
    }

    fn request(url: &str) -> SummaryRequest {
        SummaryRequest::new(
            url,
            ChannelId(5),
            MessageRef {
                channel_id: ChannelId(5),
                message_id: MessageId(99),
            },
            UserId(7),
            "reader",
        )
    }

    #[tokio::test]
    async fn posts_summary_and_persists_record() {
        let h = harness();
        h.pipeline.process_url(request("https://example.com/story")).await;

        let sends = h.messenger.channel_sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, ChannelId(5));
        assert!(sends[0].1.contains("Great summary."));
        assert!(sends[0].1.contains("Topic: Technology"));

        let articles = h.store.articles.lock().unwrap();
        let rec = articles.get("https://example.com/story").unwrap();
        assert_eq!(rec.topic, "Technology");
        assert_eq!(rec.input_tokens, 120);
        assert_eq!(rec.output_tokens, 40);
        assert_eq!(rec.source, "example.com");
        assert!(h.messenger.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_share_gets_duplicate_notice_without_paid_work() {
        let h = harness();
        h.pipeline.process_url(request("https://example.com/story")).await;
        let calls_after_first = h.llm.call_count();

        h.pipeline.process_url(request("https://example.com/story")).await;

        assert_eq!(h.llm.call_count(), calls_after_first);
        assert_eq!(h.store.persists.load(Ordering::SeqCst), 1);

        let replies = h.messenger.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].1.contains("already shared by @reader"));
    }

    #[tokio::test]
    async fn force_resummarize_bypasses_the_gate() {
        let h = harness();
        h.pipeline.process_url(request("https://example.com/story")).await;
        let calls_after_first = h.llm.call_count();

        let mut req = request("https://example.com/story");
        req.force_resummarize = true;
        h.pipeline.process_url(req).await;

        assert!(h.llm.call_count() > calls_after_first);
        assert_eq!(h.store.persists.load(Ordering::SeqCst), 2);
        assert_eq!(h.messenger.channel_sends.lock().unwrap().len(), 2);
        assert!(h.messenger.replies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_request_is_dropped_while_busy() {
        let mut llm = FakeLlm::new("Great summary.");
        llm.gated = true;
        let h = harness_with(test_config(), llm, FakeFetcher::default());

        let pipeline = h.pipeline.clone();
        let first = tokio::spawn(async move {
            pipeline.process_url(request("https://example.com/one")).await;
        });

        // Wait until the first run is inside its summarization call.
        h.llm.started.notified().await;

        h.pipeline.process_url(request("https://example.com/two")).await;

        // The second call produced no side effects at all.
        assert!(h.messenger.channel_sends.lock().unwrap().is_empty());
        assert!(h.messenger.replies.lock().unwrap().is_empty());
        assert_eq!(h.store.persists.load(Ordering::SeqCst), 0);

        h.llm.gate.add_permits(1);
        first.await.unwrap();

        // The first run completed normally once released.
        assert_eq!(h.store.persists.load(Ordering::SeqCst), 1);
        assert_eq!(h.messenger.channel_sends.lock().unwrap().len(), 1);

        // And the gate is clear again for the next run.
        h.pipeline.process_url(request("https://example.com/three")).await;
        assert_eq!(h.store.persists.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enrichment_outage_degrades_fields_but_still_posts() {
        let mut llm = FakeLlm::new("Great summary.");
        llm.fail_after_first = true;
        let h = harness_with(test_config(), llm, FakeFetcher::default());

        h.pipeline.process_url(request("https://example.com/story")).await;

        let sends = h.messenger.channel_sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].1.contains("Great summary."));
        assert!(sends[0].1.contains("Topic: N/A"));
        assert!(sends[0].1.contains("Sentiment: N/A"));
        assert!(h.messenger.replies.lock().unwrap().is_empty());

        let articles = h.store.articles.lock().unwrap();
        assert_eq!(articles.get("https://example.com/story").unwrap().topic, "N/A");
    }

    #[tokio::test]
    async fn archive_link_is_rewritten_and_fetched_directly() {
        let fetcher = FakeFetcher {
            body: Some("Fetched article body text.".to_string()),
            ..FakeFetcher::default()
        };
        let h = harness_with(test_config(), FakeLlm::new("Great summary."), fetcher);

        h.pipeline
            .process_url(request("https://archive.ph/o7Qnd/https://example.com/story"))
            .await;

        let fetched = h.fetcher.fetched.lock().unwrap();
        assert_eq!(
            fetched.as_slice(),
            &["https://archive.ph/TEXT/https://example.com/story".to_string()]
        );

        // The fetched text reached the summarization call.
        let completes = h.llm.completes.lock().unwrap();
        assert!(completes[0].messages[1]
            .content
            .contains("Fetched article body text."));
    }

    #[tokio::test]
    async fn fetch_failure_aborts_with_user_notice_before_summarizing() {
        let h = harness_with(
            test_config(),
            FakeLlm::new("Great summary."),
            FakeFetcher::default(), // no body -> fetch error
        );

        h.pipeline
            .process_url(request("https://archive.ph/o7Qnd/https://example.com/story"))
            .await;

        assert_eq!(h.llm.call_count(), 0);
        assert!(h.messenger.channel_sends.lock().unwrap().is_empty());

        let replies = h.messenger.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].1.contains("could not retrieve"));
    }

    #[tokio::test]
    async fn malformed_archive_link_fails_before_any_llm_call() {
        let h = harness();
        h.pipeline
            .process_url(request("https://archive.ph/2024/01/snapshot"))
            .await;

        assert_eq!(h.llm.call_count(), 0);
        let replies = h.messenger.replies.lock().unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].1.contains("could not find the original article URL"));
    }

    #[tokio::test]
    async fn unknown_modifier_is_rejected_before_any_llm_call() {
        let h = harness();
        let mut req = request("https://example.com/story");
        req.style = Some("nonexistent".to_string());
        h.pipeline.process_url(req).await;

        assert_eq!(h.llm.call_count(), 0);
        let replies = h.messenger.replies.lock().unwrap();
        assert!(replies[0].1.contains("Unknown style"));
    }

    #[tokio::test]
    async fn context_variant_adds_background_section() {
        let mut cfg = test_config();
        cfg.context_provider = true;
        let h = harness_with(cfg, FakeLlm::new("Great summary."), FakeFetcher::default());

        h.pipeline
            .process_url_with_context(request("https://example.com/story"))
            .await;

        let sends = h.messenger.channel_sends.lock().unwrap();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].1.contains("🧭 Background: Technology"));
    }

    #[tokio::test]
    async fn follow_up_subscribers_are_notified_after_posting() {
        let h = harness();
        h.store
            .subscriptions
            .lock()
            .unwrap()
            .push(FollowUpSubscription {
                url: "https://example.com/earlier".to_string(),
                topic: "Technology".to_string(),
                follow_up_users: vec![UserId(42)],
                status: FollowUpStatus::Pending,
            });

        h.pipeline.process_url(request("https://example.com/story")).await;

        // The notifier runs on a spawned task; give it a tick to drain.
        for _ in 0..50 {
            if !h.messenger.dms.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let dms = h.messenger.dms.lock().unwrap();
        assert_eq!(dms.len(), 1);
        assert_eq!(dms[0].0, UserId(42));
        assert!(dms[0].1.contains("https://example.com/story"));

        let subs = h.store.subscriptions.lock().unwrap();
        assert_eq!(subs[0].status, FollowUpStatus::Completed);
    }
}
