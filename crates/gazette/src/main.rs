//! gazette: a chat bot that turns shared article links into enriched
//! summaries. This binary wires the real adapters to the core pipeline and
//! drives it from a small console front end: one URL per stdin line,
//! optional flags after it (`force`, `context`, `style=...`, `mood=...`,
//! `narrator=...`, `history=...`, `culture=...`).

mod console;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use gazette_core::{
    config::Config,
    domain::{ChannelId, MessageId, MessageRef, SummaryRequest, UserId},
    pipeline::{fetch::HttpContentFetcher, ArticlePipeline},
};
use gazette_openai::OpenAiClient;
use gazette_store::JsonFileStore;

use console::ConsoleMessenger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gazette_core::logging::init("gazette");

    let cfg = Arc::new(Config::load()?);

    let llm = Arc::new(OpenAiClient::new(
        cfg.llm_api_key.clone(),
        cfg.llm_base_url.clone(),
        cfg.summary_model.clone(),
    ));
    let store = Arc::new(JsonFileStore::open(cfg.articles_file.clone()).await?);
    let fetcher = Arc::new(HttpContentFetcher::new(cfg.fetch_timeout));
    let messenger = Arc::new(ConsoleMessenger);

    let pipeline = Arc::new(ArticlePipeline::new(
        cfg.clone(),
        llm,
        store,
        messenger,
        fetcher,
    ));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }

    run_console(pipeline, cfg, cancel).await
}

async fn run_console(
    pipeline: Arc<ArticlePipeline>,
    cfg: Arc<Config>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let username = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
    let next_message_id = AtomicU64::new(1);

    println!("gazette ready; one URL per line (ctrl-c to quit)");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("shutting down");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let message_id = next_message_id.fetch_add(1, Ordering::SeqCst);
                let (req, with_context) = parse_line(&cfg, line, &username, message_id);

                // Fire and forget: the pipeline reports through the messenger.
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    if with_context {
                        pipeline.process_url_with_context(req).await;
                    } else {
                        pipeline.process_url(req).await;
                    }
                });
            }
        }
    }

    Ok(())
}

fn parse_line(
    cfg: &Config,
    line: &str,
    username: &str,
    message_id: u64,
) -> (SummaryRequest, bool) {
    let mut parts = line.split_whitespace();
    let url = parts.next().unwrap_or_default().to_string();

    let channel_id = ChannelId(cfg.home_channel_id);
    let mut req = SummaryRequest::new(
        url,
        channel_id,
        MessageRef {
            channel_id,
            message_id: MessageId(message_id),
        },
        UserId(1),
        username,
    );

    let mut with_context = false;
    for part in parts {
        match part.split_once('=') {
            Some(("style", v)) => req.style = Some(v.to_string()),
            Some(("mood", v)) => req.mood = Some(v.to_string()),
            Some(("narrator", v)) => req.narrator = Some(v.to_string()),
            Some(("history", v)) => req.historical_perspective = Some(v.to_string()),
            Some(("culture", v)) => req.cultural_context = Some(v.to_string()),
            None if part == "force" => req.force_resummarize = true,
            None if part == "context" => with_context = true,
            _ => {}
        }
    }

    (req, with_context)
}
