//! Composition of the user-visible messages the pipeline emits.

use crate::{
    domain::{ArticleRecord, FollowUpSubscription},
    pipeline::enhance::Enrichment,
};

/// Everything that goes into the final channel message besides the summary
/// itself.
#[derive(Clone, Debug, Default)]
pub struct MessageExtras {
    pub translated_from: Option<String>,
    pub context: Option<String>,
    pub related: Vec<ArticleRecord>,
}

pub fn summary_message(
    url: &str,
    username: &str,
    summary: &str,
    enrichment: &Enrichment,
    extras: &MessageExtras,
) -> String {
    let mut out = format!("📰 {url} (shared by @{username})\n\n{summary}\n");

    if let Some(quote) = &enrichment.quote {
        out.push_str(&format!("\n💬 {quote}\n"));
    }

    if let Some(context) = &extras.context {
        out.push_str(&format!("\n🧭 Background: {context}\n"));
    }

    if let Some(lang) = &extras.translated_from {
        out.push_str(&format!("\n🌐 Translated from {lang}\n"));
    }

    let mut meta = format!(
        "\n🏷️ Topic: {} · Sentiment: {}",
        enrichment.topic, enrichment.sentiment
    );
    if !enrichment.reading_time.is_empty() {
        meta.push_str(&format!(" · {}", enrichment.reading_time));
    }
    meta.push('\n');
    out.push_str(&meta);

    if let Some(bias) = &enrichment.bias {
        out.push_str(&format!("⚖️ Bias check: {bias}\n"));
    }

    if !extras.related.is_empty() {
        let urls = extras
            .related
            .iter()
            .map(|r| r.url.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!("\n🔗 Related articles:\n{urls}\n"));
    }

    out.trim_end().to_string()
}

/// Reply sent when the dedup gate finds an existing record.
pub fn duplicate_notice(existing: &ArticleRecord) -> String {
    format!(
        "This article was already shared by @{} on {}.",
        existing.requesting_username,
        existing.created_at.format("%b %-d, %Y")
    )
}

/// DM sent to a follow-up subscriber when a matching article lands.
pub fn follow_up_dm(
    subscription: &FollowUpSubscription,
    article: &ArticleRecord,
    summary: &str,
) -> String {
    format!(
        "🔔 Follow-up on \"{}\": a new article just came in.\n\nNew: {}\nEarlier: {}\n\n{}",
        subscription.topic, article.url, subscription.url, summary
    )
}
