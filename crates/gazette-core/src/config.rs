use std::{collections::BTreeMap, env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Which calling convention the summarization engine uses. Chosen once per
/// process from configuration, not per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizerMode {
    /// One tool-augmented call; the model may fetch the page itself.
    Browsing,
    /// Two-message chat completion with an explicit character budget.
    Completion,
}

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // LLM provider
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub summary_model: String,
    pub summarizer_mode: SummarizerMode,

    // Archive mirrors
    pub archive_hosts: Vec<String>,
    pub archive_text_host: String,

    // Summaries
    pub max_summary_length: usize,
    pub reading_wpm: u32,
    pub related_articles_limit: usize,

    // Feature flags
    pub auto_translate: bool,
    pub target_language: String,
    pub bias_detection: bool,
    pub context_provider: bool,
    pub context_provider_prompt: String,
    pub follow_up_tracker: bool,

    // Content fetching
    pub fetch_timeout: Duration,

    // Persistence
    pub articles_file: std::path::PathBuf,

    // Console front end
    pub home_channel_id: u64,

    // Prompt modifier lookup tables (key -> directive sentence)
    pub styles: BTreeMap<String, String>,
    pub moods: BTreeMap<String, String>,
    pub narrators: BTreeMap<String, String>,
    pub historical_perspectives: BTreeMap<String, String>,
    pub cultural_contexts: BTreeMap<String, String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let llm_api_key = env_str("LLM_API_KEY").unwrap_or_default();
        if llm_api_key.trim().is_empty() {
            return Err(Error::Config(
                "LLM_API_KEY environment variable is required".to_string(),
            ));
        }

        let llm_base_url =
            env_str("LLM_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let summary_model = env_str("SUMMARY_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        let summarizer_mode = match env_str("SUMMARIZER_MODE").as_deref() {
            None | Some("browsing") => SummarizerMode::Browsing,
            Some("completion") => SummarizerMode::Completion,
            Some(other) => {
                return Err(Error::Config(format!(
                    "SUMMARIZER_MODE must be 'browsing' or 'completion', got '{other}'"
                )))
            }
        };

        let archive_hosts = parse_csv(
            env_str("ARCHIVE_HOSTS")
                .or_else(|| Some("archive.ph,archive.today,archive.is".to_string())),
        );
        let archive_text_host =
            env_str("ARCHIVE_TEXT_HOST").unwrap_or_else(|| "archive.ph".to_string());

        let max_summary_length = env_usize("MAX_SUMMARY_LENGTH").unwrap_or(1800);
        let reading_wpm = env_u32("READING_WPM").unwrap_or(200).max(1);
        let related_articles_limit = env_usize("RELATED_ARTICLES_LIMIT").unwrap_or(3);

        let auto_translate = env_bool("AUTO_TRANSLATE").unwrap_or(false);
        let target_language = env_str("TARGET_LANGUAGE").unwrap_or_else(|| "English".to_string());
        let bias_detection = env_bool("BIAS_DETECTION").unwrap_or(false);
        let context_provider = env_bool("CONTEXT_PROVIDER").unwrap_or(false);
        let context_provider_prompt = env_str("CONTEXT_PROVIDER_PROMPT").unwrap_or_else(|| {
            "Give two or three sentences of background a reader needs to place this \
             story: the actors involved, what led up to it, and why it matters now."
                .to_string()
        });
        let follow_up_tracker = env_bool("FOLLOW_UP_TRACKER").unwrap_or(true);

        let fetch_timeout = Duration::from_secs(env_u64("FETCH_TIMEOUT_SECS").unwrap_or(30));

        let articles_file = std::path::PathBuf::from(
            env_str("ARTICLES_FILE").unwrap_or_else(|| "/tmp/gazette-articles.json".to_string()),
        );

        let home_channel_id = env_u64("HOME_CHANNEL_ID").unwrap_or(0);

        Ok(Self {
            llm_api_key,
            llm_base_url,
            summary_model,
            summarizer_mode,
            archive_hosts,
            archive_text_host,
            max_summary_length,
            reading_wpm,
            related_articles_limit,
            auto_translate,
            target_language,
            bias_detection,
            context_provider,
            context_provider_prompt,
            follow_up_tracker,
            fetch_timeout,
            articles_file,
            home_channel_id,
            styles: default_styles(),
            moods: default_moods(),
            narrators: default_narrators(),
            historical_perspectives: default_historical_perspectives(),
            cultural_contexts: default_cultural_contexts(),
        })
    }

    /// True when the parsed host belongs to a configured archive mirror.
    pub fn is_archive_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.archive_hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
    }
}

fn table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_styles() -> BTreeMap<String, String> {
    table(&[
        (
            "formal",
            "Write the summary in a formal, broadsheet register.",
        ),
        (
            "casual",
            "Write the summary in a relaxed, conversational register.",
        ),
        (
            "tabloid",
            "Write the summary as breathless tabloid copy with a punchy headline feel.",
        ),
        (
            "haiku",
            "Condense the summary into a sequence of haiku stanzas.",
        ),
        (
            "eli5",
            "Explain the story as you would to a curious ten-year-old.",
        ),
    ])
}

fn default_moods() -> BTreeMap<String, String> {
    table(&[
        ("optimistic", "Adopt a hopeful, upbeat tone throughout."),
        ("gloomy", "Adopt a somber, pessimistic tone throughout."),
        ("sarcastic", "Lace the summary with dry sarcasm."),
        ("dramatic", "Heighten the stakes with dramatic phrasing."),
    ])
}

fn default_narrators() -> BTreeMap<String, String> {
    table(&[
        (
            "pirate",
            "Narrate as a seasoned pirate captain recounting the tale.",
        ),
        (
            "noir",
            "Narrate as a world-weary noir detective describing the case.",
        ),
        (
            "attenborough",
            "Narrate as a hushed wildlife documentarian observing the events.",
        ),
        (
            "shakespeare",
            "Narrate in Elizabethan verse as a court playwright.",
        ),
    ])
}

fn default_historical_perspectives() -> BTreeMap<String, String> {
    table(&[
        (
            "ancient-rome",
            "Frame the events as a dispatch read aloud in the Roman Senate.",
        ),
        (
            "1920s",
            "Frame the events as a wire report from a 1920s newsroom.",
        ),
        (
            "victorian",
            "Frame the events as a Victorian periodical would report them.",
        ),
    ])
}

fn default_cultural_contexts() -> BTreeMap<String, String> {
    table(&[
        (
            "global-south",
            "Foreground how the events land for readers in the global south.",
        ),
        (
            "rural",
            "Foreground the implications for rural communities.",
        ),
    ])
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn archive_host_matches_configured_hosts_and_subdomains() {
        let cfg = test_config();
        assert!(cfg.is_archive_host("archive.ph"));
        assert!(cfg.is_archive_host("Archive.PH"));
        assert!(cfg.is_archive_host("www.archive.today"));
        assert!(!cfg.is_archive_host("example.com"));
        assert!(!cfg.is_archive_host("notarchive.ph.example.com"));
    }

    pub(crate) fn test_config() -> Config {
        Config {
            llm_api_key: "test".to_string(),
            llm_base_url: "http://localhost".to_string(),
            summary_model: "gpt-4o-mini".to_string(),
            summarizer_mode: SummarizerMode::Completion,
            archive_hosts: vec![
                "archive.ph".to_string(),
                "archive.today".to_string(),
                "archive.is".to_string(),
            ],
            archive_text_host: "archive.ph".to_string(),
            max_summary_length: 1800,
            reading_wpm: 200,
            related_articles_limit: 3,
            auto_translate: false,
            target_language: "English".to_string(),
            bias_detection: false,
            context_provider: false,
            context_provider_prompt: "Give background.".to_string(),
            follow_up_tracker: true,
            fetch_timeout: Duration::from_secs(30),
            articles_file: "/tmp/gazette-articles-test.json".into(),
            home_channel_id: 0,
            styles: default_styles(),
            moods: default_moods(),
            narrators: default_narrators(),
            historical_perspectives: default_historical_perspectives(),
            cultural_contexts: default_cultural_contexts(),
        }
    }
}
