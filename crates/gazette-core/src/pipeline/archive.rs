//! Archive-mirror link rewriting.
//!
//! Archive mirrors embed the original article URL in their path
//! (`https://archive.ph/<snapshot>/https://example.com/story`). The LLM's
//! browsing tool often cannot reach mirror pages, so these links are
//! rewritten to the mirror's plain-text endpoint and fetched directly.

use regex::Regex;
use url::Url;

/// Why a rewrite failed. The three malformed-input cases stay distinguishable
/// in diagnostics; shortlinks get their own user-facing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformErrorKind {
    /// The archive URL itself did not parse.
    UnparseableArchiveUrl,
    /// No `/http(s)://` marker anywhere in the archive URL's path.
    NoEmbeddedUrl,
    /// A marker was found but the candidate failed to validate as http(s).
    InvalidEmbeddedUrl,
    /// No marker, and the path is a single opaque segment (an archive
    /// shortlink such as `archive.ph/o7Qnd`).
    Shortlink,
}

#[derive(Clone, Debug)]
pub struct TransformError {
    pub kind: TransformErrorKind,
    pub detail: String,
}

impl TransformError {
    pub fn is_shortlink(&self) -> bool {
        self.kind == TransformErrorKind::Shortlink
    }

    pub fn user_message(&self) -> String {
        match self.kind {
            TransformErrorKind::UnparseableArchiveUrl => {
                "That archive link does not look like a valid URL.".to_string()
            }
            TransformErrorKind::NoEmbeddedUrl => {
                "I could not find the original article URL inside that archive link.".to_string()
            }
            TransformErrorKind::InvalidEmbeddedUrl => {
                "The original URL embedded in that archive link is not valid.".to_string()
            }
            TransformErrorKind::Shortlink => {
                "That archive link is a shortlink; please share the expanded archive URL \
                 that contains the original article address."
                    .to_string()
            }
        }
    }
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TransformErrorKind::UnparseableArchiveUrl => {
                write!(f, "could not parse archive URL: {}", self.detail)
            }
            TransformErrorKind::NoEmbeddedUrl => {
                write!(f, "Could not find an embedded URL in: {}", self.detail)
            }
            TransformErrorKind::InvalidEmbeddedUrl => {
                write!(f, "embedded URL failed to validate: {}", self.detail)
            }
            TransformErrorKind::Shortlink => {
                write!(f, "archive shortlink carries no embedded URL: {}", self.detail)
            }
        }
    }
}

/// Host of a URL, if it parses at all. Used to decide whether a shared link
/// points at an archive mirror in the first place.
pub fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Rewrite an archive-mirror URL to the mirror's plain-text endpoint:
/// `https://<text_host>/TEXT/<original-url>`.
///
/// The embedded original is located by the earliest `/http://`-style marker
/// (single-slash artifacts like `/https:/example.com` are accepted and
/// repaired), re-validated, and reconstructed canonically with its query
/// string and fragment preserved.
pub fn transform(raw: &str, text_host: &str) -> Result<String, TransformError> {
    let outer = Url::parse(raw).map_err(|e| TransformError {
        kind: TransformErrorKind::UnparseableArchiveUrl,
        detail: format!("{raw}: {e}"),
    })?;

    // Work on the raw tail (path + query + fragment) rather than the parsed
    // path so the embedded URL's own query and fragment stay attached.
    let tail = raw_tail(raw);

    let marker = Regex::new(r"(?i)/https?:/").expect("valid regex");
    let Some(m) = marker.find(tail) else {
        return Err(no_marker_error(&outer, raw));
    };

    let candidate = repair_single_slash(&tail[m.start() + 1..]);

    let embedded = Url::parse(&candidate).map_err(|e| TransformError {
        kind: TransformErrorKind::InvalidEmbeddedUrl,
        detail: format!("{candidate}: {e}"),
    })?;

    if !matches!(embedded.scheme(), "http" | "https") || embedded.host_str().is_none() {
        return Err(TransformError {
            kind: TransformErrorKind::InvalidEmbeddedUrl,
            detail: format!("{candidate}: not an http(s) URL with a hostname"),
        });
    }

    Ok(format!("https://{text_host}/TEXT/{embedded}"))
}

/// Everything from the first path slash onward, out of the raw string.
fn raw_tail(raw: &str) -> &str {
    let after_scheme = raw.find("://").map(|i| i + 3).unwrap_or(0);
    match raw[after_scheme..].find('/') {
        Some(i) => &raw[after_scheme + i..],
        None => "",
    }
}

/// Repair `http:/x` and `https:/x` artifacts left by path normalization.
fn repair_single_slash(candidate: &str) -> String {
    let re = Regex::new(r"(?i)^(https?):/([^/])").expect("valid regex");
    re.replace(candidate, "$1://$2").into_owned()
}

fn no_marker_error(outer: &Url, raw: &str) -> TransformError {
    let segments: Vec<&str> = outer
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() == 1 && !segments[0].contains('.') {
        return TransformError {
            kind: TransformErrorKind::Shortlink,
            detail: raw.to_string(),
        };
    }

    TransformError {
        kind: TransformErrorKind::NoEmbeddedUrl,
        detail: raw.to_string(),
    }
}
