//! Raw connector output to stored articles, deduplicated by fingerprint.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use vantage_core::RawArticle;
use vantage_db::{DbError, NewArticle};

use crate::store::PipelineStore;

pub const MAX_CONTENT_CHARS: usize = 10_000;
pub const MAX_SUMMARY_CHARS: usize = 2_000;
const TRUNCATION_MARKER: &str = "...";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

/// Hex SHA-256 of `lower(trim(title)) + "|" + lower(trim(url))`.
#[must_use]
pub fn fingerprint(title: &str, url: &str) -> String {
    let key = format!(
        "{}|{}",
        title.trim().to_lowercase(),
        url.trim().to_lowercase()
    );
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Remove tags, unescape the common entities and collapse whitespace.
#[must_use]
pub fn strip_markup(html: &str) -> String {
    let without_tags = TAG_RE.replace_all(html, " ");
    let unescaped = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    WHITESPACE_RE.replace_all(&unescaped, " ").trim().to_string()
}

/// Keep the first `max_chars` characters, appending `...` when anything was cut.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
    }
}

/// Clean and bound one raw article. The fingerprint is taken from the raw
/// title and URL so cleaning never changes identity.
#[must_use]
pub fn prepare_article(raw: &RawArticle) -> NewArticle {
    NewArticle {
        source_id: raw.source_id,
        external_id: raw.external_id.clone(),
        title: raw.title.trim().to_string(),
        url: raw.url.clone(),
        content: truncate_chars(&strip_markup(&raw.content), MAX_CONTENT_CHARS),
        summary: raw
            .summary
            .as_deref()
            .map(strip_markup)
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(&s, MAX_SUMMARY_CHARS)),
        author: raw.author.clone(),
        published_at: raw.published_at,
        categories: raw.categories.clone(),
        metadata: raw.metadata.clone(),
        content_hash: fingerprint(&raw.title, &raw.url),
    }
}

/// Store every article whose fingerprint is new.
///
/// Safe to call repeatedly with overlapping batches: an existing fingerprint,
/// or one that wins a concurrent insert race, counts as skipped.
///
/// # Errors
///
/// Returns [`DbError`] if a lookup or insert fails.
pub async fn normalize_and_store(
    store: &dyn PipelineStore,
    raw_articles: &[RawArticle],
) -> Result<NormalizeOutcome, DbError> {
    let mut outcome = NormalizeOutcome::default();

    for raw in raw_articles {
        let content_hash = fingerprint(&raw.title, &raw.url);
        if store.article_exists_by_hash(&content_hash).await? {
            outcome.skipped += 1;
            continue;
        }

        if store.insert_article(&prepare_article(raw)).await? {
            outcome.inserted += 1;
        } else {
            outcome.skipped += 1;
        }
    }

    Ok(outcome)
}
