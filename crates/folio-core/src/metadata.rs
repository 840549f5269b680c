//! YAML metadata parsing for posts, books, and chapter lists.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};

use crate::{
    content::{BookMetadata, ChapterInfo, ChapterList, PostMetadata},
    error::{CoreError, Result},
};

/// Deserialize a YAML document, attributing failures to `path`.
///
/// An empty document is treated as an empty mapping so that files holding
/// only defaults still load.
pub fn from_yaml<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T> {
    let text = if text.trim().is_empty() { "{}" } else { text };
    serde_yaml::from_str(text).map_err(|e| CoreError::metadata(path, e.to_string()))
}

/// Parse a post's `metadata.yaml`.
pub fn parse_post_metadata(text: &str, path: &Path) -> Result<PostMetadata> {
    from_yaml(text, path)
}

/// Parse a book's `metadata.yaml`.
pub fn parse_book_metadata(text: &str, path: &Path) -> Result<BookMetadata> {
    from_yaml(text, path)
}

/// Parse a book's `chapters.yaml` into its declared chapter order.
pub fn parse_chapter_list(text: &str, path: &Path) -> Result<Vec<ChapterInfo>> {
    let list: ChapterList = from_yaml(text, path)?;
    Ok(list.chapters)
}

/// Parse a date in one of the accepted layouts.
///
/// Accepts RFC 3339 (`2024-01-14T10:00:00Z`), a naive timestamp
/// (`2024-01-14 10:00:00` or `2024-01-14T10:00:00`, read as UTC), or a bare
/// date (`2024-01-14`, midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for optional dates in any layout `parse_date` accepts.
pub fn deserialize_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid date `{s}`"))),
    }
}
