//! Content types: posts, books, and chapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::deserialize_date;

/// Metadata for a blog post, read from `metadata.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
    /// Post title.
    #[serde(default)]
    pub title: String,

    /// Publication date. Posts without one sort after all dated posts.
    #[serde(default, deserialize_with = "deserialize_date")]
    pub date: Option<DateTime<Utc>>,

    /// Short summary for listings.
    #[serde(default)]
    pub description: String,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A blog post: metadata plus rendered markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub metadata: PostMetadata,

    /// HTML fragment rendered from `index.md`.
    pub content: String,

    /// Directory name of the post; also its URL segment.
    pub slug: String,
}

/// Metadata for a book, read from `metadata.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub translator: String,
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub illustrator: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: String,

    /// File name of the downloadable EPUB inside the book directory.
    #[serde(default)]
    pub epub_file: Option<String>,
}

impl BookMetadata {
    /// The declared EPUB file name, if any. An empty value counts as absent.
    #[must_use]
    pub fn epub_file(&self) -> Option<&str> {
        self.epub_file.as_deref().filter(|name| !name.is_empty())
    }
}

/// One entry of a book's declared chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub slug: String,
    pub title: String,
}

/// Shape of `chapters.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChapterList {
    #[serde(default)]
    pub chapters: Vec<ChapterInfo>,
}

/// A book with its ordered chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub metadata: BookMetadata,

    /// Directory name of the book; also its URL segment.
    pub slug: String,

    /// Declared chapter order. Authoritative for chapter existence and adjacency.
    pub chapters: Vec<ChapterInfo>,

    /// Short HTML blurb for the books list. Empty when `snippet.html` is absent.
    pub snippet: String,

    /// Longer HTML introduction for the book page. Empty when `intro.html` is absent.
    pub intro: String,
}

impl Book {
    /// Position of `slug` in the declared chapter list.
    #[must_use]
    pub fn chapter_index(&self, slug: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.slug == slug)
    }

    /// Previous and next chapters around `index`.
    #[must_use]
    pub fn neighbors(&self, index: usize) -> (Option<&ChapterInfo>, Option<&ChapterInfo>) {
        let prev = index.checked_sub(1).and_then(|i| self.chapters.get(i));
        let next = self.chapters.get(index + 1);
        (prev, next)
    }
}

/// A chapter rendered on demand from a book and a chapter slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,

    /// Raw XHTML body of the chapter.
    pub content: String,

    pub book_slug: String,
    pub book_title: String,
    pub slug: String,

    pub prev: Option<ChapterInfo>,
    pub next: Option<ChapterInfo>,
}
