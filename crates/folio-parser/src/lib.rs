//! Folio Parser Library
//!
//! Markdown to HTML rendering with syntax-highlighted code blocks.

pub mod markdown;
pub mod syntax;

pub use markdown::MarkdownRenderer;
pub use syntax::SyntaxHighlighter;
use thiserror::Error;

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Markdown conversion error.
    #[error("markdown error: {0}")]
    Markdown(#[from] markdown::MarkdownError),

    /// Highlighter setup error.
    #[error("syntax error: {0}")]
    Syntax(#[from] syntax::SyntaxError),
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
