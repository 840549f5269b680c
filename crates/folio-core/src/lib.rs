//! Folio Core Library
//!
//! Content model, metadata parsing, configuration, and error handling for the
//! folio site builder.

pub mod config;
pub mod content;
pub mod error;
pub mod metadata;

pub use config::Config;
pub use content::{Book, BookMetadata, Chapter, ChapterInfo, Post, PostMetadata};
pub use error::{CoreError, Result};
