//! Content repository.
//!
//! Discovers posts and books on disk and loads them into the content model.
//! The on-disk layout is:
//!
//! ```text
//! posts/{slug}/metadata.yaml
//! posts/{slug}/index.md
//! posts/{slug}/images/            (optional)
//! books/{slug}/metadata.yaml
//! books/{slug}/chapters.yaml
//! books/{slug}/chapters/{chapter}.xhtml
//! books/{slug}/snippet.html       (optional)
//! books/{slug}/intro.html         (optional)
//! books/{slug}/{epub_file}        (optional)
//! ```
//!
//! Nothing is cached; every call reads the filesystem again.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use folio_core::{Book, Chapter, Config, CoreError, Post, metadata};
use folio_parser::MarkdownRenderer;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Content repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A slug, chapter-list entry, or required file does not exist.
    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    /// Structured metadata or markdown could not be converted.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Any other I/O failure while reading content.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A content root could not be enumerated.
    #[error("cannot read content root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RepositoryError {
    /// Whether this error means the requested content does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    fn read(what: &'static str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::not_found(what, path)
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

impl From<CoreError> for RepositoryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Metadata { path, message } => Self::Parse { path, message },
            other => Self::Parse {
                path: PathBuf::new(),
                message: other.to_string(),
            },
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Reject slugs that could escape their content root.
pub fn validate_slug(slug: &str, what: &'static str) -> Result<()> {
    let invalid = slug.is_empty()
        || slug == "."
        || slug == ".."
        || slug.contains(['/', '\\'])
        || slug.contains('\0');

    if invalid {
        return Err(RepositoryError::not_found(what, slug));
    }
    Ok(())
}

/// Filesystem-backed content repository.
///
/// Cheap to clone; the markdown renderer is shared.
#[derive(Debug, Clone)]
pub struct Repository {
    posts_root: PathBuf,
    books_root: PathBuf,
    title_page: PathBuf,
    markdown: Arc<MarkdownRenderer>,
}

impl Repository {
    /// Create a repository over explicit roots.
    pub fn new(
        posts_root: impl Into<PathBuf>,
        books_root: impl Into<PathBuf>,
        title_page: impl Into<PathBuf>,
        markdown: Arc<MarkdownRenderer>,
    ) -> Self {
        Self {
            posts_root: posts_root.into(),
            books_root: books_root.into(),
            title_page: title_page.into(),
            markdown,
        }
    }

    /// Create a repository over the roots named in `config`.
    pub fn from_config(config: &Config, markdown: Arc<MarkdownRenderer>) -> Self {
        Self::new(
            config.posts_dir(),
            config.books_dir(),
            config.title_page(),
            markdown,
        )
    }

    /// Root directory holding one directory per post.
    #[must_use]
    pub fn posts_root(&self) -> &Path {
        &self.posts_root
    }

    /// Root directory holding one directory per book.
    #[must_use]
    pub fn books_root(&self) -> &Path {
        &self.books_root
    }

    /// All loadable posts, newest first.
    ///
    /// Posts that fail to load are logged and skipped. Posts sharing a date
    /// keep their directory order; undated posts come last.
    pub fn list_posts(&self) -> Result<Vec<Post>> {
        let slugs = list_dirs(&self.posts_root)?;
        let mut posts = Vec::with_capacity(slugs.len());

        for slug in slugs {
            match self.load_post(&slug) {
                Ok(post) => posts.push(post),
                Err(e) => warn!(slug = %slug, error = %e, "skipping post"),
            }
        }

        posts.sort_by(|a, b| b.metadata.date.cmp(&a.metadata.date));

        info!(count = posts.len(), "listed posts");
        Ok(posts)
    }

    /// Load one post by directory name.
    pub fn load_post(&self, slug: &str) -> Result<Post> {
        validate_slug(slug, "post")?;
        let dir = self.posts_root.join(slug);
        if !dir.is_dir() {
            return Err(RepositoryError::not_found("post", dir));
        }

        let meta_path = dir.join("metadata.yaml");
        let meta_text = read_text("post metadata", &meta_path)?;
        let metadata = metadata::parse_post_metadata(&meta_text, &meta_path)?;

        let content_path = dir.join("index.md");
        let bytes = read_bytes("post content", &content_path)?;
        let content = self
            .markdown
            .render_bytes(&bytes, &content_path)
            .map_err(|e| RepositoryError::parse(&content_path, e.to_string()))?;

        debug!(slug, "loaded post");
        Ok(Post {
            metadata,
            content,
            slug: slug.to_string(),
        })
    }

    /// Directory of images belonging to a post.
    #[must_use]
    pub fn post_images_dir(&self, slug: &str) -> PathBuf {
        self.posts_root.join(slug).join("images")
    }

    /// All loadable books in directory order.
    ///
    /// Books that fail to load are logged and skipped.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let slugs = list_dirs(&self.books_root)?;
        let mut books = Vec::with_capacity(slugs.len());

        for slug in slugs {
            match self.load_book(&slug) {
                Ok(book) => books.push(book),
                Err(e) => warn!(slug = %slug, error = %e, "skipping book"),
            }
        }

        info!(count = books.len(), "listed books");
        Ok(books)
    }

    /// Load one book by directory name, including its declared chapter order.
    pub fn load_book(&self, slug: &str) -> Result<Book> {
        validate_slug(slug, "book")?;
        let dir = self.books_root.join(slug);
        if !dir.is_dir() {
            return Err(RepositoryError::not_found("book", dir));
        }

        let meta_path = dir.join("metadata.yaml");
        let meta_text = read_text("book metadata", &meta_path)?;
        let metadata = metadata::parse_book_metadata(&meta_text, &meta_path)?;

        let list_path = dir.join("chapters.yaml");
        let list_text = read_text("chapter list", &list_path)?;
        let chapters = metadata::parse_chapter_list(&list_text, &list_path)?;

        debug!(slug, chapters = chapters.len(), "loaded book");
        Ok(Book {
            metadata,
            slug: slug.to_string(),
            chapters,
            snippet: read_optional(&dir.join("snippet.html")),
            intro: read_optional(&dir.join("intro.html")),
        })
    }

    /// Load a chapter of `book`.
    ///
    /// The chapter must appear in the book's chapter list; a file on disk
    /// alone is not enough.
    pub fn load_chapter(&self, book: &Book, chapter_slug: &str) -> Result<Chapter> {
        let path = self.chapter_path(&book.slug, chapter_slug);

        let index = book
            .chapter_index(chapter_slug)
            .ok_or_else(|| RepositoryError::not_found("chapter", &path))?;
        validate_slug(chapter_slug, "chapter")?;

        // Chapter bodies are passed through as-is; bytes that are not UTF-8
        // are replaced rather than rejected.
        let bytes = read_bytes("chapter", &path)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let (prev, next) = book.neighbors(index);
        Ok(Chapter {
            title: book.chapters[index].title.clone(),
            content,
            book_slug: book.slug.clone(),
            book_title: book.metadata.title.clone(),
            slug: chapter_slug.to_string(),
            prev: prev.cloned(),
            next: next.cloned(),
        })
    }

    fn chapter_path(&self, book_slug: &str, chapter_slug: &str) -> PathBuf {
        self.books_root
            .join(book_slug)
            .join("chapters")
            .join(format!("{chapter_slug}.xhtml"))
    }

    /// Location of the book's declared EPUB, if it declares one.
    #[must_use]
    pub fn epub_path(&self, book: &Book) -> Option<PathBuf> {
        let file = book.metadata.epub_file()?;
        validate_slug(file, "epub").ok()?;
        Some(self.books_root.join(&book.slug).join(file))
    }

    /// Raw bytes of the book's declared EPUB.
    pub fn load_epub(&self, book: &Book) -> Result<Vec<u8>> {
        let path = self
            .epub_path(book)
            .ok_or_else(|| RepositoryError::not_found("epub", self.books_root.join(&book.slug)))?;
        read_bytes("epub", &path)
    }

    /// Render the title-page markdown.
    pub fn load_home(&self) -> Result<String> {
        let bytes = read_bytes("title page", &self.title_page)?;
        self.markdown
            .render_bytes(&bytes, &self.title_page)
            .map_err(|e| RepositoryError::parse(&self.title_page, e.to_string()))
    }
}

/// Names of the visible subdirectories of `root`, sorted.
fn list_dirs(root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(root).map_err(|source| RepositoryError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RepositoryError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!(path = %path.display(), "skipping non UTF-8 directory name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

fn read_bytes(what: &'static str, path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| RepositoryError::read(what, path, e))
}

fn read_text(what: &'static str, path: &Path) -> Result<String> {
    let bytes = read_bytes(what, path)?;
    String::from_utf8(bytes).map_err(|e| RepositoryError::parse(path, e.to_string()))
}

/// Contents of an optional HTML fragment; empty when absent or unreadable.
fn read_optional(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable fragment");
            String::new()
        }
    }
}
