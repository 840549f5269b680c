//! Build orchestration.
//!
//! Regenerates the whole static site in one sequential pass.

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Instant,
};

use folio_core::Config;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{self, AssetError},
    pages::{PageAssembler, PageError},
    repository::RepositoryError,
    route::Route,
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Output could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Content root could not be read.
    #[error("content error: {0}")]
    Repository(#[from] RepositoryError),

    /// Page assembly error.
    #[error("page error: {0}")]
    Page(#[from] PageError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Number of HTML pages generated.
    pub pages: usize,

    /// Number of posts rendered.
    pub posts: usize,

    /// Number of books rendered.
    pub books: usize,

    /// Number of chapters rendered.
    pub chapters: usize,

    /// Number of static assets, post images, and EPUBs copied.
    pub assets: usize,

    /// Items skipped because they failed to load.
    pub skipped: usize,

    /// Every HTML file written, in generation order.
    pub generated: Vec<PathBuf>,

    /// Every file copied, in copy order.
    pub copied: Vec<PathBuf>,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    assembler: PageAssembler,
    output_dir: PathBuf,
    static_dir: Option<PathBuf>,
}

impl Builder {
    /// Create a new builder.
    #[must_use]
    pub fn new(assembler: PageAssembler, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            assembler,
            output_dir: output_dir.into(),
            static_dir: None,
        }
    }

    /// Create a builder with everything taken from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let assembler = PageAssembler::from_config(config)?;
        Ok(Self::new(assembler, config.output_dir()).with_static_dir(config.static_dir()))
    }

    /// Set the static assets directory.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Output directory the build writes to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(output = %self.output_dir.display(), "starting build");

        // 1. Clean output directory
        self.clean_output()?;

        // 2. Static assets
        if let Some(static_dir) = &self.static_dir {
            let copied = assets::copy_dir(static_dir, &self.output_dir.join("static"))?;
            stats.assets += copied.len();
            stats.copied.extend(copied);
        }

        // 3. Home page
        let home = self.assembler.render_home()?;
        self.write_page(&Route::Home, &home, &mut stats)?;

        // 4. Posts
        self.build_posts(&mut stats)?;

        // 5. Books and chapters
        self.build_books(&mut stats)?;

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            pages = stats.pages,
            posts = stats.posts,
            books = stats.books,
            chapters = stats.chapters,
            assets = stats.assets,
            skipped = stats.skipped,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Clean the output directory.
    fn clean_output(&self) -> Result<()> {
        if self.output_dir.exists() {
            debug!(dir = %self.output_dir.display(), "cleaning output directory");
            fs::remove_dir_all(&self.output_dir).map_err(|source| BuildError::Io {
                path: self.output_dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&self.output_dir).map_err(|source| BuildError::Io {
            path: self.output_dir.clone(),
            source,
        })?;
        Ok(())
    }

    fn build_posts(&self, stats: &mut BuildStats) -> Result<()> {
        let repository = self.assembler.repository();
        let posts = repository.list_posts()?;

        let list = self.assembler.render_posts(&posts)?;
        self.write_page(&Route::Posts, &list, stats)?;

        for post in &posts {
            let route = Route::Post {
                slug: post.slug.clone(),
            };
            let html = self.assembler.render_post(post)?;
            let path = self.write_page(&route, &html, stats)?;
            stats.posts += 1;

            if let Some(post_dir) = path.parent() {
                let images = repository.post_images_dir(&post.slug);
                let copied = assets::copy_dir(&images, &post_dir.join("images"))?;
                stats.assets += copied.len();
                stats.copied.extend(copied);
            }
        }

        Ok(())
    }

    fn build_books(&self, stats: &mut BuildStats) -> Result<()> {
        let repository = self.assembler.repository();
        let books = repository.list_books()?;

        let list = self.assembler.render_books(&books)?;
        self.write_page(&Route::Books, &list, stats)?;

        for book in &books {
            let route = Route::Book {
                slug: book.slug.clone(),
            };
            let html = self.assembler.render_book(book)?;
            self.write_page(&route, &html, stats)?;
            stats.books += 1;

            if let (Some(source), Some(file)) =
                (repository.epub_path(book), book.metadata.epub_file())
            {
                let dest = Route::Epub {
                    book: book.slug.clone(),
                    file: file.to_string(),
                }
                .output_path(&self.output_dir);

                match assets::copy_file(&source, &dest) {
                    Ok(()) => {
                        info!(path = %dest.display(), "copied epub");
                        stats.assets += 1;
                        stats.copied.push(dest);
                    }
                    Err(e) => warn!(book = %book.slug, error = %e, "failed to copy epub"),
                }
            }

            for info in &book.chapters {
                let chapter = match repository.load_chapter(book, &info.slug) {
                    Ok(chapter) => chapter,
                    Err(e) => {
                        warn!(
                            book = %book.slug,
                            chapter = %info.slug,
                            error = %e,
                            "skipping chapter"
                        );
                        stats.skipped += 1;
                        continue;
                    }
                };

                let route = Route::Chapter {
                    book: book.slug.clone(),
                    chapter: info.slug.clone(),
                };
                let html = self.assembler.render_chapter(&chapter)?;
                self.write_page(&route, &html, stats)?;
                stats.chapters += 1;
            }
        }

        Ok(())
    }

    /// Write one page to its output path, creating parent directories.
    fn write_page(&self, route: &Route, html: &str, stats: &mut BuildStats) -> Result<PathBuf> {
        let path = route.output_path(&self.output_dir);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, html).map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "generated");
        stats.pages += 1;
        stats.generated.push(path.clone());
        Ok(path)
    }
}
