//! Page assembly.
//!
//! Gathers content through the [`Repository`], fills a template context for
//! the page type, and wraps the result in the `base` template. Both the
//! static build and the HTTP server go through [`PageAssembler`].

use std::sync::Arc;

use chrono::{Datelike, Utc};
use folio_core::{Book, Chapter, ChapterInfo, Config, Post, config::SiteConfig};
use folio_parser::{MarkdownRenderer, ParserError, html_escape};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    repository::{Repository, RepositoryError},
    route::Route,
    template::{TemplateContext, TemplateError, TemplateRegistry},
};

/// Page assembly errors.
#[derive(Debug, Error)]
pub enum PageError {
    /// Content could not be loaded.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Template rendering failed.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Markdown renderer could not be configured.
    #[error("markdown setup error: {0}")]
    Parser(#[from] ParserError),
}

impl PageError {
    /// Whether the request should be answered with "not found".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repository(e) if e.is_not_found())
    }
}

/// Result type for page assembly.
pub type Result<T> = std::result::Result<T, PageError>;

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// A complete HTML document.
    Html(String),

    /// A binary file served as an attachment.
    Download {
        file_name: String,
        content_type: &'static str,
        bytes: Vec<u8>,
    },
}

/// Media type for EPUB downloads.
pub const EPUB_CONTENT_TYPE: &str = "application/epub+zip";

/// Builds HTML pages from repository content and templates.
#[derive(Debug, Clone)]
pub struct PageAssembler {
    repository: Repository,
    templates: Arc<TemplateRegistry>,
    site: SiteConfig,
}

impl PageAssembler {
    /// Create an assembler from already-initialized parts.
    pub fn new(repository: Repository, templates: TemplateRegistry, site: SiteConfig) -> Self {
        Self {
            repository,
            templates: Arc::new(templates),
            site,
        }
    }

    /// Initialize the markdown renderer, template set, and repository from
    /// configuration. Fails on a bad syntax theme or a malformed template.
    pub fn from_config(config: &Config) -> Result<Self> {
        let markdown = Arc::new(MarkdownRenderer::from_config(&config.markdown)?);
        let templates = TemplateRegistry::load_dir(&config.templates_dir())?;
        let repository = Repository::from_config(config, markdown);

        Ok(Self::new(repository, templates, config.site.clone()))
    }

    /// The content repository pages are assembled from.
    #[must_use]
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Load and render whatever `route` addresses.
    pub fn resolve(&self, route: &Route) -> Result<Page> {
        debug!(%route, "resolving");
        let html = match route {
            Route::Home => self.render_home()?,
            Route::Posts => self.render_posts(&self.repository.list_posts()?)?,
            Route::Post { slug } => self.render_post(&self.repository.load_post(slug)?)?,
            Route::Books => self.render_books(&self.repository.list_books()?)?,
            Route::Book { slug } => self.render_book(&self.repository.load_book(slug)?)?,
            Route::Chapter { book, chapter } => {
                let book = self.repository.load_book(book)?;
                self.render_chapter(&self.repository.load_chapter(&book, chapter)?)?
            }
            Route::Epub { book, file } => {
                let book = self.repository.load_book(book)?;
                if book.metadata.epub_file() != Some(file.as_str()) {
                    // Not the declared download, so it can only be a chapter.
                    let chapter = self.repository.load_chapter(&book, file)?;
                    return Ok(Page::Html(self.render_chapter(&chapter)?));
                }
                return Ok(Page::Download {
                    file_name: file.clone(),
                    content_type: EPUB_CONTENT_TYPE,
                    bytes: self.repository.load_epub(&book)?,
                });
            }
        };
        Ok(Page::Html(html))
    }

    /// Home page from the title-page markdown, or the configured fallback.
    pub fn render_home(&self) -> Result<String> {
        let content = match self.repository.load_home() {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "title page unavailable, using fallback");
                self.site.fallback_home.clone()
            }
        };

        let ctx = TemplateContext::new().with_var("content", content);
        self.wrap("home", &ctx, &self.site.title, None)
    }

    /// Posts list page.
    pub fn render_posts(&self, posts: &[Post]) -> Result<String> {
        let items = posts.iter().map(post_item_html).collect::<Vec<_>>().join("\n");
        let ctx = TemplateContext::new()
            .with_var("title", "Blog Posts")
            .with_var("items", items);
        self.wrap("posts", &ctx, "Blog Posts", None)
    }

    /// Single post page.
    pub fn render_post(&self, post: &Post) -> Result<String> {
        let meta = &post.metadata;
        let mut ctx = TemplateContext::new()
            .with_var("title", html_escape(&meta.title))
            .with_var("content", &post.content)
            .with_var("slug", html_escape(&post.slug));

        if let Some(date) = meta.date {
            ctx.insert(
                "date_html",
                format!(
                    r#"<time datetime="{}">{}</time>"#,
                    date.format("%Y-%m-%d"),
                    date.format("%B %d, %Y")
                ),
            );
        }

        if !meta.tags.is_empty() {
            let tags = meta
                .tags
                .iter()
                .map(|tag| format!(r#"<span class="tag">{}</span>"#, html_escape(tag)))
                .collect::<Vec<_>>()
                .join(" ");
            ctx.insert("tags_html", format!(r#"<div class="tags">{tags}</div>"#));
        }

        let description = (!meta.description.is_empty()).then_some(meta.description.as_str());
        self.wrap("post", &ctx, &meta.title, description)
    }

    /// Books list page.
    pub fn render_books(&self, books: &[Book]) -> Result<String> {
        let items = books.iter().map(book_card_html).collect::<Vec<_>>().join("\n");
        let ctx = TemplateContext::new()
            .with_var("title", "Books")
            .with_var("items", items);
        self.wrap("books", &ctx, "Books", None)
    }

    /// Book table of contents.
    pub fn render_book(&self, book: &Book) -> Result<String> {
        let meta = &book.metadata;
        let chapters = book
            .chapters
            .iter()
            .map(|info| {
                format!(
                    r#"<li><a href="{}">{}</a></li>"#,
                    chapter_route(&book.slug, info).url(),
                    html_escape(&info.title)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut ctx = TemplateContext::new()
            .with_var("title", html_escape(&meta.title))
            .with_var("slug", html_escape(&book.slug))
            .with_var("intro", &book.intro)
            .with_var("snippet", &book.snippet)
            .with_var("chapters", chapters);

        if !meta.subtitle.is_empty() {
            ctx.insert(
                "subtitle_html",
                format!(r#"<p class="subtitle">{}</p>"#, html_escape(&meta.subtitle)),
            );
        }

        let byline = byline(book);
        if !byline.is_empty() {
            ctx.insert("byline_html", format!(r#"<p class="byline">{byline}</p>"#));
        }

        if let Some(file) = meta.epub_file() {
            let route = Route::Epub {
                book: book.slug.clone(),
                file: file.to_string(),
            };
            ctx.insert(
                "epub_html",
                format!(
                    r#"<p class="download"><a href="{}" download>Download EPUB</a></p>"#,
                    route.url()
                ),
            );
        }

        let description = (!meta.description.is_empty()).then_some(meta.description.as_str());
        self.wrap("book", &ctx, &meta.title, description)
    }

    /// Single chapter page with previous/next navigation.
    pub fn render_chapter(&self, chapter: &Chapter) -> Result<String> {
        let book_route = Route::Book {
            slug: chapter.book_slug.clone(),
        };
        let mut ctx = TemplateContext::new()
            .with_var("title", html_escape(&chapter.title))
            .with_var("content", &chapter.content)
            .with_var("book_title", html_escape(&chapter.book_title))
            .with_var("book_url", book_route.url());

        if let Some(prev) = &chapter.prev {
            ctx.insert(
                "prev_html",
                format!(
                    r#"<a href="{}" rel="prev">&larr; {}</a>"#,
                    chapter_route(&chapter.book_slug, prev).url(),
                    html_escape(&prev.title)
                ),
            );
        }
        if let Some(next) = &chapter.next {
            ctx.insert(
                "next_html",
                format!(
                    r#"<a href="{}" rel="next">{} &rarr;</a>"#,
                    chapter_route(&chapter.book_slug, next).url(),
                    html_escape(&next.title)
                ),
            );
        }

        let title = format!("{} - {}", chapter.title, chapter.book_title);
        self.wrap("chapter", &ctx, &title, None)
    }

    /// Render `template`, then place the result inside `base`.
    fn wrap(
        &self,
        template: &str,
        ctx: &TemplateContext,
        title: &str,
        description: Option<&str>,
    ) -> Result<String> {
        let inner = self.templates.render(template, ctx)?;

        let mut base = TemplateContext::new()
            .with_var("title", html_escape(title))
            .with_var("site_title", html_escape(&self.site.title))
            .with_var("content", inner)
            .with_var("year", Utc::now().year().to_string());

        if let Some(desc) = description.or(self.site.description.as_deref()) {
            base.insert("description", html_escape(desc));
        }
        if let Some(author) = &self.site.author {
            base.insert("author", html_escape(author));
        }

        Ok(self.templates.render("base", &base)?)
    }
}

fn chapter_route(book_slug: &str, info: &ChapterInfo) -> Route {
    Route::Chapter {
        book: book_slug.to_string(),
        chapter: info.slug.clone(),
    }
}

/// One `<li>` in the posts list.
fn post_item_html(post: &Post) -> String {
    let route = Route::Post {
        slug: post.slug.clone(),
    };
    let date = post
        .metadata
        .date
        .map(|d| {
            format!(
                r#" <time datetime="{}">{}</time>"#,
                d.format("%Y-%m-%d"),
                d.format("%b %d, %Y")
            )
        })
        .unwrap_or_default();
    let description = if post.metadata.description.is_empty() {
        String::new()
    } else {
        format!(
            r#"<p class="summary">{}</p>"#,
            html_escape(&post.metadata.description)
        )
    };

    format!(
        r#"<li><a href="{}">{}</a>{date}{description}</li>"#,
        route.url(),
        html_escape(&post.metadata.title)
    )
}

/// One card in the books grid.
fn book_card_html(book: &Book) -> String {
    let route = Route::Book {
        slug: book.slug.clone(),
    };
    let byline = byline(book);
    let byline = if byline.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="byline">{byline}</p>"#)
    };

    format!(
        r#"<div class="book-card"><h2><a href="{}">{}</a></h2>{byline}{}</div>"#,
        route.url(),
        html_escape(&book.metadata.title),
        book.snippet
    )
}

/// Escaped credit line such as "Author, translated by X (1921)".
fn byline(book: &Book) -> String {
    let meta = &book.metadata;
    let mut parts = Vec::new();

    if !meta.author.is_empty() {
        parts.push(html_escape(&meta.author));
    }
    for (role, name) in [
        ("translated by", &meta.translator),
        ("edited by", &meta.editor),
        ("illustrated by", &meta.illustrator),
    ] {
        if !name.is_empty() {
            parts.push(format!("{role} {}", html_escape(name)));
        }
    }

    let mut line = parts.join(", ");
    if let Some(year) = meta.year {
        if line.is_empty() {
            line = year.to_string();
        } else {
            line.push_str(&format!(" ({year})"));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use folio_core::{BookMetadata, PostMetadata, metadata::parse_date};
    use tempfile::TempDir;

    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn assembler(dir: &TempDir) -> PageAssembler {
        let root = dir.path();
        fs::create_dir_all(root.join("posts")).unwrap();
        fs::create_dir_all(root.join("books")).unwrap();
        let repository = Repository::new(
            root.join("posts"),
            root.join("books"),
            root.join("title-page/index.md"),
            Arc::new(MarkdownRenderer::new()),
        );
        let site = SiteConfig {
            title: "Test <Site>".to_string(),
            ..SiteConfig::default()
        };
        PageAssembler::new(repository, TemplateRegistry::new(), site)
    }

    fn book() -> Book {
        Book {
            metadata: BookMetadata {
                title: "On Things".to_string(),
                author: "A. Writer".to_string(),
                translator: "T. Lator".to_string(),
                year: Some(1921),
                epub_file: Some("things.epub".to_string()),
                ..BookMetadata::default()
            },
            slug: "things".to_string(),
            chapters: vec![
                ChapterInfo {
                    slug: "one".to_string(),
                    title: "One".to_string(),
                },
                ChapterInfo {
                    slug: "two".to_string(),
                    title: "Two".to_string(),
                },
            ],
            snippet: "<p>snip</p>".to_string(),
            intro: "<p>intro</p>".to_string(),
        }
    }

    #[test]
    fn test_home_fallback() {
        let dir = TempDir::new().unwrap();
        let html = assembler(&dir).render_home().unwrap();

        assert!(html.contains("<p>Welcome to my blog!</p>"));
        assert!(html.contains("<title>Test &lt;Site&gt;</title>"));
    }

    #[test]
    fn test_home_from_title_page() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("title-page/index.md"), "Hello **there**");

        let html = assembler(&dir).render_home().unwrap();
        assert!(html.contains("<strong>there</strong>"));
        assert!(!html.contains("Welcome to my blog!"));
    }

    #[test]
    fn test_render_post_escapes_metadata() {
        let dir = TempDir::new().unwrap();
        let post = Post {
            metadata: PostMetadata {
                title: "Fish & <Chips>".to_string(),
                date: parse_date("2024-06-01"),
                tags: vec!["food".to_string()],
                ..PostMetadata::default()
            },
            content: "<p>body</p>".to_string(),
            slug: "fish".to_string(),
        };

        let html = assembler(&dir).render_post(&post).unwrap();
        assert!(html.contains("<h1>Fish &amp; &lt;Chips&gt;</h1>"));
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains(r#"<time datetime="2024-06-01">June 01, 2024</time>"#));
        assert!(html.contains(r#"<span class="tag">food</span>"#));
    }

    #[test]
    fn test_render_posts_list_links() {
        let dir = TempDir::new().unwrap();
        let posts = vec![Post {
            metadata: PostMetadata {
                title: "Hi".to_string(),
                ..PostMetadata::default()
            },
            content: String::new(),
            slug: "hi".to_string(),
        }];

        let html = assembler(&dir).render_posts(&posts).unwrap();
        assert!(html.contains(r#"<a href="/post/hi/">Hi</a>"#));
        assert!(html.contains("<title>Blog Posts</title>"));
    }

    #[test]
    fn test_render_book_toc() {
        let dir = TempDir::new().unwrap();
        let html = assembler(&dir).render_book(&book()).unwrap();

        assert!(html.contains(r#"<li><a href="/book/things/one">One</a></li>"#));
        assert!(html.contains(r#"href="/book/things/things.epub""#));
        assert!(html.contains("A. Writer, translated by T. Lator (1921)"));
        assert!(html.contains("<p>intro</p>"));
    }

    #[test]
    fn test_render_books_grid() {
        let dir = TempDir::new().unwrap();
        let html = assembler(&dir).render_books(&[book()]).unwrap();

        assert!(html.contains(r#"<a href="/book/things/">On Things</a>"#));
        assert!(html.contains("<p>snip</p>"));
    }

    #[test]
    fn test_render_chapter_navigation() {
        let dir = TempDir::new().unwrap();
        let chapter = Chapter {
            title: "Two".to_string(),
            content: "<p>second</p>".to_string(),
            book_slug: "things".to_string(),
            book_title: "On Things".to_string(),
            slug: "two".to_string(),
            prev: Some(ChapterInfo {
                slug: "one".to_string(),
                title: "One".to_string(),
            }),
            next: None,
        };

        let html = assembler(&dir).render_chapter(&chapter).unwrap();
        assert!(html.contains("<title>Two - On Things</title>"));
        assert!(html.contains(r#"<a href="/book/things/one" rel="prev">"#));
        assert!(!html.contains(r#"rel="next""#));
        assert!(html.contains(r#"<a href="/book/things/">On Things</a>"#));
    }

    #[test]
    fn test_resolve_not_found() {
        let dir = TempDir::new().unwrap();
        let assembler = assembler(&dir);

        let err = assembler
            .resolve(&Route::Post {
                slug: "does-not-exist".to_string(),
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_resolve_epub_and_fallback_to_chapter() {
        let dir = TempDir::new().unwrap();
        let books = dir.path().join("books/things");
        write(&books.join("metadata.yaml"), "title: T\nepub_file: t.epub\n");
        write(
            &books.join("chapters.yaml"),
            "chapters:\n  - slug: x.epub\n    title: Odd\n",
        );
        write(&books.join("chapters/x.epub.xhtml"), "<p>odd</p>");
        write(&books.join("t.epub"), "EPUB");
        let assembler = assembler(&dir);

        let page = assembler
            .resolve(&Route::Epub {
                book: "things".to_string(),
                file: "t.epub".to_string(),
            })
            .unwrap();
        assert_eq!(
            page,
            Page::Download {
                file_name: "t.epub".to_string(),
                content_type: EPUB_CONTENT_TYPE,
                bytes: b"EPUB".to_vec(),
            }
        );

        let page = assembler
            .resolve(&Route::Epub {
                book: "things".to_string(),
                file: "x.epub".to_string(),
            })
            .unwrap();
        assert!(matches!(page, Page::Html(html) if html.contains("<p>odd</p>")));

        let err = assembler
            .resolve(&Route::Epub {
                book: "things".to_string(),
                file: "other.epub".to_string(),
            })
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_template_error_is_not_not_found() {
        let dir = TempDir::new().unwrap();
        let mut templates = TemplateRegistry::new();
        templates.register(crate::template::Template::new("home", "{{ missing }}"));
        let base = assembler(&dir);
        let assembler = PageAssembler::new(
            base.repository().clone(),
            templates,
            SiteConfig::default(),
        );

        let err = assembler.resolve(&Route::Home).unwrap_err();
        assert!(matches!(err, PageError::Template(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_unknown_syntax_theme_fails_setup() {
        let mut config = Config::default();
        config.markdown.syntax_theme = "no-such-theme".to_string();

        let err = PageAssembler::from_config(&config).unwrap_err();
        assert!(matches!(err, PageError::Parser(ParserError::Syntax(_))));
        assert!(err.to_string().contains("no-such-theme"));
    }
}
