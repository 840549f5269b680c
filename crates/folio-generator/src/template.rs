//! HTML template system for page generation.
//!
//! Templates use plain `{{ name }}` interpolation, with `{{ name? }}` for
//! optional variables. Values are inserted verbatim, so callers escape any
//! user-supplied text before putting it in a [`TemplateContext`].

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("invalid template syntax in `{name}`: {message}")]
    InvalidSyntax { name: String, message: String },

    /// Template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Template context with variables for interpolation.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Create context with initial variables.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a variable value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Check if a variable exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

/// A simple template that supports variable interpolation.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    /// Create a template without checking its syntax.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a template, rejecting malformed placeholders.
    pub fn parse(name: impl Into<String>, content: impl Into<String>) -> Result<Self> {
        let template = Self::new(name, content);
        template.validate()?;
        Ok(template)
    }

    /// Get the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check that every `{{` is closed and names a variable.
    pub fn validate(&self) -> Result<()> {
        let mut pos = 0;

        while let Some(start) = self.content[pos..].find("{{") {
            let start = pos + start;
            let end = self.content[start..]
                .find("}}")
                .ok_or_else(|| self.syntax_error(format!("unclosed {{{{ at byte {start}")))?;
            let end = start + end;

            let var_name = self.content[start + 2..end].trim();
            let var_name = var_name.strip_suffix('?').unwrap_or(var_name);
            let valid = !var_name.is_empty()
                && var_name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(self.syntax_error(format!("invalid variable name `{var_name}`")));
            }

            pos = end + 2;
        }

        Ok(())
    }

    fn syntax_error(&self, message: String) -> TemplateError {
        TemplateError::InvalidSyntax {
            name: self.name.clone(),
            message,
        }
    }

    /// Render the template with the given context.
    ///
    /// Replaces all `{{ variable }}` placeholders with values from context.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut result = String::with_capacity(self.content.len());
        let mut rest = self.content.as_str();

        while let Some(start) = rest.find("{{") {
            let end = rest[start..]
                .find("}}")
                .ok_or_else(|| self.syntax_error("unclosed {{ delimiter".to_string()))?;
            let end = start + end;

            result.push_str(&rest[..start]);

            let var_name = rest[start + 2..end].trim();
            let (var_name, optional) = match var_name.strip_suffix('?') {
                Some(stripped) => (stripped, true),
                None => (var_name, false),
            };

            match context.get(var_name) {
                Some(v) => result.push_str(v),
                None if optional => {}
                None => return Err(TemplateError::MissingVariable(var_name.to_string())),
            }

            rest = &rest[end + 2..];
        }

        result.push_str(rest);
        Ok(result)
    }
}

/// Registry of templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create a new registry with default templates.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_defaults();
        registry
    }

    /// Built-in templates overlaid with every `*.html` file in `dir`.
    ///
    /// Each file registers under its file stem, replacing a built-in of the
    /// same name. A missing directory yields the built-ins only.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();

        if !dir.is_dir() {
            debug!(dir = %dir.display(), "no templates directory, using built-ins");
            return Ok(registry);
        }

        let io_err = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = fs::read_dir(dir)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(io_err)?;
        paths.sort();

        for path in paths {
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "html") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            registry.register(Template::parse(name, content)?);
            debug!(name, path = %path.display(), "loaded template");
        }

        info!(count = registry.templates.len(), "templates ready");
        Ok(registry)
    }

    /// Register default built-in templates.
    fn register_defaults(&mut self) {
        self.register(Template::new("base", DEFAULT_BASE_TEMPLATE));
        self.register(Template::new("home", DEFAULT_HOME_TEMPLATE));
        self.register(Template::new("posts", DEFAULT_POSTS_TEMPLATE));
        self.register(Template::new("post", DEFAULT_POST_TEMPLATE));
        self.register(Template::new("books", DEFAULT_BOOKS_TEMPLATE));
        self.register(Template::new("book", DEFAULT_BOOK_TEMPLATE));
        self.register(Template::new("chapter", DEFAULT_CHAPTER_TEMPLATE));
    }

    /// Register a template.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Get a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, name: &str, context: &TemplateContext) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        template.render(context)
    }
}

/// Default base HTML template.
pub const DEFAULT_BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }}</title>
    <meta name="description" content="{{ description? }}">
    <meta name="author" content="{{ author? }}">
    <link rel="stylesheet" href="/static/style.css">
    <style>
        :root {
            --color-primary: #3B82F6;
            --color-bg: #F8FAFC;
            --color-text: #1E293B;
            --color-text-muted: #64748B;
            --color-border: #E2E8F0;
            --color-code-bg: #F1F5F9;
        }

        @media (prefers-color-scheme: dark) {
            :root {
                --color-primary: #60A5FA;
                --color-bg: #0F172A;
                --color-text: #F1F5F9;
                --color-text-muted: #94A3B8;
                --color-border: #334155;
                --color-code-bg: #1E293B;
            }
        }

        *, *::before, *::after { box-sizing: border-box; }

        body {
            font-family: Georgia, 'Iowan Old Style', serif;
            line-height: 1.7;
            color: var(--color-text);
            background-color: var(--color-bg);
            margin: 0;
        }

        .container {
            max-width: 720px;
            margin: 0 auto;
            padding: 0 1.5rem;
        }

        header nav {
            display: flex;
            justify-content: space-between;
            align-items: center;
            padding: 1rem 0;
            border-bottom: 1px solid var(--color-border);
        }

        .site-title { font-weight: 600; color: var(--color-text); text-decoration: none; }
        .nav-links a { margin-left: 1.25rem; }

        main { padding: 2.5rem 0; }
        a { color: var(--color-primary); }

        pre {
            padding: 1rem;
            overflow-x: auto;
            border-radius: 0.5rem;
            background-color: var(--color-code-bg);
        }

        img { max-width: 100%; height: auto; }
        time, .byline { color: var(--color-text-muted); font-size: 0.9rem; }

        .post-list ul, .toc ol { padding-left: 1.25rem; }
        .book-grid { display: grid; gap: 1.5rem; grid-template-columns: repeat(auto-fill, minmax(16rem, 1fr)); }
        .book-card { border: 1px solid var(--color-border); border-radius: 0.5rem; padding: 1rem; }

        .chapter-nav {
            display: flex;
            justify-content: space-between;
            gap: 1rem;
            margin-top: 3rem;
            padding-top: 1rem;
            border-top: 1px solid var(--color-border);
        }

        footer {
            border-top: 1px solid var(--color-border);
            padding: 2rem 0;
            font-size: 0.875rem;
            color: var(--color-text-muted);
            text-align: center;
        }
    </style>
</head>
<body>
    <header>
        <div class="container">
            <nav>
                <a href="/" class="site-title">{{ site_title }}</a>
                <div class="nav-links">
                    <a href="/posts/">Blog</a>
                    <a href="/books/">Books</a>
                </div>
            </nav>
        </div>
    </header>
    <main>
        <div class="container">
            {{ content }}
        </div>
    </main>
    <footer>
        <div class="container">
            <p>&copy; {{ year }} {{ site_title }}</p>
        </div>
    </footer>
</body>
</html>"##;

/// Default home page template.
pub const DEFAULT_HOME_TEMPLATE: &str = r#"<section class="home">
    {{ content }}
</section>"#;

/// Default posts list template.
pub const DEFAULT_POSTS_TEMPLATE: &str = r#"<section class="post-list">
    <h1>{{ title }}</h1>
    <ul>
        {{ items }}
    </ul>
</section>"#;

/// Default single post template.
pub const DEFAULT_POST_TEMPLATE: &str = r#"<article class="post">
    <header>
        <h1>{{ title }}</h1>
        {{ date_html? }}
        {{ tags_html? }}
    </header>
    <div class="content">
        {{ content }}
    </div>
</article>"#;

/// Default books list template.
pub const DEFAULT_BOOKS_TEMPLATE: &str = r#"<section class="books">
    <h1>{{ title }}</h1>
    <div class="book-grid">
        {{ items }}
    </div>
</section>"#;

/// Default book table-of-contents template.
pub const DEFAULT_BOOK_TEMPLATE: &str = r#"<article class="book">
    <header>
        <h1>{{ title }}</h1>
        {{ subtitle_html? }}
        {{ byline_html? }}
    </header>
    <div class="intro">
        {{ intro? }}
    </div>
    {{ epub_html? }}
    <nav class="toc">
        <h2>Contents</h2>
        <ol>
            {{ chapters }}
        </ol>
    </nav>
</article>"#;

/// Default chapter template.
pub const DEFAULT_CHAPTER_TEMPLATE: &str = r#"<article class="chapter">
    <header>
        <p class="byline"><a href="{{ book_url }}">{{ book_title }}</a></p>
        <h1>{{ title }}</h1>
    </header>
    <div class="content">
        {{ content }}
    </div>
    <nav class="chapter-nav">
        <span>{{ prev_html? }}</span>
        <span>{{ next_html? }}</span>
    </nav>
</article>"#;
