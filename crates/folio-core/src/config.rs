//! Site configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Prefix for environment variable overrides (`FOLIO__SERVER__PORT=9000`).
pub const ENV_PREFIX: &str = "FOLIO";

/// Main configuration structure for folio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Content locations.
    #[serde(default)]
    pub content: ContentConfig,

    /// Static build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Markdown rendering settings.
    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// Directory that relative paths resolve against.
    #[serde(skip)]
    pub root: PathBuf,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title, used on the home page.
    #[serde(default = "default_title")]
    pub title: String,

    /// Site description for meta tags.
    #[serde(default)]
    pub description: Option<String>,

    /// Site author name.
    #[serde(default)]
    pub author: Option<String>,

    /// HTML shown on the home page when the title page cannot be read.
    #[serde(default = "default_fallback_home")]
    pub fallback_home: String,
}

/// Where content lives, relative to the site root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// One subdirectory per post.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,

    /// One subdirectory per book.
    #[serde(default = "default_books_dir")]
    pub books_dir: String,

    /// Markdown file rendered on the home page.
    #[serde(default = "default_title_page")]
    pub title_page: String,

    /// Directory of `*.html` template overrides.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Site-wide static assets, served under `/static/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Output directory for generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Markdown renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Render soft line breaks as `<br />`.
    #[serde(default = "default_true")]
    pub hard_wraps: bool,

    /// Turn bare URLs into links.
    #[serde(default = "default_true")]
    pub linkify: bool,

    /// Generate `id` attributes for headings.
    #[serde(default = "default_true")]
    pub heading_ids: bool,

    /// Highlight fenced code blocks.
    #[serde(default = "default_true")]
    pub highlight: bool,

    /// Syntax highlighting theme name.
    #[serde(default = "default_syntax_theme")]
    pub syntax_theme: String,
}

// Default value functions
fn default_title() -> String {
    "My Personal Website".to_string()
}

fn default_fallback_home() -> String {
    "<p>Welcome to my blog!</p>".to_string()
}

fn default_posts_dir() -> String {
    "blogs".to_string()
}

fn default_books_dir() -> String {
    "books".to_string()
}

fn default_title_page() -> String {
    "title-page/index.md".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_output_dir() -> String {
    "public".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_syntax_theme() -> String {
    "base16-ocean.dark".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: None,
            author: None,
            fallback_home: default_fallback_home(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            books_dir: default_books_dir(),
            title_page: default_title_page(),
            templates_dir: default_templates_dir(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            hard_wraps: true,
            linkify: true,
            heading_ids: true,
            highlight: true,
            syntax_theme: default_syntax_theme(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.root = root_of(path);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file layered with `FOLIO__*` environment variables.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(env_source())
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.root = root_of(path);
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    ///
    /// Environment overrides apply in both cases.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_with_env(path);
        }

        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        let settings = config::Config::builder().add_source(env_source()).build()?;
        let mut config: Config = settings.try_deserialize()?;
        config.root = PathBuf::from(".");
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.site.title.is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(CoreError::config("server.port cannot be 0"));
        }

        for (key, value) in [
            ("content.posts_dir", &self.content.posts_dir),
            ("content.books_dir", &self.content.books_dir),
            ("content.title_page", &self.content.title_page),
            ("build.output_dir", &self.build.output_dir),
        ] {
            if value.is_empty() {
                return Err(CoreError::config(format!("{key} cannot be empty")));
            }
        }

        Ok(())
    }

    /// Resolve a configured path against the site root.
    #[must_use]
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.resolve(&self.content.posts_dir)
    }

    pub fn books_dir(&self) -> PathBuf {
        self.resolve(&self.content.books_dir)
    }

    pub fn title_page(&self) -> PathBuf {
        self.resolve(&self.content.title_page)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.resolve(&self.content.templates_dir)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.resolve(&self.content.static_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.build.output_dir)
    }

    /// Socket address string for the HTTP server.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

fn root_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
