//! Markdown renderer using pulldown-cmark.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use folio_core::config::MarkdownConfig;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use thiserror::Error;

use crate::{
    html_escape,
    syntax::{SyntaxHighlighter, plain_code_block},
};

/// Markdown conversion errors.
#[derive(Debug, Error)]
pub enum MarkdownError {
    /// Source bytes are not valid UTF-8.
    #[error("{path} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Result type for markdown operations.
pub type Result<T> = std::result::Result<T, MarkdownError>;

/// Markdown to HTML renderer.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug)]
pub struct MarkdownRenderer {
    highlighter: Option<SyntaxHighlighter>,
    options: Options,
    hard_wraps: bool,
    linkify: bool,
    heading_ids: bool,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Create a renderer with every extension enabled and the default theme.
    pub fn new() -> Self {
        Self {
            highlighter: Some(SyntaxHighlighter::default()),
            options: extension_options(),
            hard_wraps: true,
            linkify: true,
            heading_ids: true,
        }
    }

    /// Create a renderer from the `[markdown]` configuration section.
    pub fn from_config(config: &MarkdownConfig) -> crate::Result<Self> {
        let highlighter = if config.highlight {
            Some(SyntaxHighlighter::new(&config.syntax_theme)?)
        } else {
            None
        };

        Ok(Self {
            highlighter,
            options: extension_options(),
            hard_wraps: config.hard_wraps,
            linkify: config.linkify,
            heading_ids: config.heading_ids,
        })
    }

    /// Render raw file bytes read from `path`.
    pub fn render_bytes(&self, bytes: &[u8], path: &Path) -> Result<String> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|source| {
            MarkdownError::InvalidUtf8 {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(self.render(&text))
    }

    /// Render markdown text to an HTML fragment.
    pub fn render(&self, content: &str) -> String {
        let mut writer = HtmlWriter::new(self);
        for event in Parser::new_ext(content, self.options) {
            writer.event(event);
        }
        writer.html
    }

    fn code_block(&self, code: &str, lang: Option<&str>) -> String {
        match (&self.highlighter, lang) {
            (Some(highlighter), Some(lang)) => highlighter.highlight(code, lang),
            _ => plain_code_block(code, lang),
        }
    }
}

fn extension_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

struct OpenHeading {
    level: u8,
    id: Option<String>,
    classes: Vec<String>,
    /// Byte offset in the output where the opening tag belongs.
    start: usize,
    text: String,
}

struct OpenCodeBlock {
    lang: Option<String>,
    content: String,
}

struct OpenImage {
    src: String,
    title: String,
    alt: String,
    /// Images nested in the alt text that are still open.
    nested: usize,
}

/// Event-to-HTML state machine for one document.
struct HtmlWriter<'a> {
    renderer: &'a MarkdownRenderer,
    html: String,
    heading: Option<OpenHeading>,
    code: Option<OpenCodeBlock>,
    image: Option<OpenImage>,
    link_depth: usize,
    in_table_head: bool,
    used_ids: HashMap<String, usize>,
}

impl<'a> HtmlWriter<'a> {
    fn new(renderer: &'a MarkdownRenderer) -> Self {
        Self {
            renderer,
            html: String::new(),
            heading: None,
            code: None,
            image: None,
            link_depth: 0,
            in_table_head: false,
            used_ids: HashMap::new(),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading {
                level, id, classes, ..
            }) => {
                self.heading = Some(OpenHeading {
                    level: level as u8,
                    id: id.map(|i| i.to_string()),
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    start: self.html.len(),
                    text: String::new(),
                });
            }

            Event::End(TagEnd::Heading(_)) => self.close_heading(),

            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(OpenCodeBlock {
                    lang,
                    content: String::new(),
                });
            }

            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = self.code.take() {
                    let rendered = self
                        .renderer
                        .code_block(&block.content, block.lang.as_deref());
                    self.html.push_str(&rendered);
                    self.html.push('\n');
                }
            }

            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => match &mut self.image {
                Some(image) => image.nested += 1,
                None => {
                    self.image = Some(OpenImage {
                        src: dest_url.to_string(),
                        title: title.to_string(),
                        alt: String::new(),
                        nested: 0,
                    });
                }
            },

            Event::End(TagEnd::Image) => {
                if let Some(image) = self.image.as_mut().filter(|image| image.nested > 0) {
                    image.nested -= 1;
                } else if let Some(image) = self.image.take() {
                    let title_attr = if image.title.is_empty() {
                        String::new()
                    } else {
                        format!(" title=\"{}\"", html_escape(&image.title))
                    };
                    self.html.push_str(&format!(
                        "<img src=\"{}\" alt=\"{}\"{title_attr} />",
                        html_escape(&image.src),
                        html_escape(&image.alt)
                    ));
                }
            }

            // Alt text is plain, so inline markup inside an image is dropped.
            Event::Start(_) | Event::End(_) if self.image.is_some() => {}

            Event::Start(tag @ Tag::Link { .. }) => {
                self.link_depth += 1;
                self.html.push_str(&tag_to_html_start(&tag));
            }

            Event::End(TagEnd::Link) => {
                self.link_depth = self.link_depth.saturating_sub(1);
                self.html.push_str("</a>");
            }

            Event::Start(Tag::TableHead) => {
                self.in_table_head = true;
                self.html.push_str("<thead><tr>");
            }

            Event::End(TagEnd::TableHead) => {
                self.in_table_head = false;
                self.html.push_str("</tr></thead>\n");
            }

            Event::Start(Tag::TableCell) => {
                self.html
                    .push_str(if self.in_table_head { "<th>" } else { "<td>" });
            }

            Event::End(TagEnd::TableCell) => {
                self.html
                    .push_str(if self.in_table_head { "</th>" } else { "</td>" });
            }

            Event::Text(text) => self.text(&text),

            Event::Code(code) => {
                if let Some(image) = &mut self.image {
                    image.alt.push_str(&code);
                    return;
                }
                if let Some(heading) = &mut self.heading {
                    heading.text.push_str(&code);
                }
                self.html
                    .push_str(&format!("<code>{}</code>", html_escape(&code)));
            }

            Event::SoftBreak => {
                if let Some(image) = &mut self.image {
                    image.alt.push(' ');
                } else if self.renderer.hard_wraps {
                    self.html.push_str("<br />\n");
                } else {
                    self.html.push('\n');
                }
            }

            Event::HardBreak => self.html.push_str("<br />\n"),

            Event::Start(tag) => self.html.push_str(&tag_to_html_start(&tag)),

            Event::End(tag) => self.html.push_str(&tag_to_html_end(&tag)),

            Event::Html(raw) | Event::InlineHtml(raw) => self.html.push_str(&raw),

            Event::FootnoteReference(name) => {
                let name = html_escape(&name);
                self.html.push_str(&format!(
                    "<sup class=\"footnote-ref\"><a href=\"#fn-{name}\">[{name}]</a></sup>"
                ));
            }

            Event::Rule => self.html.push_str("<hr />\n"),

            Event::TaskListMarker(checked) => {
                self.html.push_str(if checked {
                    "<input type=\"checkbox\" checked=\"checked\" disabled=\"disabled\" /> "
                } else {
                    "<input type=\"checkbox\" disabled=\"disabled\" /> "
                });
            }

            Event::InlineMath(math) => {
                self.html.push_str(&format!(
                    "<span class=\"math inline\">\\({}\\)</span>",
                    html_escape(&math)
                ));
            }

            Event::DisplayMath(math) => {
                self.html.push_str(&format!(
                    "<div class=\"math display\">\\[{}\\]</div>",
                    html_escape(&math)
                ));
            }
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(block) = &mut self.code {
            block.content.push_str(text);
            return;
        }
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
            return;
        }
        if let Some(heading) = &mut self.heading {
            heading.text.push_str(text);
        }

        if self.renderer.linkify && self.link_depth == 0 {
            self.html.push_str(&linkify(text));
        } else {
            self.html.push_str(&html_escape(text));
        }
    }

    fn close_heading(&mut self) {
        let Some(heading) = self.heading.take() else {
            return;
        };

        let id = match heading.id {
            Some(id) => Some(id),
            None if self.renderer.heading_ids => Some(self.unique_id(&heading.text)),
            None => None,
        };

        let mut open = format!("<h{}", heading.level);
        if let Some(id) = id {
            open.push_str(&format!(" id=\"{}\"", html_escape(&id)));
        }
        if !heading.classes.is_empty() {
            open.push_str(&format!(
                " class=\"{}\"",
                html_escape(&heading.classes.join(" "))
            ));
        }
        open.push('>');

        self.html.insert_str(heading.start, &open);
        self.html.push_str(&format!("</h{}>\n", heading.level));
    }

    /// Slug for a heading, suffixed `-1`, `-2`, ... when already used.
    fn unique_id(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "heading".to_string();
        }

        let seen = self.used_ids.entry(base.clone()).or_insert(0);
        let id = if *seen == 0 {
            base
        } else {
            format!("{base}-{seen}")
        };
        *seen += 1;
        id
    }
}

/// Convert a pulldown-cmark tag to HTML opening tag.
fn tag_to_html_start(tag: &Tag) -> String {
    match tag {
        Tag::Paragraph => "<p>".to_string(),
        Tag::BlockQuote(_) => "<blockquote>\n".to_string(),
        Tag::List(Some(1)) => "<ol>\n".to_string(),
        Tag::List(Some(start)) => format!("<ol start=\"{start}\">\n"),
        Tag::List(None) => "<ul>\n".to_string(),
        Tag::Item => "<li>".to_string(),
        Tag::FootnoteDefinition(name) => {
            format!("<div class=\"footnote\" id=\"fn-{}\">", html_escape(name))
        }
        Tag::Table(_) => "<table>\n".to_string(),
        Tag::TableRow => "<tr>".to_string(),
        Tag::Emphasis => "<em>".to_string(),
        Tag::Strong => "<strong>".to_string(),
        Tag::Strikethrough => "<del>".to_string(),
        Tag::Link {
            dest_url, title, ..
        } => {
            let title_attr = if title.is_empty() {
                String::new()
            } else {
                format!(" title=\"{}\"", html_escape(title))
            };
            format!("<a href=\"{}\"{title_attr}>", html_escape(dest_url))
        }
        Tag::DefinitionList => "<dl>\n".to_string(),
        Tag::DefinitionListTitle => "<dt>".to_string(),
        Tag::DefinitionListDefinition => "<dd>".to_string(),
        Tag::Superscript => "<sup>".to_string(),
        Tag::Subscript => "<sub>".to_string(),
        // Handled by the writer's own state.
        Tag::Heading { .. }
        | Tag::CodeBlock(_)
        | Tag::Image { .. }
        | Tag::TableHead
        | Tag::TableCell
        | Tag::HtmlBlock
        | Tag::MetadataBlock(_) => String::new(),
    }
}

/// Convert a pulldown-cmark tag end to HTML closing tag.
fn tag_to_html_end(tag: &TagEnd) -> String {
    match tag {
        TagEnd::Paragraph => "</p>\n".to_string(),
        TagEnd::BlockQuote(_) => "</blockquote>\n".to_string(),
        TagEnd::List(true) => "</ol>\n".to_string(),
        TagEnd::List(false) => "</ul>\n".to_string(),
        TagEnd::Item => "</li>\n".to_string(),
        TagEnd::FootnoteDefinition => "</div>\n".to_string(),
        TagEnd::Table => "</table>\n".to_string(),
        TagEnd::TableRow => "</tr>\n".to_string(),
        TagEnd::Emphasis => "</em>".to_string(),
        TagEnd::Strong => "</strong>".to_string(),
        TagEnd::Strikethrough => "</del>".to_string(),
        TagEnd::Link => "</a>".to_string(),
        TagEnd::DefinitionList => "</dl>\n".to_string(),
        TagEnd::DefinitionListTitle => "</dt>\n".to_string(),
        TagEnd::DefinitionListDefinition => "</dd>\n".to_string(),
        TagEnd::Superscript => "</sup>".to_string(),
        TagEnd::Subscript => "</sub>".to_string(),
        TagEnd::Heading(_)
        | TagEnd::CodeBlock
        | TagEnd::Image
        | TagEnd::TableHead
        | TagEnd::TableCell
        | TagEnd::HtmlBlock
        | TagEnd::MetadataBlock(_) => String::new(),
    }
}

const URL_PREFIXES: [&str; 3] = ["https://", "http://", "www."];

/// Escape `text`, wrapping bare URLs in anchors.
fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some((start, end)) = find_url(rest) {
        let url = &rest[start..end];
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };

        out.push_str(&html_escape(&rest[..start]));
        out.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            html_escape(&href),
            html_escape(url)
        ));
        rest = &rest[end..];
    }

    out.push_str(&html_escape(rest));
    out
}

/// Byte range of the first bare URL in `text`.
fn find_url(text: &str) -> Option<(usize, usize)> {
    let mut from = 0;

    while from < text.len() {
        let (start, prefix) = URL_PREFIXES
            .iter()
            .filter_map(|p| text[from..].find(p).map(|i| (from + i, *p)))
            .min_by_key(|(i, _)| *i)?;

        let at_boundary = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric() && c != '/' && c != '.');

        let len = text[start..]
            .find(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"'))
            .unwrap_or(text.len() - start);
        let mut end = start + len;
        while let Some(c) = text[start..end].chars().next_back() {
            if matches!(c, '.' | ',' | ':' | ';' | '!' | '?' | ')' | ']' | '\'' | '"') {
                end -= c.len_utf8();
            } else {
                break;
            }
        }

        if at_boundary && end > start + prefix.len() {
            return Some((start, end));
        }
        from = start + prefix.len();
    }

    None
}

/// Convert text to a URL-safe slug.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParserError;

    fn plain() -> MarkdownRenderer {
        MarkdownRenderer::from_config(&MarkdownConfig {
            highlight: false,
            ..MarkdownConfig::default()
        })
        .expect("renderer")
    }

    #[test]
    fn test_render_paragraph_and_heading() {
        let html = plain().render("# Hello World\n\nThis is a test.");

        assert!(html.contains("<h1 id=\"hello-world\">Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_duplicate_heading_ids() {
        let html = plain().render("## Notes\n\n## Notes\n\n## Notes");

        assert!(html.contains("<h2 id=\"notes\">"));
        assert!(html.contains("<h2 id=\"notes-1\">"));
        assert!(html.contains("<h2 id=\"notes-2\">"));
    }

    #[test]
    fn test_explicit_heading_id_wins() {
        let html = plain().render("# Title {#custom .lead}");
        assert!(html.contains("<h1 id=\"custom\" class=\"lead\">Title</h1>"));
    }

    #[test]
    fn test_heading_ids_disabled() {
        let renderer = MarkdownRenderer::from_config(&MarkdownConfig {
            heading_ids: false,
            highlight: false,
            ..MarkdownConfig::default()
        })
        .expect("renderer");

        assert!(renderer.render("# Plain").contains("<h1>Plain</h1>"));
    }

    #[test]
    fn test_hard_wraps() {
        let html = plain().render("line one\nline two");
        assert!(html.contains("line one<br />\nline two"));

        let soft = MarkdownRenderer::from_config(&MarkdownConfig {
            hard_wraps: false,
            highlight: false,
            ..MarkdownConfig::default()
        })
        .expect("renderer");
        assert!(soft.render("line one\nline two").contains("line one\nline two"));
    }

    #[test]
    fn test_linkify_bare_urls() {
        let html = plain().render("See https://example.com/page, or www.rust-lang.org.");

        assert!(html.contains(
            "<a href=\"https://example.com/page\">https://example.com/page</a>,"
        ));
        assert!(html.contains("<a href=\"http://www.rust-lang.org\">www.rust-lang.org</a>."));
    }

    #[test]
    fn test_linkify_skips_existing_links_and_code() {
        let html = plain().render("[https://a.example](https://a.example) `https://b.example`");

        assert_eq!(html.matches("<a ").count(), 1);
        assert!(html.contains("<code>https://b.example</code>"));
    }

    #[test]
    fn test_code_block_plain() {
        let html = plain().render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>"));
    }

    #[test]
    fn test_indented_code_block() {
        let html = plain().render("para\n\n    let x = 1 < 2;\n");
        assert!(html.contains("<pre><code>let x = 1 &lt; 2;\n</code></pre>"));
    }

    #[test]
    fn test_code_block_highlighted() {
        let html = MarkdownRenderer::new().render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_table_rendering() {
        let html = plain().render(
            r#"| Header 1 | Header 2 |
|----------|----------|
| Cell 1   | Cell 2   |"#,
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<thead><tr><th>Header 1</th><th>Header 2</th></tr></thead>"));
        assert!(html.contains("<td>Cell 1</td>"));
    }

    #[test]
    fn test_task_list() {
        let html = plain().render("- [x] Done\n- [ ] Not done");

        assert!(html.contains("checkbox"));
        assert!(html.contains("checked=\"checked\""));
    }

    #[test]
    fn test_strikethrough() {
        assert!(plain().render("~~gone~~").contains("<del>gone</del>"));
    }

    #[test]
    fn test_image_alt_text() {
        let html = plain().render("![A *red* door](images/door.png \"Door\")");
        assert!(html.contains(
            "<img src=\"images/door.png\" alt=\"A red door\" title=\"Door\" />"
        ));
    }

    #[test]
    fn test_image_alt_drops_links_and_nested_images() {
        let html = plain().render("![see [docs](https://x.io) ![icon](i.png) end](big.png)");
        assert!(html.contains("<img src=\"big.png\" alt=\"see docs icon end\" />"));
        assert!(!html.contains("<a "));
        assert!(!html.contains("i.png"));
    }

    #[test]
    fn test_render_bytes_rejects_invalid_utf8() {
        let err = plain()
            .render_bytes(&[0x66, 0xff, 0x6f], Path::new("post/index.md"))
            .unwrap_err();
        assert!(matches!(err, MarkdownError::InvalidUtf8 { .. }));
        assert!(err.to_string().contains("post/index.md"));
    }

    #[test]
    fn test_from_config_unknown_theme() {
        let result = MarkdownRenderer::from_config(&MarkdownConfig {
            syntax_theme: "missing".to_string(),
            ..MarkdownConfig::default()
        });
        assert!(matches!(result, Err(ParserError::Syntax(_))));
    }

    #[test]
    fn test_find_url_boundaries() {
        assert_eq!(find_url("go to http://x.io now"), Some((6, 17)));
        assert_eq!(find_url("nohttp://x.io"), None);
        assert_eq!(find_url("just http:// alone"), None);
        assert_eq!(find_url("(https://x.io/a)"), Some((1, 15)));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test 123 Post"), "test-123-post");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Special!@#Chars"), "specialchars");
    }
}
