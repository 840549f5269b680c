//! Syntax highlighting for fenced code blocks.

use syntect::{highlighting::ThemeSet, html::highlighted_html_for_string, parsing::SyntaxSet};
use thiserror::Error;

use crate::html_escape;

/// Syntax highlighting errors.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// The configured theme is not bundled with syntect.
    #[error("unknown syntax theme `{name}` (available: {available})")]
    UnknownTheme { name: String, available: String },
}

/// Syntax highlighter using syntect.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme: String,
}

impl SyntaxHighlighter {
    /// Default theme name.
    pub const DEFAULT_THEME: &'static str = "base16-ocean.dark";

    /// Create a highlighter using one of syntect's bundled themes.
    pub fn new(theme: &str) -> Result<Self, SyntaxError> {
        let theme_set = ThemeSet::load_defaults();
        if !theme_set.themes.contains_key(theme) {
            let mut names: Vec<_> = theme_set.themes.keys().map(String::as_str).collect();
            names.sort_unstable();
            return Err(SyntaxError::UnknownTheme {
                name: theme.to_string(),
                available: names.join(", "),
            });
        }

        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set,
            theme: theme.to_string(),
        })
    }

    /// Highlight code for the given language token (`rust`, `py`, ...).
    ///
    /// Languages syntect does not know render as a plain escaped block.
    pub fn highlight(&self, code: &str, lang: &str) -> String {
        let Some(syntax) = self.syntax_set.find_syntax_by_token(lang) else {
            return plain_code_block(code, Some(lang));
        };
        let Some(theme) = self.theme_set.themes.get(&self.theme) else {
            return plain_code_block(code, Some(lang));
        };

        highlighted_html_for_string(code, &self.syntax_set, syntax, theme)
            .unwrap_or_else(|_| plain_code_block(code, Some(lang)))
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme: Self::DEFAULT_THEME.to_string(),
        }
    }
}

/// Escaped `<pre><code>` block with an optional `language-*` class.
pub fn plain_code_block(code: &str, lang: Option<&str>) -> String {
    let lang_class = lang
        .map(|l| format!(" class=\"language-{}\"", html_escape(l)))
        .unwrap_or_default();
    format!("<pre><code{lang_class}>{}</code></pre>", html_escape(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {\n    println!(\"Hello\");\n}";
        let html = highlighter.highlight(code, "rust");

        assert!(html.contains("<pre"));
        assert!(html.contains("style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_highlight_unknown_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("a < b", "unknown_lang_xyz");

        assert_eq!(
            html,
            "<pre><code class=\"language-unknown_lang_xyz\">a &lt; b</code></pre>"
        );
    }

    #[test]
    fn test_plain_code_block_without_language() {
        assert_eq!(
            plain_code_block("plain & simple", None),
            "<pre><code>plain &amp; simple</code></pre>"
        );
    }

    #[test]
    fn test_new_rejects_unknown_theme() {
        let err = SyntaxHighlighter::new("no-such-theme").unwrap_err();
        assert!(err.to_string().contains("no-such-theme"));
        assert!(err.to_string().contains("base16-ocean.dark"));
    }

    #[test]
    fn test_new_with_bundled_theme() {
        let light = SyntaxHighlighter::new("InspiredGitHub").expect("theme");
        let dark = SyntaxHighlighter::default();
        let code = "let x = 1;";

        assert!(light.highlight(code, "rust").contains("style="));
        assert_ne!(light.highlight(code, "rust"), dark.highlight(code, "rust"));
    }
}
