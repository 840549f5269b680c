//! Site routes shared by the HTTP front end and the static build.

use std::{
    borrow::Cow,
    fmt,
    path::{Path, PathBuf},
};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped inside one URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One addressable page or download.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Posts,
    Post { slug: String },
    Books,
    Book { slug: String },
    Chapter { book: String, chapter: String },
    Epub { book: String, file: String },
}

impl Route {
    /// Map a request path to a route.
    ///
    /// The path is percent-decoded first. Trailing slashes are optional.
    /// Returns `None` for anything outside the site's URL space.
    pub fn parse(path: &str) -> Option<Self> {
        let decoded = percent_decode_str(path).decode_utf8().ok()?;
        let trimmed = decoded.trim_start_matches('/');
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        if trimmed.is_empty() {
            return Some(Self::Home);
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        let route = match segments.as_slice() {
            ["posts"] => Self::Posts,
            ["post", slug] => Self::Post {
                slug: (*slug).to_string(),
            },
            ["books"] => Self::Books,
            ["book", slug] => Self::Book {
                slug: (*slug).to_string(),
            },
            ["book", book, file] if file.ends_with(".epub") => Self::Epub {
                book: (*book).to_string(),
                file: (*file).to_string(),
            },
            ["book", book, chapter] => Self::Chapter {
                book: (*book).to_string(),
                chapter: (*chapter).to_string(),
            },
            _ => return None,
        };
        Some(route)
    }

    /// Canonical link to this route.
    #[must_use]
    pub fn url(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Posts => "/posts/".to_string(),
            Self::Post { slug } => format!("/post/{}/", encode(slug)),
            Self::Books => "/books/".to_string(),
            Self::Book { slug } => format!("/book/{}/", encode(slug)),
            Self::Chapter { book, chapter } => {
                format!("/book/{}/{}", encode(book), encode(chapter))
            }
            Self::Epub { book, file } => format!("/book/{}/{}", encode(book), encode(file)),
        }
    }

    /// Where the static build writes this route under `root`.
    #[must_use]
    pub fn output_path(&self, root: &Path) -> PathBuf {
        match self {
            Self::Home => root.join("index.html"),
            Self::Posts => root.join("posts").join("index.html"),
            Self::Post { slug } => root.join("post").join(slug).join("index.html"),
            Self::Books => root.join("books").join("index.html"),
            Self::Book { slug } => root.join("book").join(slug).join("index.html"),
            Self::Chapter { book, chapter } => {
                root.join("book").join(book).join(chapter).join("index.html")
            }
            Self::Epub { book, file } => root.join("book").join(book).join(file),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn encode(segment: &str) -> Cow<'_, str> {
    utf8_percent_encode(segment, SEGMENT).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(slug: &str) -> Route {
        Route::Post {
            slug: slug.to_string(),
        }
    }

    fn chapter(book: &str, chapter: &str) -> Route {
        Route::Chapter {
            book: book.to_string(),
            chapter: chapter.to_string(),
        }
    }

    #[test]
    fn test_parse_fixed_routes() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse(""), Some(Route::Home));
        assert_eq!(Route::parse("/posts/"), Some(Route::Posts));
        assert_eq!(Route::parse("/posts"), Some(Route::Posts));
        assert_eq!(Route::parse("/books/"), Some(Route::Books));
    }

    #[test]
    fn test_parse_content_routes() {
        assert_eq!(Route::parse("/post/hello/"), Some(post("hello")));
        assert_eq!(Route::parse("/post/hello"), Some(post("hello")));
        assert_eq!(
            Route::parse("/book/my-book/"),
            Some(Route::Book {
                slug: "my-book".to_string()
            })
        );
        assert_eq!(
            Route::parse("/book/my-book/intro"),
            Some(chapter("my-book", "intro"))
        );
        assert_eq!(
            Route::parse("/book/my-book/my-book.epub"),
            Some(Route::Epub {
                book: "my-book".to_string(),
                file: "my-book.epub".to_string()
            })
        );
    }

    #[test]
    fn test_parse_decodes_percent_escapes() {
        assert_eq!(Route::parse("/post/caf%C3%A9/"), Some(post("café")));
        assert_eq!(Route::parse("/post/a%20b/"), Some(post("a b")));
        assert_eq!(Route::parse("/post/%FF/"), None);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(Route::parse("/about"), None);
        assert_eq!(Route::parse("/post/"), None);
        assert_eq!(Route::parse("/post//x"), None);
        assert_eq!(Route::parse("/book/a/b/c"), None);
        assert_eq!(Route::parse("/posts/extra"), None);
    }

    #[test]
    fn test_url_round_trips_through_parse() {
        let routes = [
            Route::Home,
            Route::Posts,
            post("hello world"),
            Route::Books,
            chapter("b", "ch-1"),
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.url()), Some(route.clone()), "{route}");
        }
    }

    #[test]
    fn test_urls() {
        assert_eq!(post("hello").url(), "/post/hello/");
        assert_eq!(chapter("b", "c").url(), "/book/b/c");
        assert_eq!(post("a b").url(), "/post/a%20b/");
    }

    #[test]
    fn test_output_paths() {
        let root = Path::new("/out");
        assert_eq!(Route::Home.output_path(root), root.join("index.html"));
        assert_eq!(
            Route::Posts.output_path(root),
            root.join("posts/index.html")
        );
        assert_eq!(
            post("hello").output_path(root),
            root.join("post/hello/index.html")
        );
        assert_eq!(
            chapter("b", "c").output_path(root),
            root.join("book/b/c/index.html")
        );
        assert_eq!(
            Route::Epub {
                book: "b".to_string(),
                file: "b.epub".to_string()
            }
            .output_path(root),
            root.join("book/b/b.epub")
        );
    }
}
