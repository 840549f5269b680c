//! Folio Generator Library
//!
//! Content loading, page assembly, and static site generation.
//!
//! # Modules
//!
//! - [`repository`] - Post and book discovery, loading, and chapter navigation
//! - [`template`] - HTML template system with variable interpolation
//! - [`route`] - URL space shared by the server and the static build
//! - [`pages`] - Page assembly from repository content and templates
//! - [`assets`] - Static asset copying
//! - [`epub`] - EPUB packaging from a book's chapter list
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod epub;
pub mod pages;
pub mod repository;
pub mod route;
pub mod template;

pub use build::{BuildError, BuildStats, Builder};
pub use epub::{EpubError, package_book};
pub use pages::{EPUB_CONTENT_TYPE, Page, PageAssembler, PageError};
pub use repository::{Repository, RepositoryError};
pub use route::Route;
pub use template::{Template, TemplateContext, TemplateError, TemplateRegistry};
