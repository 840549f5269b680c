//! Folio CLI Library
//!
//! Command implementations and the HTTP front end for the folio site builder.
//! The binary entry point lives in `main.rs`.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, serve, epub)
//! - [`server`] - HTTP server rendering pages on request
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use folio::cmd;
//!
//! // Build a static site
//! cmd::build::run(Path::new("folio.toml"), None).unwrap();
//! ```

pub mod cmd;
pub mod server;

// Re-export core types for convenience
pub use folio_core::Config;
pub use folio_generator::{BuildStats, Builder, PageAssembler};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// `RUST_LOG` directives are honored alongside the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
