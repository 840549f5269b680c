//! Serve command - renders pages on each request

use std::{fs, path::Path};

use color_eyre::eyre::{Result, WrapErr};
use folio_core::Config;
use folio_generator::PageAssembler;
use tokio::net::TcpListener;

use crate::server::{ServerState, create_router};

/// Run the serve command.
///
/// Templates and the markdown renderer are prepared once; content is read
/// from disk on every request.
pub async fn run(config_path: &Path, host: Option<&str>, port: Option<u16>) -> Result<()> {
    tracing::info!(?config_path, ?host, ?port, "Starting server");

    let mut config =
        Config::load_or_default(config_path).wrap_err("Failed to load configuration")?;
    if let Some(host) = host {
        config.server.host = host.to_string();
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().wrap_err("Invalid configuration")?;

    for root in [config.posts_dir(), config.books_dir()] {
        fs::read_dir(&root)
            .wrap_err_with(|| format!("Content root {} is not readable", root.display()))?;
    }

    let assembler = PageAssembler::from_config(&config).wrap_err("Failed to initialize site")?;
    let app = create_router(&config.static_dir(), ServerState::new(assembler));
    let addr = config.server_addr();

    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    tracing::info!(%addr, "listening");
    println!();
    println!("  Server running at http://{addr}");
    println!("  Press Ctrl+C to stop");
    println!();

    axum::serve(listener, app).await.wrap_err("Server error")?;

    Ok(())
}
