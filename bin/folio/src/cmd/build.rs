//! Build command - generates the static site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use folio_core::Config;
use folio_generator::Builder;

/// Run the build command.
///
/// Regenerates the whole site into the configured output directory, or into
/// `output` when given.
pub fn run(config_path: &Path, output: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, "Starting build");

    let config = Config::load_or_default(config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let mut builder = Builder::from_config(&config).wrap_err("Failed to initialize site")?;
    if let Some(output) = output {
        builder = builder.with_output_dir(output);
    }

    let stats = builder.build().wrap_err("Build failed")?;

    for path in &stats.generated {
        println!("Generated: {}", path.display());
    }
    for path in &stats.copied {
        println!("Copied: {}", path.display());
    }
    println!(
        "Site built successfully in {}",
        builder.output_dir().display()
    );

    let duration = start.elapsed();
    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(())
}
