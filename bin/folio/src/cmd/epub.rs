//! Epub command - packages a book's chapters into its EPUB file

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use folio_core::Config;
use folio_generator::{PageAssembler, epub};

/// Run the epub command.
///
/// Writes to the book's declared `epub_file` unless `output` is given.
pub fn run(config_path: &Path, book: &str, output: Option<&Path>) -> Result<PathBuf> {
    tracing::info!(?config_path, book, ?output, "Packaging epub");

    let config = Config::load_or_default(config_path).wrap_err("Failed to load configuration")?;
    let assembler = PageAssembler::from_config(&config).wrap_err("Failed to initialize site")?;
    let repository = assembler.repository();

    let path = match output {
        Some(output) => {
            let loaded = repository
                .load_book(book)
                .wrap_err_with(|| format!("Failed to load book {book}"))?;
            epub::write_epub_file(repository, &loaded, output)
                .wrap_err_with(|| format!("Failed to package {book}"))?;
            output.to_path_buf()
        }
        None => epub::package_book(repository, book)
            .wrap_err_with(|| format!("Failed to package {book}"))?,
    };

    println!("Written: {}", path.display());
    Ok(path)
}
