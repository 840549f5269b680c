//! Folio CLI
//!
//! Builds or serves a site of blog posts and multi-chapter books.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for folio.
#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Build or serve a site of blog posts and books"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "folio.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Render the whole site to static files
    Build {
        /// Output directory (defaults to build.output_dir)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
    /// Serve the site, rendering each page on request
    Serve {
        /// Address to bind (defaults to server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Package a book's chapters into its EPUB file
    Epub {
        /// Book slug (directory name under the books root)
        book: String,
        /// Write here instead of the book's declared epub_file
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    folio::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output } => {
            folio::cmd::build::run(&cli.config, output.as_deref())?;
        }
        Commands::Serve { host, port } => {
            folio::cmd::serve::run(&cli.config, host.as_deref(), port).await?;
        }
        Commands::Epub { book, output } => {
            folio::cmd::epub::run(&cli.config, &book, output.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["folio", "build", "--output", "dist"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, std::path::PathBuf::from("folio.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build { output } => {
                assert_eq!(output, Some(std::path::PathBuf::from("dist")));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_default_output() {
        let cli = Cli::parse_from(["folio", "build"]);

        match cli.command {
            Commands::Build { output } => assert!(output.is_none()),
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_serve_command_parsing() {
        let args = ["folio", "serve", "--host", "0.0.0.0", "--port", "9000"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9000));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_serve_defaults() {
        let cli = Cli::parse_from(["folio", "serve"]);

        match cli.command {
            Commands::Serve { host, port } => {
                assert!(host.is_none());
                assert!(port.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_epub_command_parsing() {
        let cli = Cli::parse_from(["folio", "epub", "my-book", "-o", "out/book.epub"]);

        match cli.command {
            Commands::Epub { book, output } => {
                assert_eq!(book, "my-book");
                assert_eq!(output, Some(std::path::PathBuf::from("out/book.epub")));
            }
            _ => panic!("Expected Epub command"),
        }
    }

    #[test]
    fn test_cli_epub_requires_book() {
        assert!(Cli::try_parse_from(["folio", "epub"]).is_err());
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let args = ["folio", "-vvv", "build"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_path() {
        let args = ["folio", "--config", "site.toml", "serve"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.config, std::path::PathBuf::from("site.toml"));
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["folio", "watch"]).is_err());
    }
}
