//! # queryfs CLI
//!
//! Command-line interface for the QueryFS content-addressed filesystem.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

mod status;

/// QueryFS - a user-space filesystem over a content-addressed blob store
#[derive(Parser)]
#[command(name = "queryfs")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Repository root directory (overrides config and QUERYFS_REPOSITORY)
    #[arg(long, global = true)]
    repository: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or validate a repository layout
    Init {
        /// Repository root directory
        #[arg(value_name = "DIR")]
        directory: Option<PathBuf>,
    },

    /// Show blob-store and namespace statistics
    Status {
        /// Repository root directory
        #[arg(value_name = "DIR")]
        directory: Option<PathBuf>,
    },

    /// Mount the filesystem (Linux only; requires the `fuse` build feature)
    Mount {
        /// Repository root directory
        #[arg(value_name = "DIR")]
        directory: Option<PathBuf>,

        /// Mount point
        #[arg(value_name = "MOUNTPOINT")]
        mountpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = qfs_config::Config::load().unwrap_or_default();
    qfs_config::logging::init_logging(&config.logging.level);

    match cli.command {
        Commands::Init { directory } => {
            let root = resolve_root(directory, cli.repository, &config)?;
            qfs_core::Repository::open(&root).with_context(|| {
                format!("failed to initialise repository at {}", root.display())
            })?;
            println!("Initialised queryfs repository at {}", root.display());
            Ok(())
        }

        Commands::Status { directory } => {
            let root = resolve_root(directory, cli.repository, &config)?;
            status::run(&root)
        }

        Commands::Mount {
            directory,
            mountpoint,
        } => {
            let root = resolve_root(directory, cli.repository, &config)?;
            let fs = qfs_core::QueryFs::open(&root)
                .with_context(|| format!("failed to open repository at {}", root.display()))?;
            qfs_fuse::mount(fs, &mountpoint)
                .with_context(|| format!("failed to mount at {}", mountpoint.display()))
        }
    }
}

/// Repository root precedence: positional argument, then `--repository`,
/// then config (which already folds in `QUERYFS_REPOSITORY`).
fn resolve_root(
    positional: Option<PathBuf>,
    flag: Option<PathBuf>,
    config: &qfs_config::Config,
) -> Result<PathBuf> {
    if let Some(root) = positional.or(flag).or_else(|| config.repository.root.clone()) {
        return Ok(root);
    }

    bail!("no repository specified; pass a directory or set repository.root in .queryfs.toml")
}
