//! RegMount CLI: inspect and exercise mount definitions.
//!
//! # Commands
//! ```text
//! regmount check     --config <mounts.yaml>
//! regmount translate --config <mounts.yaml> <path> [--reverse --mount <id>]
//! regmount browse    --config <mounts.yaml> [--seed <db>=<dump.json>]... <path>
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use regmount_mount::{MountConfig, MountFile};
use regmount_observability::{init_tracing, LogConfig};
use std::path::{Path, PathBuf};

mod cmd_browse;
mod cmd_check;
mod cmd_translate;

#[derive(Parser)]
#[command(
    name = "regmount",
    about = "Mount registries into a local namespace: RegMount CLI",
    long_about = "
RegMount CLI: validate mount definitions, map paths between the local
namespace and mounted registries, and browse embedded mounts backed by
dump archives.

ENVIRONMENT VARIABLES:
  RUST_LOG    Overrides --log-level with a full tracing filter
",
    version
)]
struct Cli {
    /// Global log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a mount file and list the mounts it defines
    Check {
        /// Path to the YAML mount file
        #[arg(short, long)]
        config: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Map a local path to the mounted registry, or back
    Translate {
        /// Path to the YAML mount file
        #[arg(short, long)]
        config: PathBuf,
        /// Path to translate
        path: String,
        /// Treat `path` as a path inside the mounted registry
        #[arg(long, requires = "mount")]
        reverse: bool,
        /// Mount id to translate back through (with --reverse)
        #[arg(long)]
        mount: Option<String>,
    },

    /// Read a path through the mounts defined in a mount file
    Browse {
        /// Path to the YAML mount file
        #[arg(short, long)]
        config: PathBuf,
        /// Seed an embedded registry from a dump archive: `<db-config>=<file>`
        #[arg(long, value_name = "DB=FILE")]
        seed: Vec<String>,
        /// Seed the local registry from a dump archive
        #[arg(long)]
        local: Option<PathBuf>,
        /// Act as this user
        #[arg(long, default_value = "admin")]
        user: String,
        /// Path to read
        path: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(
        &LogConfig::default()
            .with_level(cli.log_level.clone())
            .with_json(cli.json_logs),
    );

    match cli.command {
        Commands::Check { config, json } => cmd_check::run(&config, json),

        Commands::Translate {
            config,
            path,
            reverse,
            mount,
        } => cmd_translate::run(&config, &path, reverse, mount.as_deref()),

        Commands::Browse {
            config,
            seed,
            local,
            user,
            path,
            json,
        } => cmd_browse::run(&config, &seed, local.as_deref(), &user, &path, json),
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

fn load_mounts(path: &Path) -> Result<Vec<MountConfig>> {
    let file = MountFile::load(path)
        .with_context(|| format!("read mount file '{}'", path.display()))?;
    file.configs()
        .with_context(|| format!("invalid mount in '{}'", path.display()))
}
