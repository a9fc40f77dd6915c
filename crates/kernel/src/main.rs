//! Modulio CLI
//!
//! Inspects the modules declared in the manifests directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use modulio_kernel::cli;
use modulio_kernel::config::ModulioConfig;

/// Module registry inspector.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory scanned for `*.module.toml` manifests (overrides MODULIO_MODULES_DIR).
    #[arg(long, global = true)]
    modules_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered modules.
    List,
    /// Print the ordered navigation of a menu.
    Nav {
        /// Menu name (defaults to MODULIO_DEFAULT_MENU).
        menu: Option<String>,
    },
    /// Print the aggregated permissions.
    Permissions,
    /// Validate module manifests.
    Check,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let args = Args::parse();
    let mut config = ModulioConfig::from_env()?;
    if let Some(dir) = args.modules_dir {
        config.modules_dir = dir;
    }

    match args.command {
        Command::List => cli::cmd_list(&config),
        Command::Nav { menu } => cli::cmd_nav(&config, menu.as_deref()),
        Command::Permissions => cli::cmd_permissions(&config),
        Command::Check => cli::cmd_check(&config),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("modulio_kernel=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
