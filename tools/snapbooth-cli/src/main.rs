//! SnapBooth CLI — Command-line photobooth.
//!
//! Usage:
//!   snapbooth shoot [OPTIONS]          Shoot a strip on this machine alone
//!   snapbooth host [OPTIONS]           Wait for a second booth and shoot together
//!   snapbooth join <ADDR> [OPTIONS]    Pair with a waiting booth
//!   snapbooth layouts                  Print and validate the slot geometry
//!   snapbooth config                   Show or write the configuration file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;
mod console;

#[derive(Parser)]
#[command(
    name = "snapbooth",
    about = "Two-person photobooth strips from the command line",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs a booth.
#[derive(Args, Debug, Clone, Default)]
pub struct BoothArgs {
    /// Local camera: `synthetic`, `synthetic:WxH`, `none`, or an image path
    #[arg(long, default_value = "synthetic")]
    pub local: String,

    /// Remote camera stand-in, same forms as --local
    #[arg(long, default_value = "synthetic")]
    pub remote: String,

    /// Layout: single, two-row (grid), three-row (strip)
    #[arg(short, long)]
    pub layout: Option<String>,

    /// Filter: none, grayscale, sepia, contrast, bright, invert, vintage
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Paper color (#rrggbb)
    #[arg(long)]
    pub paper: Option<String>,

    /// Border color (#rrggbb)
    #[arg(long)]
    pub border: Option<String>,

    /// Caption text (default: "<prefix> // <date>")
    #[arg(short, long)]
    pub caption: Option<String>,

    /// Directory the finished strip is saved to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the countdown and flash pauses
    #[arg(long)]
    pub instant: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Shoot a full strip locally, no peer
    Shoot {
        #[command(flatten)]
        booth: BoothArgs,
    },

    /// Wait for a peer booth and shoot together
    Host {
        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:7878")]
        bind: String,

        #[command(flatten)]
        booth: BoothArgs,
    },

    /// Connect to a hosting booth
    Join {
        /// Host address, e.g. 192.168.1.20:7878
        addr: String,

        #[command(flatten)]
        booth: BoothArgs,
    },

    /// Print the slot geometry of every layout and validate it
    Layouts {
        /// Geometry table to check instead of the configured one
        #[arg(long)]
        table: Option<PathBuf>,

        /// Print the table as JSON (a starting point for a custom table)
        #[arg(long)]
        json: bool,
    },

    /// Show the configuration, or write the defaults to disk
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = snapbooth_common::config::AppConfig::load();

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    snapbooth_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Shoot { booth } => commands::shoot::run(&config, booth).await,
        Commands::Host { bind, booth } => commands::pair::host(&config, bind, booth).await,
        Commands::Join { addr, booth } => commands::pair::join(&config, addr, booth).await,
        Commands::Layouts { table, json } => commands::layouts::run(&config, table, json),
        Commands::Config { init, force } => commands::config::run(&config, init, force),
    }
}
