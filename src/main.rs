// ssv: status saver. Browse, play, share and save media from one granted folder.
// Images and videos are classified by suffix and listed newest first.
// Videos play through a bounded pool of mpv players (feature `mpv`).

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

mod cli;
mod config;
mod export;
mod grants;
mod library;
mod media;
#[cfg(feature = "mpv")]
mod mpv;
#[cfg_attr(not(feature = "mpv"), allow(dead_code))]
mod pager;
mod player;
mod scanner;
mod snackbar;
mod ticker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;
use grants::Grants;

#[derive(Parser, Debug)]
#[command(name = "ssv", about = "Status saver: browse, play, share and save status media")]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Folder to browse (overrides config and the default status folder)
    #[arg(short, long, global = true)]
    folder: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Persist read access to a folder (default: the status folder)
    Grant { path: Option<PathBuf> },
    /// Drop a persisted grant
    Revoke { path: PathBuf },
    /// Show folder, grant and item counts
    Status,
    /// List media, newest first
    List {
        /// Images only
        #[arg(long, conflicts_with = "videos")]
        images: bool,
        /// Videos only
        #[arg(long)]
        videos: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show details for one item (1-based index or file name)
    Info { target: String },
    /// Copy an item into the Downloads folder
    Save {
        target: String,
        /// Open the saved copy afterwards
        #[arg(long)]
        open: bool,
    },
    /// Open an item with the desktop share handler
    Share { target: String },
    /// Interactive video pager (index into the video list or file name)
    Play { target: Option<String> },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("ssv: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let grants = Grants::open_default()?;
    let ctx = cli::Ctx {
        folder: config.folder(args.folder.as_deref()),
        config,
        grants,
    };

    match args.command {
        Commands::Grant { path } => cli::grant(&ctx, path.as_deref()),
        Commands::Revoke { path } => cli::revoke(&ctx, &path),
        Commands::Status => cli::status(&ctx),
        Commands::List {
            images,
            videos,
            json,
        } => cli::list(&ctx, cli::Filter::from_flags(images, videos), json),
        Commands::Info { target } => cli::info(&ctx, &target),
        Commands::Save { target, open } => cli::save(&ctx, &target, open),
        Commands::Share { target } => cli::share(&ctx, &target),
        Commands::Play { target } => cli::play(&ctx, target.as_deref()),
    }
}
