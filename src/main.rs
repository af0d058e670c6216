mod commands;
mod config;
mod logging;
mod ports;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;
mod tidal_rs;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt},
};
use tokio_util::sync::CancellationToken;

use crate::{config::Config, logging::init_tracing, services::connectors::ConnectorKind};

#[derive(Parser, Debug)]
#[command(author, version, about = "Mirror playlists between streaming services", long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, global = true, env = "PLAYLIST_MIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Console log level or filter directive (default: info)
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Mirror(MirrorCommands),
    /// Manage the config file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum MirrorCommands {
    /// List playlists with their track counts
    Playlists {
        /// The service to list playlists from
        #[arg(short, long, value_enum)]
        from: ConnectorKind,

        /// Only show the playlist with this exact name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Compute the changes needed to mirror one service into another, without applying them
    Plan {
        /// The service to read playlists from
        #[arg(short, long, value_enum)]
        from: ConnectorKind,

        /// The service to mirror into
        #[arg(short, long, value_enum)]
        to: ConnectorKind,

        /// Save the changelog as JSON for a later `apply`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a changelog saved by `plan`
    Apply {
        /// The service the changelog was planned against
        #[arg(short, long, value_enum)]
        to: ConnectorKind,

        /// The changelog file to apply
        #[arg(long)]
        changelog: PathBuf,
    },
    /// Plan and apply in one step
    Sync {
        /// The service to read playlists from
        #[arg(short, long, value_enum)]
        from: ConnectorKind,

        /// The service to mirror into
        #[arg(short, long, value_enum)]
        to: ConnectorKind,

        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Commands::Config(command) => run_config_command(&command, args.config.as_deref()),
        Commands::Mirror(command) => {
            run_mirror_command(command, args.config.as_deref(), &args.log_level).await
        }
    }
}

async fn run_mirror_command(
    command: MirrorCommands,
    config_path: Option<&Path>,
    log_level: &str,
) -> Result<()> {
    let config_path = Config::resolve_path(config_path);
    let config = Config::load(config_path.as_deref())
        .wrap_err("Failed to load playlist-mirror config")?;

    let tracer_provider = init_tracing(log_level, config.telemetry.otlp_endpoint.as_deref())?;
    match &config_path {
        Some(path) => log::debug!("Loaded config from {}", path.display()),
        None => log::debug!("No config file found, using defaults"),
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, stopping before the next request");
                cancel.cancel();
            }
        }
    });

    let result = match command {
        MirrorCommands::Playlists { from, name } => {
            commands::list_playlists(from, name.as_deref(), &config).await
        }
        MirrorCommands::Plan { from, to, output } => {
            commands::plan(from, to, output.as_deref(), &config, cancel).await
        }
        MirrorCommands::Apply { to, changelog } => {
            commands::apply(to, &changelog, &config, cancel).await
        }
        MirrorCommands::Sync { from, to, dry_run } => {
            commands::sync(from, to, dry_run, &config, cancel).await
        }
    };

    if let Some(provider) = tracer_provider
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Failed to shut down tracer provider: {}", e);
    }

    result
}

fn run_config_command(command: &ConfigCommands, path: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommands::CreateDefault => {
            let path = path
                .map(|p| p.to_path_buf())
                .or_else(Config::config_path)
                .ok_or_eyre("No default config path found")?;
            if Config::create_default_at(&path)? {
                println!("Created default config at {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
        }
        ConfigCommands::Path => match path.map(|p| p.to_path_buf()).or_else(Config::config_path) {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        },
    }
    Ok(())
}
