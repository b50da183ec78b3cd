/// Cadence daemon - headless playback host
use cadence_core::MetadataLookup;
use cadence_daemon::{Daemon, DaemonConfig};
use cadence_metadata::LoftyMetadataLookup;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence-daemon")]
#[command(about = "Cadence playback control daemon", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured one (RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the playback service, reading commands from stdin (default)
    Run,
    /// Print the effective configuration as TOML
    PrintConfig,
    /// List the configured library with tag metadata
    Tracks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = DaemonConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let default_filter = cli
        .log_filter
        .clone()
        .unwrap_or_else(|| config.logging.filter.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config).await?,
        Commands::PrintConfig => print!("{}", toml::to_string_pretty(&config)?),
        Commands::Tracks => list_tracks(&config).await?,
    }

    Ok(())
}

async fn run(config: &DaemonConfig) -> anyhow::Result<()> {
    let daemon = Daemon::start(config)?;
    tracing::info!("Ready; type 'help' for commands");

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = daemon.run_console(stdin, stdout) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    daemon.shutdown().await?;
    Ok(())
}

async fn list_tracks(config: &DaemonConfig) -> anyhow::Result<()> {
    config.validate()?;
    let lookup = LoftyMetadataLookup::new(config.catalog(), config.metadata.artwork_cache_size);

    for (track_id, path) in config.catalog() {
        match lookup.lookup(track_id).await {
            Ok(info) => println!(
                "{track_id}\t{}\t{}\t{}\t{}",
                info.title.as_deref().unwrap_or("-"),
                info.artist.as_deref().unwrap_or("-"),
                info.album.as_deref().unwrap_or("-"),
                path.display()
            ),
            Err(e) => println!("{track_id}\t<{e}>\t{}", path.display()),
        }
    }

    Ok(())
}
