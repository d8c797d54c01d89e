/// Encore - music challenge player
use anyhow::Context;
use clap::{Parser, Subcommand};
use encore_cli::{commands, AppConfig, PlayOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Play music challenges and track your progress", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all challenges with their progress
    List,
    /// Show points, completion rate and achievements
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play a challenge until it completes
    Play {
        /// Challenge id
        id: String,
        /// Start playback at this position (seconds)
        #[arg(long)]
        from: Option<f64>,
        /// Stop after this many wall-clock seconds
        #[arg(long)]
        listen: Option<f64>,
        /// Override the simulated playback speed
        #[arg(long)]
        speed: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::List => {
            commands::list(&config).await?;
        }
        Commands::Stats { json } => {
            let report = commands::stats(&config).await?;
            commands::print_stats(&report, json)?;
        }
        Commands::Play {
            id,
            from,
            listen,
            speed,
        } => {
            if let Some(speed) = speed {
                config.simulation.speed = speed;
                config.validate()?;
            }

            let listen = listen
                .map(|secs| {
                    Duration::try_from_secs_f64(secs)
                        .with_context(|| format!("Invalid listen duration {secs}"))
                })
                .transpose()?;

            let outcome = commands::play(
                &config,
                &id,
                PlayOptions {
                    from_seconds: from,
                    listen,
                },
            )
            .await?;

            if !outcome.completed {
                println!(
                    "Stopped at {:.0}%; run `encore play {}` again to keep going",
                    outcome.progress, outcome.challenge_id
                );
            }
        }
    }

    Ok(())
}
