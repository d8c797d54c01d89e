/// Command implementations
use anyhow::{bail, Context, Result};
use encore_core::{achievements, selectors, Achievement, ChallengeId};
use encore_playback::{SimulatedBackend, SyncEngine, SyncEvent};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{load_with_progress, open_progress_store};
use crate::config::AppConfig;

/// Wall-clock slack added to the default listen window
const LISTEN_GRACE: Duration = Duration::from_secs(2);

/// Print every challenge card
pub async fn list(config: &AppConfig) -> Result<()> {
    let progress_store = open_progress_store(config).await?;
    let catalog = load_with_progress(config, progress_store.as_ref()).await?;

    println!("Challenges:");
    for card in selectors::select_cards(&catalog, None) {
        println!(
            "  [{}] {} - {} ({}, {}, {} pts) {:>3}%  {}",
            card.id,
            card.title,
            card.artist,
            card.difficulty,
            card.duration,
            card.points,
            card.progress_percent,
            card.action.label()
        );
    }

    Ok(())
}

/// Aggregates shown by `encore stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_points: u64,
    pub completed: usize,
    pub total_challenges: usize,
    pub completion_rate: f64,
    pub achievements: Vec<Achievement>,
}

/// Compute the statistics report
pub async fn stats(config: &AppConfig) -> Result<StatsReport> {
    let progress_store = open_progress_store(config).await?;
    let catalog = load_with_progress(config, progress_store.as_ref()).await?;
    let stats = selectors::select_user_stats(&catalog);

    Ok(StatsReport {
        total_points: stats.total_points,
        completed: stats.completed_count(),
        total_challenges: stats.total_challenges,
        completion_rate: stats.completion_rate(),
        achievements: achievements::evaluate(&stats).unlocked.into_iter().collect(),
    })
}

pub fn print_stats(report: &StatsReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Total points:    {}", report.total_points);
    println!(
        "Completed:       {}/{}",
        report.completed, report.total_challenges
    );
    println!("Completion rate: {:.0}%", report.completion_rate);

    println!("Achievements:");
    if report.achievements.is_empty() {
        println!("  {}", achievements::EMPTY_STATE_HINT);
    }
    for achievement in &report.achievements {
        println!("  {} {}", achievement.icon(), achievement.title());
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayOptions {
    /// Seek here once playback starts
    pub from_seconds: Option<f64>,
    /// Wall-clock listening time; defaults to the rest of the track
    pub listen: Option<Duration>,
}

/// Result of a `play` run
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOutcome {
    pub challenge_id: ChallengeId,
    pub progress: f64,
    pub completed: bool,
    /// Points awarded during this run, if the challenge completed in it
    pub points_awarded: Option<u32>,
}

/// Play a challenge on the simulated backend until it completes or the
/// listening window closes
pub async fn play(config: &AppConfig, challenge_id: &str, options: PlayOptions) -> Result<PlayOutcome> {
    let progress_store = open_progress_store(config).await?;
    let catalog = load_with_progress(config, progress_store.as_ref()).await?;

    let Some(challenge) = catalog.get(challenge_id).cloned() else {
        bail!("Unknown challenge '{challenge_id}' (run `encore list` to see the catalog)");
    };
    if challenge.completed {
        println!("'{}' is already completed; no further points can be earned", challenge.title);
    }

    let speed = config.simulation.speed;
    let engine = SyncEngine::bootstrap(
        SimulatedBackend::with_speed(speed),
        catalog,
        progress_store,
        config.engine.clone(),
    )
    .await
    .context("Failed to start playback engine")?;

    let store = engine.store();
    let mut events = engine.subscribe();
    let (handle, task) = engine.spawn();

    println!("▶ {} - {}", challenge.title, challenge.artist);
    handle
        .play(challenge.id.clone())
        .await
        .with_context(|| format!("Failed to play '{}'", challenge.title))?;

    let start = options.from_seconds.unwrap_or(0.0);
    if start > 0.0 {
        let position = handle.seek(start).await.context("Failed to seek")?;
        info!(position, "Seeked");
    }

    let listen = options.listen.unwrap_or_else(|| {
        let remaining = (challenge.duration_seconds - start).max(0.0) / speed;
        Duration::from_secs_f64(remaining) + LISTEN_GRACE
    });
    let deadline = Instant::now() + listen;
    let mut points_awarded = None;

    loop {
        let event = match tokio::time::timeout_at(deadline, events.recv()).await {
            Err(_) => break,
            Ok(Ok(event)) => event,
            Ok(Err(RecvError::Lagged(skipped))) => {
                warn!(skipped, "Event stream lagged");
                continue;
            }
            Ok(Err(RecvError::Closed)) => break,
        };

        match event {
            SyncEvent::ProgressUpdated {
                challenge_id,
                progress,
            } if challenge_id == challenge.id => {
                println!("  {progress:>5.1}%");
            }
            SyncEvent::ChallengeCompleted {
                challenge_id,
                points_awarded: points,
            } if challenge_id == challenge.id => {
                println!("✓ Challenge completed! +{points} points");
                points_awarded = Some(points);
                break;
            }
            SyncEvent::StateChanged { state } => debug!(%state, "Session state changed"),
            SyncEvent::Error { report } => {
                eprintln!("error [{}]: {}", report.code, report.message);
            }
            _ => {}
        }
    }

    if points_awarded.is_none() {
        if let Err(e) = handle.pause().await {
            debug!(error = %e, "Pause after listening window");
        }
    }

    drop(handle);
    task.await.context("Playback engine task failed")?;

    let record = store
        .challenge(challenge.id.as_str())
        .map(|c| c.progress_record())
        .unwrap_or_default();

    Ok(PlayOutcome {
        challenge_id: challenge.id,
        progress: record.progress,
        completed: record.completed,
        points_awarded,
    })
}
