//! Headless engine binary for Space Run.
//!
//! Wires a session to real time, a JSON settings file, a logging object
//! factory, and an auto-pilot that collects every reward. The run ends
//! with a simulated death on Ctrl-C or after `engine.max_run_ms`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `spacerun-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Open the settings store
//! 4. Build the session (timer, rolls, factory)
//! 5. Start the pilot and play the intro
//! 6. Wait for Ctrl-C or the run limit, then end the game
//! 7. Wait for the end panel and log the result

mod error;
mod factory;
mod pilot;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use spacerun_core::config::{LogFormat, LoggingConfig, SessionConfig};
use spacerun_core::observer::ChannelObserver;
use spacerun_core::scheduler::rolls_from_config;
use spacerun_core::session::{Session, SessionParts};
use spacerun_core::store::FileStore;
use spacerun_core::timer::TokioTimer;
use spacerun_types::Phase;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::factory::LoggingFactory;

/// Config file looked up in the working directory.
const CONFIG_FILE: &str = "spacerun-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the run itself fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so this comes first.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("spacerun-engine starting");
    if !from_file {
        info!("Config file not found, using defaults");
    }
    info!(
        spawn_interval_ms = config.pacing.spawn_interval_ms,
        reward_force_threshold = config.pacing.reward_force_threshold,
        reward_roll_denominator = config.pacing.reward_roll_denominator,
        seed = ?config.pacing.seed,
        max_run_ms = config.engine.max_run_ms,
        "Configuration loaded"
    );

    // 3. Open the settings store.
    let store = FileStore::open(&config.storage.path).map_err(EngineError::from)?;
    info!(
        path = %store.path().display(),
        high_score = ?store.settings().high_score,
        "Settings store opened"
    );

    // 4. Build the session.
    let timer = TokioTimer::current().map_err(EngineError::from)?;
    let session = Session::new(
        &config,
        SessionParts {
            timer: Arc::new(timer),
            factory: Box::new(LoggingFactory::new()),
            store: Box::new(store),
            rolls: rolls_from_config(&config.pacing),
        },
    )
    .map_err(EngineError::from)?;

    // 5. Start the pilot and play the intro.
    let (observer, events) = ChannelObserver::channel();
    let _ = session.subscribe(Box::new(observer));
    let pilot = tokio::spawn(pilot::fly(Arc::clone(&session), events));
    session.play_intro().map_err(EngineError::from)?;

    // 6. Wait for Ctrl-C or the run limit.
    wait_for_death(&config).await?;
    if session.phase() != Phase::Running {
        warn!(phase = %session.phase(), "Game was not running, nothing to end");
        pilot.abort();
        return Ok(());
    }
    let summary = session.end_game().map_err(EngineError::from)?;

    // 7. Wait for the end panel.
    let report = pilot.await.map_err(|e| EngineError::Pilot {
        message: format!("{e}"),
    })?;

    info!(
        session_id = %session.id(),
        final_score = summary.final_score,
        best_score = ?summary.best_score,
        label = %summary.label,
        spawn_ticks = session.spawn_ticks(),
        spawns_seen = report.spawns_seen,
        rewards_collected = report.rewards_collected,
        pilot_saw_end = report.summary.is_some(),
        revealed = report.revealed,
        "spacerun-engine shutdown complete"
    );

    Ok(())
}

/// Load the session configuration from `spacerun-config.yaml`.
///
/// Returns the config and whether it came from a file. Environment
/// overrides apply in both cases.
fn load_config() -> Result<(SessionConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok((SessionConfig::from_file(config_path)?, true))
    } else {
        let mut config = SessionConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Resolve when the player should die: on Ctrl-C, or once the intro plus
/// `engine.max_run_ms` has elapsed when a limit is set.
async fn wait_for_death(config: &SessionConfig) -> Result<(), EngineError> {
    let limit = config.engine.max_run_ms;
    if limit == 0 {
        info!("Running until Ctrl-C");
        return tokio::signal::ctrl_c()
            .await
            .map_err(|source| EngineError::Signal { source });
    }

    let deadline = config
        .timing
        .start_animation()
        .saturating_add(Duration::from_millis(limit));
    info!(max_run_ms = limit, "Running until Ctrl-C or run limit");
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|source| EngineError::Signal { source })?;
            info!("Ctrl-C received");
        }
        () = tokio::time::sleep(deadline) => {
            info!("Run limit reached");
        }
    }
    Ok(())
}
