//! Headless auto-pilot.
//!
//! Consumes session events from a channel, logs them, and collects every
//! reward the scheduler spawns by calling [`Session::increment_score`]. It
//! runs on its own task, outside the session lock, so it is free to call
//! back into the session. The pilot finishes once the end panel has been
//! revealed or the event channel closes.

use std::sync::Arc;

use spacerun_core::session::Session;
use spacerun_types::{EndSummary, SessionEvent, SpawnDecision};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// What the pilot saw during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PilotReport {
    /// Rewards the pilot collected.
    pub rewards_collected: u32,
    /// Spawn requests observed.
    pub spawns_seen: u64,
    /// Summary from the `GameEnded` event, if the game ended.
    pub summary: Option<EndSummary>,
    /// Whether the end panel was revealed.
    pub revealed: bool,
}

/// Drive `session` from its event stream until the end panel is revealed.
pub async fn fly(
    session: Arc<Session>,
    mut events: UnboundedReceiver<SessionEvent>,
) -> PilotReport {
    let mut report = PilotReport::default();

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::IntroStarted {
                session_id,
                duration_ms,
            } => {
                info!(%session_id, duration_ms, "Intro playing");
            }
            SessionEvent::GameStarted { session_id, .. } => {
                info!(%session_id, "Game running");
            }
            SessionEvent::SpawnRequested { decision, tick, .. } => {
                report.spawns_seen = report.spawns_seen.saturating_add(1);
                if decision == SpawnDecision::Reward {
                    match session.increment_score() {
                        Ok(score) => {
                            report.rewards_collected =
                                report.rewards_collected.saturating_add(1);
                            debug!(tick, score, "Reward collected");
                        }
                        Err(e) => debug!(tick, error = %e, "Reward missed"),
                    }
                }
            }
            SessionEvent::ScoreChanged { score } => {
                debug!(score, "Score changed");
            }
            SessionEvent::GameEnded { summary, .. } => {
                info!(
                    final_score = summary.final_score,
                    label = %summary.label,
                    "Player down"
                );
                report.summary = Some(summary);
            }
            SessionEvent::EndPanelRevealed { session_id } => {
                info!(%session_id, "End panel shown");
                report.revealed = true;
                break;
            }
            SessionEvent::SoundToggled { enabled } => {
                info!(enabled, "Sound preference changed");
            }
            SessionEvent::SessionReset { session_id } => {
                info!(%session_id, "Session reset");
                report = PilotReport::default();
            }
        }
    }

    report
}
