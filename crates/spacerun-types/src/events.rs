//! Events a session publishes to its observers.
//!
//! These are the only things the presentation side ever learns about a
//! session. They carry plain data so they can be forwarded over a channel
//! or serialized for a front end without touching session internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{HighScoreLabel, SpawnDecision};
use crate::ids::SessionId;

/// World-space position where the object factory places new entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpawnPoint {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

/// Result of a finished run, computed once when the game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EndSummary {
    /// Score at the moment the game ended.
    pub final_score: u32,
    /// Best score known after this run: the stored best combined with this
    /// run's score. `None` when the stored best could not be read.
    pub best_score: Option<u32>,
    /// Label for the end panel.
    pub label: HighScoreLabel,
    /// Sound preference, so the end panel can show the right toggle state.
    pub sound_enabled: bool,
    /// Wall-clock time the game ended.
    pub ended_at: DateTime<Utc>,
}

/// Lifecycle and gameplay notifications emitted by a session.
///
/// Each event is dispatched exactly once to every registered observer, in
/// the order the session produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SessionEvent {
    /// The intro sequence began; the game starts when it completes.
    IntroStarted {
        /// The session that is starting.
        session_id: SessionId,
        /// Length of the intro in milliseconds.
        duration_ms: u64,
    },
    /// The run is live and spawning has begun.
    GameStarted {
        /// The session that started.
        session_id: SessionId,
        /// Wall-clock start time.
        started_at: DateTime<Utc>,
    },
    /// The score changed.
    ScoreChanged {
        /// The new score.
        score: u32,
    },
    /// The scheduler asked the object factory for a new entity.
    SpawnRequested {
        /// What was requested.
        decision: SpawnDecision,
        /// 1-based index of the spawn tick within this run.
        tick: u64,
        /// Where the entity is placed.
        point: SpawnPoint,
    },
    /// The player died and the score is frozen.
    GameEnded {
        /// The session that ended.
        session_id: SessionId,
        /// Final score and high-score outcome.
        summary: EndSummary,
    },
    /// The end panel was revealed after the post-death delay.
    EndPanelRevealed {
        /// The session whose end panel was revealed.
        session_id: SessionId,
    },
    /// The sound preference was flipped.
    SoundToggled {
        /// The new preference.
        enabled: bool,
    },
    /// The session was reloaded and is back before the intro.
    SessionReset {
        /// Identifier of the fresh run.
        session_id: SessionId,
    },
}

impl SessionEvent {
    /// Short event name, as used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IntroStarted { .. } => "intro_started",
            Self::GameStarted { .. } => "game_started",
            Self::ScoreChanged { .. } => "score_changed",
            Self::SpawnRequested { .. } => "spawn_requested",
            Self::GameEnded { .. } => "game_ended",
            Self::EndPanelRevealed { .. } => "end_panel_revealed",
            Self::SoundToggled { .. } => "sound_toggled",
            Self::SessionReset { .. } => "session_reset",
        }
    }
}
