//! Enumeration types for the Space Run session controller.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of a game session.
///
/// Phases only ever move forward:
/// `NotStarted -> Running -> Ending -> Ended`. A reload builds a fresh
/// session state back at `NotStarted`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// The intro is playing (or has not begun); nothing spawns yet.
    #[default]
    NotStarted,
    /// The run is live: spawning is active and the score may change.
    Running,
    /// The player died; the score is frozen and the end panel is pending.
    Ending,
    /// The end panel has been revealed.
    Ended,
}

impl Phase {
    /// Whether the game has finished (the score is frozen).
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Ending | Self::Ended)
    }

    /// Whether the run is live.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// Short lowercase name, as used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Ending => "ending",
            Self::Ended => "ended",
        }
    }
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// What the spawn scheduler asks the object factory to create on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SpawnDecision {
    /// An obstacle the player has to dodge.
    Obstacle,
    /// A score pickup.
    Reward,
}

impl SpawnDecision {
    /// Whether this decision is a reward.
    pub const fn is_reward(self) -> bool {
        matches!(self, Self::Reward)
    }
}

// ---------------------------------------------------------------------------
// High score
// ---------------------------------------------------------------------------

/// Label shown next to the final score on the end panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum HighScoreLabel {
    /// The final score beat the stored best.
    NewBest,
    /// The stored best still stands.
    Best {
        /// The best score on record.
        score: u32,
    },
    /// The stored best could not be read, so the run cannot be ranked.
    Unavailable,
}

impl HighScoreLabel {
    /// Pick the label for a finished run given the best score before it.
    pub const fn for_result(final_score: u32, previous_best: u32) -> Self {
        if final_score > previous_best {
            Self::NewBest
        } else {
            Self::Best {
                score: previous_best,
            }
        }
    }
}

impl core::fmt::Display for HighScoreLabel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NewBest => f.write_str("NEW BEST"),
            Self::Best { score } => write!(f, "BEST {score}"),
            Self::Unavailable => f.write_str("BEST ?"),
        }
    }
}
