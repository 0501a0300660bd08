//! Game lifecycle state machine.
//!
//! [`GameState`] owns the phase, the score, and the finished flag. Every
//! mutation is a checked transition: calling an operation from the wrong
//! phase returns a [`StateError`] and leaves the state untouched.
//!
//! ```text
//! NotStarted --start--> Running --end--> Ending --reveal--> Ended
//! ```
//!
//! The score can only change in `Running`. Once `end` has succeeded the
//! score is frozen for the rest of the session.

use spacerun_types::Phase;

/// Errors raised by out-of-order lifecycle calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A lifecycle transition was requested from the wrong phase.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Phase the state machine was in.
        from: Phase,
        /// Phase that was requested.
        to: Phase,
    },

    /// The score was mutated outside of `Running`.
    #[error("cannot {operation} while {phase}")]
    InvalidState {
        /// Phase the state machine was in.
        phase: Phase,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The score cannot grow any further.
    #[error("score counter overflow")]
    ScoreOverflow,
}

/// Lifecycle state of one game session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameState {
    phase: Phase,
    score: u32,
    finished: bool,
}

impl GameState {
    /// Create a fresh state at [`Phase::NotStarted`] with a zero score.
    pub const fn new() -> Self {
        Self {
            phase: Phase::NotStarted,
            score: 0,
            finished: false,
        }
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Current score.
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Whether the game has ended. True exactly in `Ending` and `Ended`.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the run is live.
    pub const fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    /// `NotStarted -> Running`. Resets the score and the finished flag.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidTransition`] from any other phase.
    pub fn start(&mut self) -> Result<(), StateError> {
        self.transition(Phase::NotStarted, Phase::Running)?;
        self.score = 0;
        self.finished = false;
        Ok(())
    }

    /// `Running -> Ending`. Freezes the score and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidTransition`] from any other phase,
    /// including a second call after the game already ended.
    pub fn end(&mut self) -> Result<u32, StateError> {
        self.transition(Phase::Running, Phase::Ending)?;
        self.finished = true;
        Ok(self.score)
    }

    /// `Ending -> Ended`, once the end panel is on screen.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidTransition`] from any other phase.
    pub fn reveal(&mut self) -> Result<(), StateError> {
        self.transition(Phase::Ending, Phase::Ended)
    }

    /// Add one point. Returns the new score.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidState`] outside of `Running`, or
    /// [`StateError::ScoreOverflow`] at `u32::MAX`.
    pub fn increment_score(&mut self) -> Result<u32, StateError> {
        if !self.phase.is_running() || self.finished {
            return Err(StateError::InvalidState {
                phase: self.phase,
                operation: "increment score",
            });
        }
        self.score = self.score.checked_add(1).ok_or(StateError::ScoreOverflow)?;
        Ok(self.score)
    }

    fn transition(&mut self, expected: Phase, to: Phase) -> Result<(), StateError> {
        if self.phase != expected {
            return Err(StateError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }
}
