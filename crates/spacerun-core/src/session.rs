//! Game session orchestration.
//!
//! A [`Session`] owns one run of the game: the lifecycle state machine, the
//! spawn scheduler, and handles to its collaborators (timer, object factory,
//! settings store, observers). It is created once per run and shared as an
//! `Arc<Session>`; there is no global instance.
//!
//! # Lifecycle
//!
//! ```text
//! play_intro --(start animation)--> start_game --every interval--> spawn tick
//!                                        |
//!                               end_game (player died)
//!                                        |
//!                          --(reveal delay)--> end panel revealed
//! ```
//!
//! # Ordering
//!
//! All state lives behind one mutex. Spawn ticks, score changes, and the end
//! of the game are serialized through it, and every tick re-checks the
//! running predicate once it holds the lock. Once [`Session::end_game`] has
//! returned, no spawn decision can be emitted for that run, even if a tick
//! was already queued or executing.
//!
//! Timer callbacks are tagged with the run generation they were scheduled
//! in, so callbacks from before a [`Session::reload`] are ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use spacerun_types::{
    EndSummary, HighScoreLabel, Phase, SessionEvent, SessionId, SpawnDecision, SpawnPoint,
};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SessionConfig};
use crate::factory::ObjectFactory;
use crate::observer::{ObserverId, ObserverRegistry, SessionObserver};
use crate::scheduler::{PacingRule, RollSource, SpawnScheduler};
use crate::state::{GameState, StateError};
use crate::store::{SettingsStore, StoreError};
use crate::timer::{Timer, TimerHandle};

/// Errors returned by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A lifecycle or score operation was called in the wrong phase.
    #[error("state error: {source}")]
    State {
        /// The underlying state machine error.
        #[from]
        source: StateError,
    },

    /// The session configuration is unusable.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The settings store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The intro is already playing.
    #[error("intro already playing")]
    IntroAlreadyPlaying,
}

/// Collaborators a session is built from.
pub struct SessionParts {
    /// Scheduling capability for the intro, spawn ticks, and reveal.
    pub timer: Arc<dyn Timer>,
    /// Receives every spawn decision.
    pub factory: Box<dyn ObjectFactory>,
    /// High score and sound preference persistence.
    pub store: Box<dyn SettingsStore>,
    /// Die rolls for the pacing rule.
    pub rolls: Box<dyn RollSource>,
}

struct SessionInner {
    id: SessionId,
    generation: u64,
    state: GameState,
    scheduler: SpawnScheduler,
    rolls: Box<dyn RollSource>,
    factory: Box<dyn ObjectFactory>,
    store: Box<dyn SettingsStore>,
    observers: ObserverRegistry,
    intro: Option<TimerHandle>,
    spawner: Option<TimerHandle>,
    reveal: Option<TimerHandle>,
    summary: Option<EndSummary>,
}

impl SessionInner {
    fn emit(&mut self, event: &SessionEvent) {
        self.observers.dispatch(event);
    }

    fn cancel_timers(&mut self) {
        for handle in [self.intro.take(), self.spawner.take(), self.reveal.take()]
            .into_iter()
            .flatten()
        {
            handle.cancel();
        }
    }
}

/// One run of the game.
pub struct Session {
    me: Weak<Self>,
    timer: Arc<dyn Timer>,
    spawn_interval: Duration,
    start_animation: Duration,
    end_reveal_delay: Duration,
    spawn_point: SpawnPoint,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Build a session from configuration and collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the configuration fails
    /// validation.
    pub fn new(config: &SessionConfig, parts: SessionParts) -> Result<Arc<Self>, SessionError> {
        config.validate()?;
        let rule = PacingRule::from_config(&config.pacing);
        let id = SessionId::new();

        info!(
            session_id = %id,
            spawn_interval_ms = config.pacing.spawn_interval_ms,
            reward_force_threshold = rule.reward_force_threshold,
            reward_roll_denominator = rule.reward_roll_denominator,
            "Session created"
        );

        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            timer: parts.timer,
            spawn_interval: config.pacing.spawn_interval(),
            start_animation: config.timing.start_animation(),
            end_reveal_delay: config.timing.end_reveal_delay(),
            spawn_point: config.spawn.point,
            inner: Mutex::new(SessionInner {
                id,
                generation: 0,
                state: GameState::new(),
                scheduler: SpawnScheduler::new(rule),
                rolls: parts.rolls,
                factory: parts.factory,
                store: parts.store,
                observers: ObserverRegistry::new(),
                intro: None,
                spawner: None,
                reveal: None,
                summary: None,
            }),
        }))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Identifier of the current run.
    pub fn id(&self) -> SessionId {
        self.lock().id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.lock().state.phase()
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.lock().state.score()
    }

    /// Whether the game has ended.
    pub fn is_finished(&self) -> bool {
        self.lock().state.is_finished()
    }

    /// Consecutive obstacles since the last reward.
    pub fn obstacle_streak(&self) -> u32 {
        self.lock().scheduler.obstacle_streak()
    }

    /// Spawn decisions made in the current run.
    pub fn spawn_ticks(&self) -> u64 {
        self.lock().scheduler.ticks()
    }

    /// Summary of the ended run, if the game has ended.
    pub fn end_summary(&self) -> Option<EndSummary> {
        self.lock().summary.clone()
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Register an observer for session events.
    ///
    /// Observers run with the session locked and must not call back into it.
    pub fn subscribe(&self, observer: Box<dyn SessionObserver>) -> ObserverId {
        self.lock().observers.subscribe(observer)
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.lock().observers.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin the intro; the game starts when it completes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::State`] if the game already started, or
    /// [`SessionError::IntroAlreadyPlaying`] if the intro is in progress.
    pub fn play_intro(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        let phase = inner.state.phase();
        if phase != Phase::NotStarted {
            return Err(StateError::InvalidTransition {
                from: phase,
                to: Phase::Running,
            }
            .into());
        }
        if inner.intro.is_some() {
            return Err(SessionError::IntroAlreadyPlaying);
        }

        let generation = inner.generation;
        let me = self.me.clone();
        let handle = self.timer.after(
            self.start_animation,
            Box::new(move || {
                if let Some(session) = me.upgrade() {
                    session.on_intro_complete(generation);
                }
            }),
        );
        inner.intro = Some(handle);

        let session_id = inner.id;
        inner.emit(&SessionEvent::IntroStarted {
            session_id,
            duration_ms: millis(self.start_animation),
        });
        info!(session_id = %session_id, "Intro started");
        Ok(())
    }

    /// `NotStarted -> Running`: start the run and the spawn scheduler.
    ///
    /// The first spawn decision is made immediately, then one every spawn
    /// interval until the game ends.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::State`] if the game is not in `NotStarted`.
    pub fn start_game(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        self.start_locked(&mut inner)
    }

    /// Run one spawn tick now.
    ///
    /// Returns the decision, or `None` if the game is not running (in which
    /// case the periodic spawner is cancelled).
    pub fn spawn_tick(&self) -> Option<SpawnDecision> {
        let mut inner = self.lock();
        self.tick_locked(&mut inner)
    }

    /// Add one point for a collected reward.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::State`] outside of `Running`; the score is
    /// left untouched.
    pub fn increment_score(&self) -> Result<u32, SessionError> {
        let mut inner = self.lock();
        let score = inner.state.increment_score().inspect_err(|e| {
            debug!(error = %e, "score change rejected");
        })?;
        inner.emit(&SessionEvent::ScoreChanged { score });
        Ok(score)
    }

    /// `Running -> Ending`: the player died.
    ///
    /// Stops the spawn scheduler, freezes the score, updates the high score
    /// if it was beaten, and schedules the end panel reveal. The stored high
    /// score is read once and written at most once.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::State`] if the game is not running, including
    /// a second call after it already ended. Nothing is changed in that case.
    pub fn end_game(&self) -> Result<EndSummary, SessionError> {
        let mut inner = self.lock();
        let final_score = inner.state.end()?;
        if let Some(spawner) = inner.spawner.take() {
            spawner.cancel();
        }

        // An unreadable record is never overwritten and the run is not ranked.
        let (label, best_score) = match inner.store.high_score() {
            Ok(previous_best) => {
                if final_score > previous_best {
                    if let Err(e) = inner.store.set_high_score(final_score) {
                        warn!(error = %e, final_score, "failed to persist new high score");
                    }
                }
                (
                    HighScoreLabel::for_result(final_score, previous_best),
                    Some(previous_best.max(final_score)),
                )
            }
            Err(e) => {
                warn!(error = %e, "failed to read high score, not updating it");
                (HighScoreLabel::Unavailable, None)
            }
        };
        let sound_enabled = inner.store.sound_enabled().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read sound preference, assuming on");
            true
        });

        let summary = EndSummary {
            final_score,
            best_score,
            label,
            sound_enabled,
            ended_at: Utc::now(),
        };
        inner.summary = Some(summary.clone());

        let session_id = inner.id;
        inner.emit(&SessionEvent::GameEnded {
            session_id,
            summary: summary.clone(),
        });
        info!(
            session_id = %session_id,
            final_score,
            best_score = ?summary.best_score,
            label = %summary.label,
            spawn_ticks = inner.scheduler.ticks(),
            "Game ended"
        );

        let generation = inner.generation;
        let me = self.me.clone();
        let handle = self.timer.after(
            self.end_reveal_delay,
            Box::new(move || {
                if let Some(session) = me.upgrade() {
                    session.on_reveal_due(generation);
                }
            }),
        );
        inner.reveal = Some(handle);

        Ok(summary)
    }

    /// `Ending -> Ended`: show the end panel.
    ///
    /// Normally called by the reveal timer scheduled in
    /// [`end_game`](Self::end_game).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::State`] if the game is not in `Ending`.
    pub fn reveal_end_panel(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        Self::reveal_locked(&mut inner)
    }

    /// Flip the stored sound preference. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the preference cannot be read or
    /// written.
    pub fn toggle_sound(&self) -> Result<bool, SessionError> {
        let mut inner = self.lock();
        let enabled = !inner.store.sound_enabled()?;
        inner.store.set_sound_enabled(enabled)?;
        inner.emit(&SessionEvent::SoundToggled { enabled });
        info!(enabled, "Sound toggled");
        Ok(enabled)
    }

    /// Reset to a fresh run before the intro. Returns the new run id.
    ///
    /// Cancels every pending timer; callbacks scheduled before the reload
    /// never affect the new run.
    pub fn reload(&self) -> SessionId {
        let mut inner = self.lock();
        inner.cancel_timers();
        inner.generation = inner.generation.saturating_add(1);
        inner.state = GameState::new();
        inner.scheduler.reset();
        inner.summary = None;
        inner.id = SessionId::new();

        let session_id = inner.id;
        inner.emit(&SessionEvent::SessionReset { session_id });
        info!(session_id = %session_id, "Session reloaded");
        session_id
    }

    // -----------------------------------------------------------------------
    // Timer callbacks
    // -----------------------------------------------------------------------

    fn on_intro_complete(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        if let Err(e) = self.start_locked(&mut inner) {
            debug!(error = %e, "intro completed but game did not start");
        }
    }

    fn on_spawn_timer(&self, generation: u64) -> Option<SpawnDecision> {
        let mut inner = self.lock();
        if inner.generation != generation {
            return None;
        }
        self.tick_locked(&mut inner)
    }

    fn on_reveal_due(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        if let Err(e) = Self::reveal_locked(&mut inner) {
            debug!(error = %e, "end panel reveal skipped");
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn start_locked(&self, inner: &mut SessionInner) -> Result<(), SessionError> {
        inner.state.start()?;
        if let Some(intro) = inner.intro.take() {
            intro.cancel();
        }
        inner.scheduler.reset();

        let session_id = inner.id;
        inner.emit(&SessionEvent::GameStarted {
            session_id,
            started_at: Utc::now(),
        });
        info!(
            session_id = %session_id,
            spawn_interval_ms = millis(self.spawn_interval),
            "Game started"
        );

        let _ = self.spawn_locked(inner);

        let generation = inner.generation;
        let me = self.me.clone();
        let handle = self.timer.every(
            self.spawn_interval,
            Box::new(move || {
                if let Some(session) = me.upgrade() {
                    let _ = session.on_spawn_timer(generation);
                }
            }),
        );
        inner.spawner = Some(handle);
        Ok(())
    }

    fn tick_locked(&self, inner: &mut SessionInner) -> Option<SpawnDecision> {
        if !inner.state.is_running() {
            if let Some(spawner) = inner.spawner.take() {
                spawner.cancel();
            }
            debug!(phase = %inner.state.phase(), "spawn tick skipped");
            return None;
        }
        Some(self.spawn_locked(inner))
    }

    fn spawn_locked(&self, inner: &mut SessionInner) -> SpawnDecision {
        let SessionInner {
            scheduler,
            rolls,
            factory,
            observers,
            ..
        } = inner;

        let decision = scheduler.decide(rolls.as_mut());
        factory.spawn(decision, self.spawn_point);

        let tick = scheduler.ticks();
        debug!(
            tick,
            ?decision,
            obstacle_streak = scheduler.obstacle_streak(),
            "Spawn requested"
        );
        observers.dispatch(&SessionEvent::SpawnRequested {
            decision,
            tick,
            point: self.spawn_point,
        });
        decision
    }

    fn reveal_locked(inner: &mut SessionInner) -> Result<(), SessionError> {
        inner.state.reveal()?;
        inner.reveal = None;
        let session_id = inner.id;
        inner.emit(&SessionEvent::EndPanelRevealed { session_id });
        info!(session_id = %session_id, "End panel revealed");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_timers();
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
