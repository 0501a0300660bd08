//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the headless run.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: spacerun_core::config::ConfigError,
    },

    /// The settings store could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: spacerun_core::store::StoreError,
    },

    /// No runtime was available for the timer.
    #[error("timer error: {source}")]
    Timer {
        /// The underlying timer error.
        #[from]
        source: spacerun_core::timer::TimerError,
    },

    /// A session operation failed.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: spacerun_core::session::SessionError,
    },

    /// Listening for Ctrl-C failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The pilot task panicked or was cancelled.
    #[error("pilot error: {message}")]
    Pilot {
        /// Description of the pilot failure.
        message: String,
    },
}
