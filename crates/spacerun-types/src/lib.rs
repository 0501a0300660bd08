//! Shared type definitions for the Space Run session controller.
//!
//! This crate is the single source of truth for the data that crosses the
//! boundary between a game session and its collaborators (object factory,
//! presentation, persistence). Types flow downstream to `TypeScript` via
//! `ts-rs` so a web front end can render session events directly.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for session identifiers
//! - [`enums`] -- Lifecycle phase, spawn decision, and high-score label
//! - [`events`] -- Session events, end summary, and spawn point

pub mod enums;
pub mod events;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use enums::{HighScoreLabel, Phase, SpawnDecision};
pub use events::{EndSummary, SessionEvent, SpawnPoint};
pub use ids::SessionId;

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are exported. The files are written to the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::SessionId::export_all();
        let _ = crate::enums::Phase::export_all();
        let _ = crate::enums::SpawnDecision::export_all();
        let _ = crate::enums::HighScoreLabel::export_all();
        let _ = crate::events::SpawnPoint::export_all();
        let _ = crate::events::EndSummary::export_all();
        let _ = crate::events::SessionEvent::export_all();
    }
}
