//! Game state machine, spawn pacing, and session orchestration for Space Run.
//!
//! A [`Session`] owns one run of an endless-runner game: it walks the
//! lifecycle `NotStarted -> Running -> Ending -> Ended`, decides at a fixed
//! interval whether to spawn an obstacle or a reward, and records the high
//! score when the player dies.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `spacerun-config.yaml` into
//!   strongly-typed structs.
//! - [`factory`] -- [`ObjectFactory`] trait and [`RecordingFactory`].
//! - [`observer`] -- Session event observers and their registry.
//! - [`scheduler`] -- Obstacle/reward pacing rule and roll sources.
//! - [`session`] -- The [`Session`] that ties everything together.
//! - [`state`] -- The lifecycle state machine and score.
//! - [`store`] -- High score and sound preference persistence.
//! - [`timer`] -- [`Timer`] trait with Tokio and manual implementations.
//!
//! [`Session`]: session::Session
//! [`ObjectFactory`]: factory::ObjectFactory
//! [`RecordingFactory`]: factory::RecordingFactory
//! [`Timer`]: timer::Timer

pub mod config;
pub mod factory;
pub mod observer;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod store;
pub mod timer;
