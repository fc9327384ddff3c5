//! # N-Back Core
//!
//! The adaptive progression engine. This crate scores completed sessions with
//! `nback_rules`, moves the player's level and in-level progress, and hands the
//! next session's settings to the caller's collaborators.
//!
//! ## Core Components
//!
//! - **progression**: Banded d′ controller with level-up/level-down transitions
//! - **analytics**: Persists scored sessions and keeps a recent-activity summary
//! - **store**: Async seams for game history and settings, plus in-memory versions
//! - **config**: Band table and thresholds, loadable from TOML
//!
//! ## Design Philosophy
//!
//! - **Explicit I/O**: Settings come in by value, results go out through injected sinks
//! - **Fail loudly**: Collaborator errors propagate; nothing is retried or swallowed
//! - **Pure core**: Scoring and transitions can be evaluated without any store

pub mod analytics;
pub mod config;
pub mod error;
pub mod progression;
pub mod store;

pub use analytics::*;
pub use config::*;
pub use error::*;
pub use progression::*;
pub use store::*;
