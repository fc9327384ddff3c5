//! # N-Back Rules
//!
//! Pure domain crate for the adaptive n-back trainer: trial records, signal-detection
//! scoring, difficulty curves and the game history model.
//! This crate does no I/O; the progression engine lives in `nback_core`.

pub mod detection;
pub mod difficulty;
pub mod game;
pub mod trials;

pub use detection::*;
pub use difficulty::*;
pub use game::*;
pub use trials::*;
