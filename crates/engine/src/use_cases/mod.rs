//! Use cases - Game story orchestration.
//!
//! `generate_chapter` owns the storyteller contract: prompt building,
//! reply validation, and error classification. `play_session` drives a
//! session through its phases and guards against stale results.

pub mod generate_chapter;
pub mod play_session;

// Re-export main types
pub use generate_chapter::{ChapterGenerator, ChapterRequest, GenerationError};
pub use play_session::{GameLoop, GenerationTicket};
