//! WordMaster Engine library.
//!
//! This crate contains everything outside the pure game rules: the
//! storyteller port and its Ollama adapter, prompt templates, and the
//! use cases that drive a session.
//!
//! ## Structure
//!
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `prompt_templates` - Configurable storyteller prompts
//! - `use_cases/` - Chapter generation and session orchestration

pub mod infrastructure;
pub mod prompt_templates;
pub mod use_cases;

pub use use_cases::{ChapterGenerator, ChapterRequest, GameLoop, GenerationError, GenerationTicket};
