//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod ollama;
pub mod ports;
pub mod resilient_storyteller;

pub use ollama::OllamaClient;
pub use ports::{ChatMessage, StoryPrompt, StoryResponse, StorytellerError, StorytellerPort};
pub use resilient_storyteller::{ResilientStoryteller, RetryConfig};
