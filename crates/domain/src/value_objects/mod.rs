//! Value objects - immutable domain values with validation at construction.

mod chapter;
mod failure;
mod genre;
mod settings;
mod setup;

pub use chapter::{Chapter, Quiz, QUIZ_OPTION_COUNT};
pub use failure::{FailureKind, GenerationFailure};
pub use genre::Genre;
pub use settings::GameSettings;
pub use setup::{GameSetup, TARGET_WORD_COUNT};
