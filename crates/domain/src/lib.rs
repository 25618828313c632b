extern crate self as wordmaster_domain;

pub mod aggregates;
pub mod error;
pub mod events;
pub mod ids;
pub mod value_objects;

pub use aggregates::{Phase, Session, SessionOutcome};
pub use error::DomainError;
pub use events::SessionEvent;
pub use ids::SessionId;
pub use value_objects::{
    Chapter, FailureKind, GameSettings, GameSetup, GenerationFailure, Genre, Quiz,
    QUIZ_OPTION_COUNT, TARGET_WORD_COUNT,
};
