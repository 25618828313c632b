//! Aggregates - consistency boundaries with an event-driven API.

pub mod session;

pub use session::{Phase, Session, SessionOutcome};
