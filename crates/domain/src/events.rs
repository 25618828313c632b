//! Session events - the only way session state changes.

use serde::{Deserialize, Serialize};

use crate::value_objects::{Chapter, GameSetup, GenerationFailure};

/// Everything that can happen to a session.
///
/// Events carry their own data so [`crate::aggregates::Session::dispatch`]
/// stays a pure function: timestamps and generated chapters are produced by
/// the engine and delivered here, never read from inside the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    /// Player submitted validated setup; generation of chapter 1 begins
    Start(GameSetup),
    /// A generated chapter passed validation
    ChapterReady(Chapter),
    /// Chapter generation failed; progress is left untouched
    GenerationFailed(GenerationFailure),
    /// Player finished reading and moves on to the quiz
    Advance,
    /// Player picked the right quiz option
    AnswerCorrect,
    /// Player picked a wrong quiz option
    AnswerWrong,
    /// Player typed what the hero does next
    SubmitAction(String),
    /// Retry the failed generation with the same context
    Retry,
    /// Abandon the session and return to setup
    Restart,
}

impl SessionEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start(_) => "START",
            SessionEvent::ChapterReady(_) => "CHAPTER_READY",
            SessionEvent::GenerationFailed(_) => "GENERATION_FAILED",
            SessionEvent::Advance => "ADVANCE",
            SessionEvent::AnswerCorrect => "ANSWER_CORRECT",
            SessionEvent::AnswerWrong => "ANSWER_WRONG",
            SessionEvent::SubmitAction(_) => "SUBMIT_ACTION",
            SessionEvent::Retry => "RETRY",
            SessionEvent::Restart => "RESTART",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let json =
            serde_json::to_string(&SessionEvent::SubmitAction("open the door".into())).unwrap();
        assert_eq!(json, r#"{"type":"SUBMIT_ACTION","data":"open the door"}"#);

        let advance: SessionEvent = serde_json::from_str(r#"{"type":"ADVANCE"}"#).unwrap();
        assert_eq!(advance, SessionEvent::Advance);
    }
}
