//! Session aggregate - one playthrough from setup to result
//!
//! # Rustic DDD Design
//!
//! This aggregate follows Rustic DDD principles:
//! - **Private fields**: All fields are encapsulated
//! - **Valid by construction**: `new()` takes pre-validated types
//! - **Pure transitions**: `dispatch()` is a function of (state, event) only
//!
//! The reducer never touches a clock, RNG, or I/O. Timestamps ride in on
//! events; chapter generation happens elsewhere and lands here as
//! `ChapterReady` / `GenerationFailed`.

use crate::events::SessionEvent;
use crate::ids::SessionId;
use crate::value_objects::{Chapter, GameSettings, GameSetup, GenerationFailure};

/// Where the session currently is in the play loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting hero name, target words, and genre
    Input,
    /// A chapter generation request is outstanding
    Loading,
    /// Player is reading the chapter
    Story,
    /// Player is answering the comprehension quiz
    Quiz,
    /// Player is typing the hero's next action
    ActionInput,
    /// The game ended
    Result(SessionOutcome),
    /// Generation failed; player may retry or restart
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Input => "INPUT",
            Phase::Loading => "LOADING",
            Phase::Story => "STORY",
            Phase::Quiz => "QUIZ",
            Phase::ActionInput => "ACTION_INPUT",
            Phase::Result(_) => "RESULT",
            Phase::Error => "ERROR",
        }
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Cleared the quiz on the final turn
    Victory,
    /// Ran out of lives
    Defeat,
}

/// A single playthrough.
///
/// # Invariants
///
/// - `turn >= 1`, incremented exactly once per committed chapter
/// - `hp <= max_hp`; the transition that zeroes `hp` lands in `Result(Defeat)`
/// - `history` grows only when an action is submitted, one summary per turn
/// - a generation failure never changes `turn`, `hp`, or `history`
///
/// # Example
///
/// ```
/// use wordmaster_domain::aggregates::{Phase, Session};
/// use wordmaster_domain::events::SessionEvent;
/// use wordmaster_domain::value_objects::{GameSettings, GameSetup, Genre};
///
/// let setup = GameSetup::new(
///     "Cheolsu",
///     vec!["dragon".into(), "castle".into(), "sword".into()],
///     Genre::Fantasy,
/// )
/// .unwrap();
///
/// let session = Session::new(GameSettings::default());
/// assert_eq!(session.phase(), Phase::Input);
///
/// let session = session.dispatch(SessionEvent::Start(setup));
/// assert_eq!(session.phase(), Phase::Loading);
/// assert_eq!(session.turn(), 1);
/// assert_eq!(session.hp(), Session::MAX_HP);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    // Identity
    id: SessionId,

    // Play loop position
    phase: Phase,

    // Player input (None until START)
    setup: Option<GameSetup>,

    // Roguelike counters
    turn: u32,
    hp: u8,
    max_hp: u8,

    /// Prior chapter summaries, oldest first
    history: Vec<String>,

    /// Chapter being read/quizzed; cleared when the next turn starts loading
    current_chapter: Option<Chapter>,

    /// Player action accompanying the outstanding generation request
    pending_action: Option<String>,

    /// Most recent generation failure, if any
    last_error: Option<GenerationFailure>,

    // Game rules
    settings: GameSettings,
}

impl Session {
    /// Lives per playthrough.
    pub const MAX_HP: u8 = 3;

    // =========================================================================
    // Constructor
    // =========================================================================

    /// Create a fresh session waiting for player input.
    pub fn new(settings: GameSettings) -> Self {
        Self {
            id: SessionId::new(),
            phase: Phase::Input,
            setup: None,
            turn: 1,
            hp: Self::MAX_HP,
            max_hp: Self::MAX_HP,
            history: Vec::new(),
            current_chapter: None,
            pending_action: None,
            last_error: None,
            settings,
        }
    }

    // =========================================================================
    // Accessors (read-only)
    // =========================================================================

    /// Returns the session's unique identifier.
    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the current phase.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the validated player setup, once the session has started.
    #[inline]
    pub fn setup(&self) -> Option<&GameSetup> {
        self.setup.as_ref()
    }

    /// Returns the current turn number (1-based).
    #[inline]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// Returns the remaining lives.
    #[inline]
    pub fn hp(&self) -> u8 {
        self.hp
    }

    /// Returns the life cap.
    #[inline]
    pub fn max_hp(&self) -> u8 {
        self.max_hp
    }

    /// Returns prior chapter summaries, oldest first.
    #[inline]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Returns the summary feeding the next chapter's continuity, if any.
    #[inline]
    pub fn previous_summary(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }

    /// Returns the chapter currently being read or quizzed.
    #[inline]
    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.current_chapter.as_ref()
    }

    /// Returns the player action accompanying the outstanding request.
    #[inline]
    pub fn pending_action(&self) -> Option<&str> {
        self.pending_action.as_deref()
    }

    /// Returns the most recent generation failure.
    #[inline]
    pub fn last_error(&self) -> Option<&GenerationFailure> {
        self.last_error.as_ref()
    }

    /// Returns the game rules this session plays under.
    #[inline]
    pub fn settings(&self) -> GameSettings {
        self.settings
    }

    /// True once the session reached a result screen.
    #[inline]
    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Result(_))
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Apply an event, producing the next session state.
    ///
    /// Events that are invalid for the current phase leave the session
    /// unchanged; callers never need to pre-filter what they dispatch.
    pub fn dispatch(self, event: SessionEvent) -> Session {
        match (self.phase, event) {
            // Restart is honored from every phase
            (_, SessionEvent::Restart) => Session::new(self.settings),

            (Phase::Input, SessionEvent::Start(setup)) => self.start(setup),
            (Phase::Loading, SessionEvent::ChapterReady(chapter)) => self.install_chapter(chapter),
            (Phase::Loading, SessionEvent::GenerationFailed(failure)) => self.fail(failure),
            (Phase::Story, SessionEvent::Advance) => self.advance_to_quiz(),
            (Phase::Quiz, SessionEvent::AnswerCorrect) => self.answer_correct(),
            (Phase::Quiz, SessionEvent::AnswerWrong) => self.answer_wrong(),
            (Phase::ActionInput, SessionEvent::SubmitAction(action)) => self.submit_action(action),
            (Phase::Error, SessionEvent::Retry) => self.retry(),

            _ => self,
        }
    }

    fn start(mut self, setup: GameSetup) -> Session {
        self.phase = Phase::Loading;
        self.setup = Some(setup);
        self.turn = 1;
        self.hp = self.max_hp;
        self.history.clear();
        self.current_chapter = None;
        self.pending_action = None;
        self.last_error = None;
        self
    }

    fn install_chapter(mut self, chapter: Chapter) -> Session {
        self.phase = Phase::Story;
        self.current_chapter = Some(chapter);
        self.pending_action = None;
        self.last_error = None;
        self
    }

    fn fail(mut self, failure: GenerationFailure) -> Session {
        // turn, hp, history, and pending_action survive so RETRY can resume
        self.phase = Phase::Error;
        self.last_error = Some(failure);
        self
    }

    fn advance_to_quiz(mut self) -> Session {
        self.phase = Phase::Quiz;
        self
    }

    fn answer_correct(mut self) -> Session {
        self.phase = if self.turn >= self.settings.max_turns {
            Phase::Result(SessionOutcome::Victory)
        } else {
            Phase::ActionInput
        };
        self
    }

    fn answer_wrong(mut self) -> Session {
        self.hp = self.hp.saturating_sub(1);
        self.phase = if self.hp == 0 {
            Phase::Result(SessionOutcome::Defeat)
        } else {
            Phase::Quiz
        };
        self
    }

    fn submit_action(mut self, action: String) -> Session {
        let Some(chapter) = self.current_chapter.take() else {
            return self;
        };
        self.history.push(chapter.summary().to_string());
        self.turn += 1;
        self.pending_action = Some(action);
        self.phase = Phase::Loading;
        self
    }

    fn retry(mut self) -> Session {
        // Same turn, same pending action, same history - only the error clears
        self.phase = Phase::Loading;
        self.last_error = None;
        self
    }
}
