//! Session orchestration.
//!
//! Drives a [`Session`] through its lifecycle: dispatching player events,
//! issuing generation tickets while the session is loading, and installing
//! results when they come back. At most one generation is outstanding per
//! session, and results from an abandoned session or turn are discarded.

use chrono::Utc;

use wordmaster_domain::{Chapter, Phase, Session, SessionEvent, SessionId};

use crate::use_cases::generate_chapter::{ChapterGenerator, ChapterRequest, GenerationError};

/// Identifies one in-flight generation.
///
/// A ticket is minted when the session enters loading and must be presented
/// to install the result. If the session restarted or moved on in the
/// meantime, the ticket no longer matches and the result is dropped.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    /// Session the generation was started for.
    pub session_id: SessionId,
    /// Turn the generation was started for.
    pub turn: u32,
    /// The prompt parameters captured when the ticket was minted.
    pub request: ChapterRequest,
}

/// Drives one game session against a chapter generator.
pub struct GameLoop {
    session: Session,
    generator: ChapterGenerator,
    in_flight: Option<(SessionId, u32)>,
}

impl GameLoop {
    pub fn new(session: Session, generator: ChapterGenerator) -> Self {
        Self {
            session,
            generator,
            in_flight: None,
        }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply a player event to the session.
    pub fn dispatch(&mut self, event: SessionEvent) {
        let from = self.session.phase();
        let event_name = event.name();

        self.session = self.session.clone().dispatch(event);

        tracing::debug!(
            event = event_name,
            from = from.as_str(),
            to = self.session.phase().as_str(),
            "Session event dispatched"
        );
    }

    /// Mint a ticket for the generation the session is waiting on.
    ///
    /// Returns `None` when the session is not loading, when a ticket for
    /// this generation is already outstanding, or when no setup has been
    /// installed yet.
    pub fn begin_generation(&mut self) -> Option<GenerationTicket> {
        if self.session.phase() != Phase::Loading {
            return None;
        }

        let current = (self.session.id(), self.session.turn());
        if self.in_flight == Some(current) {
            return None;
        }

        let request = ChapterRequest::from_session(&self.session)?;
        self.in_flight = Some(current);

        tracing::debug!(
            session_id = %current.0,
            turn = current.1,
            "Generation started"
        );

        Some(GenerationTicket {
            session_id: current.0,
            turn: current.1,
            request,
        })
    }

    /// Run the generation a ticket stands for.
    pub async fn resolve(&self, ticket: &GenerationTicket) -> Result<Chapter, GenerationError> {
        self.generator.generate(&ticket.request).await
    }

    /// Install a generation result, unless the ticket went stale.
    ///
    /// Returns `true` if the result was applied to the session.
    pub fn complete(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<Chapter, GenerationError>,
    ) -> bool {
        if !self.accepts(&ticket) {
            tracing::debug!(
                session_id = %ticket.session_id,
                turn = ticket.turn,
                "Discarding stale generation result"
            );
            return false;
        }

        self.in_flight = None;

        match outcome {
            Ok(chapter) => self.dispatch(SessionEvent::ChapterReady(chapter)),
            Err(e) => {
                tracing::warn!(kind = e.kind().as_str(), error = %e, "Generation failed");
                self.dispatch(SessionEvent::GenerationFailed(e.into_failure(Utc::now())));
            }
        }

        true
    }

    /// Begin, resolve, and complete one generation.
    ///
    /// Returns `false` if the session was not waiting on a generation.
    pub async fn run_generation(&mut self) -> bool {
        let Some(ticket) = self.begin_generation() else {
            return false;
        };
        let outcome = self.resolve(&ticket).await;
        self.complete(ticket, outcome)
    }

    /// A result is only accepted for the exact generation the session is
    /// still waiting on.
    fn accepts(&self, ticket: &GenerationTicket) -> bool {
        self.session.phase() == Phase::Loading
            && ticket.session_id == self.session.id()
            && ticket.turn == self.session.turn()
    }
}
