//! Generation failure descriptor.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a chapter generation attempt failed.
///
/// Serialized as the wire error codes clients switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The storyteller returned text that is not a JSON object
    MalformedResponse,
    /// The payload parsed but broke the chapter schema
    SchemaViolation,
    /// The storyteller could not be reached or answered with an error
    TransportError,
    /// The storyteller did not answer within the request timeout
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MalformedResponse => "MALFORMED_RESPONSE",
            FailureKind::SchemaViolation => "SCHEMA_VIOLATION",
            FailureKind::TransportError => "TRANSPORT_ERROR",
            FailureKind::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the most recent generation failure.
///
/// The timestamp is injected by whoever owns the clock; the state machine
/// never reads time itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    kind: FailureKind,
    message: String,
    failed_at: DateTime<Utc>,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, failed_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            failed_at,
        }
    }

    #[inline]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn failed_at(&self) -> DateTime<Utc> {
        self.failed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_wire_code() {
        let json = serde_json::to_string(&FailureKind::SchemaViolation).unwrap();
        assert_eq!(json, "\"SCHEMA_VIOLATION\"");
    }

    #[test]
    fn test_failure_keeps_injected_timestamp() {
        let at = Utc::now();
        let failure = GenerationFailure::new(FailureKind::Timeout, "no answer in 120s", at);
        assert_eq!(failure.failed_at(), at);
        assert_eq!(failure.kind(), FailureKind::Timeout);
    }
}
