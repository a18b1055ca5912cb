//! Shared error vocabulary for the outbox-mq crate family.
//!
//! Each crate in the family (`outbox-mq-outbox`, `outbox-mq-inbox`, ...) defines its own
//! `thiserror`-derived error enum for its own operations, the same way `transactional-outbox`
//! and `idempotent-consumer` do upstream. This crate holds only the pieces that genuinely cross
//! crate boundaries: the fatal/transient classification the middleware chain's error policy
//! (producer Retry/CircuitBreaker stages, consumer deserialize-failure handling) depends on.

use std::fmt;

/// Whether a failure should be retried by a wrapping stage or surfaced immediately.
///
/// Serialization of `null`, a missing `$type` header on consume, and an unknown message type on
/// a strict typed topic are `Fatal` — no amount of retrying fixes them. Broker unavailability and
/// database contention are `Transient` — the Retry/CircuitBreaker stages are allowed to absorb
/// them per their own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Transient,
}

/// An error tagged with its [`Severity`], so a wrapping stage can decide whether to retry it
/// without downcasting the underlying error type.
#[derive(Debug)]
pub struct ClassifiedError {
    pub severity: Severity,
    pub source: anyhow::Error,
}

impl ClassifiedError {
    pub fn fatal(source: impl Into<anyhow::Error>) -> Self {
        Self {
            severity: Severity::Fatal,
            source: source.into(),
        }
    }

    pub fn transient(source: impl Into<anyhow::Error>) -> Self {
        Self {
            severity: Severity::Transient,
            source: source.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.source)
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

/// Check if a `sqlx::Error` is a unique-constraint violation (Postgres error code `23505`).
///
/// Shared by the inbox dedup insert and the outbox worker's replay tooling; both need to tell
/// "this row already exists" apart from a real database failure.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classified_error_reports_severity() {
        let err = ClassifiedError::fatal(anyhow::anyhow!("missing $type header"));
        assert!(err.is_fatal());
        assert_eq!(err.severity, Severity::Fatal);

        let err = ClassifiedError::transient(anyhow::anyhow!("broker unavailable"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn display_includes_severity_tag() {
        let err = ClassifiedError::fatal(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "[Fatal] boom");
    }
}
