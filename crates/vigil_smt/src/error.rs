//! Error types for the solver facade.

use std::fmt;

/// Result type for solver operations.
pub type SmtResult<T = ()> = Result<T, SmtError>;

/// A failure reported by (or about) a solver backend.
///
/// `Unknown` is an error by design: the engines are structured so that every
/// query must resolve to sat or unsat, and a timeout aborts the engine rather
/// than being interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtError {
    /// The solver answered `unknown` (timeout or undecidable fragment).
    Unknown,

    /// The backend does not implement the requested operation.
    Unsupported(&'static str),

    /// Values or a model were requested with no sat result to read from.
    NoModel,

    /// A scripted backend ran out of queued replies.
    ScriptExhausted,

    /// Backend-specific failure.
    Backend(String),
}

impl fmt::Display for SmtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtError::Unknown => {
                write!(f, "solver could not decide the query (unknown)")
            }
            SmtError::Unsupported(what) => {
                write!(f, "backend does not support {}", what)
            }
            SmtError::NoModel => {
                write!(f, "no model available: last check was not sat")
            }
            SmtError::ScriptExhausted => {
                write!(f, "scripted solver has no reply left for this check")
            }
            SmtError::Backend(msg) => write!(f, "solver backend error: {}", msg),
        }
    }
}

impl std::error::Error for SmtError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_failure() {
        let msg = SmtError::Unsupported("interpolation").to_string();
        assert!(msg.contains("interpolation"));
        let msg = SmtError::Backend("boom".into()).to_string();
        assert!(msg.contains("boom"));
    }
}
