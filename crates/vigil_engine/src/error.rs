//! Engine-level errors.
//!
//! `Success`, `Failure` and `Counterexample` outcomes are ordinary return
//! values ([`Ic3Outcome`], [`KindOutcome`]); this module only covers the
//! ways an engine can *abort*.
//!
//! [`Ic3Outcome`]: crate::Ic3Outcome
//! [`KindOutcome`]: crate::KindOutcome

use std::fmt;

use vigil_smt::SmtError;

/// Result type for engine operations.
pub type EngineResult<T = ()> = Result<T, EngineError>;

/// A fatal engine failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The solver failed or answered `unknown`.
    Solver(SmtError),

    /// The solver returned an answer the engine's own bookkeeping rules out
    /// (e.g. sat where structure guarantees unsat). The current property is
    /// abandoned.
    Inconsistency(&'static str),

    /// The named property does not exist in the transition system.
    NoSuchProperty(String),

    /// The configured frame limit was reached without a verdict.
    FrameLimit(usize),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Solver(e) => write!(f, "solver failure: {}", e),
            EngineError::Inconsistency(what) => {
                write!(f, "internal inconsistency: {}", what)
            }
            EngineError::NoSuchProperty(name) => {
                write!(f, "no property named '{}' in the transition system", name)
            }
            EngineError::FrameLimit(n) => {
                write!(f, "frame limit of {} reached without a verdict", n)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Solver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SmtError> for EngineError {
    fn from(e: SmtError) -> Self {
        EngineError::Solver(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solver_errors_convert() {
        fn fails() -> EngineResult<()> {
            Err(SmtError::Unknown)?;
            Ok(())
        }
        assert_eq!(fails(), Err(EngineError::Solver(SmtError::Unknown)));
    }

    #[test]
    fn display_names_the_property() {
        let e = EngineError::NoSuchProperty("safety".into());
        assert!(e.to_string().contains("safety"));
    }
}
