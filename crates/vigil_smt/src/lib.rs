//! Solver facade for the Vigil model checker.
//!
//! This crate defines the incremental SMT session the engines drive
//! ([`SmtSolver`]), the activation-literal registry ([`ActlitFactory`]), and
//! three backends:
//!
//! - [`FiniteSolver`]: exhaustive enumeration over finite boolean state
//!   spaces; complete for the integration suites.
//! - [`ScriptedSolver`]: deterministic replay with a full interaction log;
//!   the engine unit tests pin their query discipline on it.
//! - `Z3Solver` (feature `z3`): a Z3 session; requires a local Z3 install.
//!
//! The discipline shared by all engines: every retractable assertion is
//! gated behind an activation literal (`a → φ`), queries enable assertions
//! by assuming literals, and nothing is ever retracted.

mod actlit;
mod error;
mod finite;
mod replay;
mod solver;

#[cfg(feature = "z3")]
mod z3_backend;

pub use actlit::{Actlit, ActlitFactory};
pub use error::{SmtError, SmtResult};
pub use finite::FiniteSolver;
pub use replay::{Recorded, Reply, ScriptedSolver};
pub use solver::{Assignments, SatOutcome, SmtSolver, SolverConfig};
pub use vigil_term::Model;

#[cfg(feature = "z3")]
pub use z3_backend::{z3_config, Z3Solver};
