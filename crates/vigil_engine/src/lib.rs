//! The Vigil proof engines.
//!
//! Two SMT-based engines prove (or refute) invariance of safety properties
//! over a [`TransSys`](vigil_sys::TransSys):
//!
//! - [`Kind`]: the k-induction step engine. Handles a batch of properties,
//!   promotes those unfalsifiable at the current depth to *optimistic*, and
//!   publishes them invariant once the companion BMC engine confirms their
//!   base case over the event bus.
//! - [`Ic3ia`]: IC3 with implicit predicate abstraction. Handles one
//!   property per instance, with frames over abstraction variables,
//!   relative-induction blocking, and interpolation-driven refinement.
//!
//! Both engines are single-threaded and own their solver and term pool
//! exclusively; cooperation happens only through the
//! [`Mailbox`](vigil_sys::Mailbox).

mod compress;
mod config;
mod error;
mod ic3ia;
mod kind;

pub use compress::Compressor;
pub use config::{Ic3Config, KindConfig};
pub use error::{EngineError, EngineResult};
pub use ic3ia::{required_solver_config, Ic3Outcome, Ic3ia};
pub use kind::{Kind, KindOutcome};
