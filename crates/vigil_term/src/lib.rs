//! Term layer for the Vigil model checker.
//!
//! Everything the engines manipulate is a [`TermId`]: a lightweight handle
//! into a hash-consing [`TermPool`]. Interning the same structure twice
//! yields the same handle, so structural equality is an integer comparison
//! and the handle doubles as the term's stable tag.
//!
//! State variables are declared once and instantiated at integer offsets
//! (time frames); [`TermPool::bump`] shifts every free instance of a term by
//! a delta, which is how a single-state formula is moved along an unrolling.
//!
//! ## Example
//!
//! ```
//! use vigil_term::{Sort, StateVar, TermPool};
//!
//! let mut pool = TermPool::new();
//! let flag = pool.declare_state_var(StateVar::new("flag", ["main"], Sort::Bool));
//!
//! let at0 = pool.mk_var(flag.at(0));
//! let at2 = pool.bump(at0, 2);
//! assert_eq!(pool.bump(at2, -2), at0);
//! ```

mod pool;
mod rewrite;
mod svar;
mod term;
mod value;

pub use pool::{SymId, TermPool};
pub use svar::{Sort, StateVar, SvarId, Var};
pub use term::{FunSym, TermData, TermDisplay, TermId};
pub use value::{Model, Value};
