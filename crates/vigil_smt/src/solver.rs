//! The incremental solver facade.
//!
//! Engines drive a solver exclusively through [`SmtSolver`]: declarations,
//! guarded assertions, `check-sat` under assumptions, and extraction of
//! values, models and interpolants. Backends differ in transport (in-process
//! enumeration, scripted replay, Z3); the discipline is shared.
//!
//! Two callback-style combinators mirror the original facade: a check that
//! dispatches to a sat/unsat handler, and a variant that additionally hands
//! the sat handler the valuations of a caller-supplied term list.

use serde::{Deserialize, Serialize};

use vigil_term::{Model, SymId, TermId, TermPool, Value, Var};

use crate::error::SmtResult;

/// Capabilities and knobs requested from a solver instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// The solver must support value extraction from sat results.
    pub produce_assignments: bool,
    /// The solver must support named assertions and unsat cores.
    pub produce_cores: bool,
    /// The solver must support sequence interpolation.
    pub produce_interpolants: bool,
    /// Per-check timeout, if the backend supports one.
    pub timeout_ms: Option<u32>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            produce_assignments: true,
            produce_cores: false,
            produce_interpolants: false,
            timeout_ms: None,
        }
    }
}

/// Outcome of a `check-sat` query.
///
/// `unknown` is never an outcome; it surfaces as
/// [`SmtError::Unknown`](crate::SmtError::Unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatOutcome {
    /// The assertions are satisfiable under the assumptions.
    Sat,
    /// The assertions are unsatisfiable under the assumptions.
    Unsat,
}

impl SatOutcome {
    /// `true` on [`SatOutcome::Sat`].
    pub fn is_sat(self) -> bool {
        matches!(self, SatOutcome::Sat)
    }
}

/// Valuations of a caller-supplied term list under a sat result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignments {
    pairs: Vec<(TermId, Value)>,
}

impl Assignments {
    /// An empty valuation set.
    pub fn new() -> Self {
        Assignments { pairs: Vec::new() }
    }

    /// Records the value of a term.
    pub fn push(&mut self, term: TermId, value: Value) {
        self.pairs.push((term, value));
    }

    /// The value of `term`, if it was evaluated.
    pub fn value_of(&self, term: TermId) -> Option<Value> {
        self.pairs
            .iter()
            .find(|(t, _)| *t == term)
            .map(|(_, v)| *v)
    }

    /// The boolean value of `term`, if it was evaluated to a boolean.
    pub fn bool_of(&self, term: TermId) -> Option<bool> {
        self.value_of(term).and_then(Value::as_bool)
    }

    /// Iterates over `(term, value)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, Value)> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of evaluated terms.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// `true` if nothing was evaluated.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(TermId, Value)> for Assignments {
    fn from_iter<I: IntoIterator<Item = (TermId, Value)>>(iter: I) -> Self {
        Assignments {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// An incremental SMT session.
///
/// Terms live in the caller's [`TermPool`]; every operation takes the pool so
/// the backend can render or evaluate the handles it is given.
pub trait SmtSolver {
    /// Declares a state-variable instance.
    fn declare_var(&mut self, pool: &TermPool, var: Var) -> SmtResult;

    /// Declares an uninterpreted function symbol (activation literals are the
    /// nullary case).
    fn declare_fun(&mut self, pool: &TermPool, sym: SymId) -> SmtResult;

    /// Defines a function symbol: `sym(params) = body`.
    fn define_fun(&mut self, pool: &TermPool, sym: SymId, params: &[Var], body: TermId)
        -> SmtResult;

    /// Asserts a term.
    fn assert_term(&mut self, pool: &TermPool, term: TermId) -> SmtResult;

    /// Asserts a term under a name, for unsat-core and interpolation queries.
    fn assert_named(&mut self, pool: &TermPool, term: TermId, name: &str) -> SmtResult;

    /// Pushes an assertion level.
    fn push(&mut self) -> SmtResult;

    /// Pops the most recent assertion level.
    fn pop(&mut self) -> SmtResult;

    /// `check-sat` under the given assumption terms (typically activation
    /// literals).
    fn check_sat_assuming(&mut self, pool: &TermPool, assumptions: &[TermId])
        -> SmtResult<SatOutcome>;

    /// Values of the given terms under the most recent sat result.
    fn get_values(&mut self, pool: &TermPool, terms: &[TermId]) -> SmtResult<Assignments>;

    /// Full model of the most recent sat result.
    fn get_model(&mut self, pool: &TermPool) -> SmtResult<Model>;

    /// Sequence interpolants for the named assertion groups of the most
    /// recent unsat result. For `n` names, `n - 1` interpolants are returned.
    fn get_interpolants(&mut self, pool: &mut TermPool, names: &[String])
        -> SmtResult<Vec<TermId>>;

    /// Checks under assumptions and dispatches to the matching handler.
    ///
    /// Handlers run before the session is disturbed by later queries, so the
    /// sat handler may still extract models or values.
    fn check_sat_assuming_then<T, FS, FU>(
        &mut self,
        pool: &TermPool,
        assumptions: &[TermId],
        if_sat: FS,
        if_unsat: FU,
    ) -> SmtResult<T>
    where
        Self: Sized,
        FS: FnOnce(&mut Self, &TermPool) -> SmtResult<T>,
        FU: FnOnce(&mut Self, &TermPool) -> SmtResult<T>,
    {
        match self.check_sat_assuming(pool, assumptions)? {
            SatOutcome::Sat => if_sat(self, pool),
            SatOutcome::Unsat => if_unsat(self, pool),
        }
    }

    /// Like [`check_sat_assuming_then`](Self::check_sat_assuming_then), but
    /// on sat the handler also receives the valuations of `terms`.
    fn check_sat_assuming_and_get_term_values<T, FS, FU>(
        &mut self,
        pool: &TermPool,
        assumptions: &[TermId],
        terms: &[TermId],
        if_sat: FS,
        if_unsat: FU,
    ) -> SmtResult<T>
    where
        Self: Sized,
        FS: FnOnce(&mut Self, &TermPool, &Assignments) -> SmtResult<T>,
        FU: FnOnce(&mut Self, &TermPool) -> SmtResult<T>,
    {
        match self.check_sat_assuming(pool, assumptions)? {
            SatOutcome::Sat => {
                let values = self.get_values(pool, terms)?;
                if_sat(self, pool, &values)
            }
            SatOutcome::Unsat => if_unsat(self, pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_wants_assignments_only() {
        let conf = SolverConfig::default();
        assert!(conf.produce_assignments);
        assert!(!conf.produce_cores);
        assert!(!conf.produce_interpolants);
        assert_eq!(conf.timeout_ms, None);
    }

    #[test]
    fn assignments_lookup() {
        let mut pool = TermPool::new();
        let t = pool.mk_true();
        let f = pool.mk_false();
        let mut vals = Assignments::new();
        vals.push(t, Value::Bool(true));
        assert_eq!(vals.bool_of(t), Some(true));
        assert_eq!(vals.value_of(f), None);
        assert_eq!(vals.len(), 1);
    }
}
