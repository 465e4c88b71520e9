//! Activation literals.
//!
//! An activation literal is a nullary boolean symbol gating an assertion:
//! the solver only ever sees `a → φ`, and a query enables the assertion by
//! assuming `a`. Nothing is ever retracted; a stale literal is simply never
//! assumed again.
//!
//! Two flavors exist. The *canonical* literal of a term is reproducible from
//! the term's tag (`actlit_<tag>`), so the same property always maps to the
//! same guard across iterations. *Fresh* literals (`fresh_actlit_<n>`) are
//! unique per allocation and back the per-query conjuncts of the engines.
//! The counter lives in the factory, never in a global.

use vigil_term::{Sort, SymId, TermId, TermPool};

use crate::error::SmtResult;
use crate::solver::SmtSolver;

/// A single activation literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actlit {
    sym: SymId,
    term: TermId,
}

impl Actlit {
    /// The literal as a term, usable in assumptions.
    pub fn term(&self) -> TermId {
        self.term
    }

    /// The underlying nullary symbol.
    pub fn sym(&self) -> SymId {
        self.sym
    }

    /// The literal's name.
    pub fn name<'a>(&self, pool: &'a TermPool) -> &'a str {
        &pool.fun_sym(self.sym).name
    }

    /// The gated form `a → φ`.
    pub fn guard(&self, pool: &mut TermPool, phi: TermId) -> TermId {
        pool.mk_implies(self.term, phi)
    }

    /// Declares the literal's symbol on a solver.
    pub fn declare<S: SmtSolver>(&self, pool: &TermPool, solver: &mut S) -> SmtResult {
        solver.declare_fun(pool, self.sym)
    }
}

/// Allocator for activation literals; owns the fresh counter.
#[derive(Debug, Default)]
pub struct ActlitFactory {
    fresh: u64,
}

impl ActlitFactory {
    /// A factory starting at counter zero.
    pub fn new() -> Self {
        ActlitFactory { fresh: 0 }
    }

    /// The canonical literal for `term`, derived from its tag.
    ///
    /// Calling this twice for the same term yields the same literal.
    pub fn canonical(&self, pool: &mut TermPool, term: TermId) -> Actlit {
        let name = format!("actlit_{}", term.tag());
        let sym = pool.declare_fun_sym(name, vec![], Sort::Bool);
        let term = pool.mk_app(sym, vec![]);
        Actlit { sym, term }
    }

    /// A new, unique literal.
    pub fn fresh(&mut self, pool: &mut TermPool) -> Actlit {
        let name = format!("fresh_actlit_{}", self.fresh);
        self.fresh += 1;
        let sym = pool.declare_fun_sym(name, vec![], Sort::Bool);
        let term = pool.mk_app(sym, vec![]);
        Actlit { sym, term }
    }

    /// Allocates, declares and returns a fresh literal in one step.
    pub fn fresh_declared<S: SmtSolver>(
        &mut self,
        pool: &mut TermPool,
        solver: &mut S,
    ) -> SmtResult<Actlit> {
        let actlit = self.fresh(pool);
        actlit.declare(pool, solver)?;
        Ok(actlit)
    }
}
