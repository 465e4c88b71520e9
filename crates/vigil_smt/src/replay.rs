//! Deterministic replay backend.
//!
//! `ScriptedSolver` answers each `check-sat` from a queue of prepared
//! replies and records every facade call it sees. Engine test suites use it
//! to pin the query discipline (which terms were asserted, gated and
//! assumed, in which order) and to drive paths a real backend cannot, such
//! as sequence interpolation.

use std::collections::VecDeque;

use vigil_term::{Model, SymId, TermId, TermPool, Var};

use crate::error::{SmtError, SmtResult};
use crate::solver::{Assignments, SatOutcome, SmtSolver};

/// One prepared reply to a `check-sat`.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Sat, with the valuations and model subsequent extraction calls see.
    Sat {
        /// Valuations served by `get_values`.
        values: Assignments,
        /// Model served by `get_model`.
        model: Model,
    },
    /// Unsat, with the interpolants served by `get_interpolants`.
    Unsat {
        /// Interpolant sequence, possibly empty.
        interpolants: Vec<TermId>,
    },
}

/// One recorded facade call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// `declare_var`.
    DeclareVar(Var),
    /// `declare_fun`.
    DeclareFun(SymId),
    /// `define_fun`.
    DefineFun(SymId),
    /// `assert_term`.
    Assert(TermId),
    /// `assert_named`.
    AssertNamed(TermId, String),
    /// `push`.
    Push,
    /// `pop`.
    Pop,
    /// `check_sat_assuming`, with the assumption terms.
    CheckSat(Vec<TermId>),
}

/// A solver that replays a prepared script.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    replies: VecDeque<Reply>,
    current: Option<Reply>,
    /// Every facade call, in order.
    pub log: Vec<Recorded>,
}

impl ScriptedSolver {
    /// A solver with an empty script.
    pub fn new() -> Self {
        ScriptedSolver {
            replies: VecDeque::new(),
            current: None,
            log: Vec::new(),
        }
    }

    /// Queues a reply for the next unanswered `check-sat`.
    pub fn enqueue(&mut self, reply: Reply) -> &mut Self {
        self.replies.push_back(reply);
        self
    }

    /// Queues a sat reply.
    pub fn enqueue_sat(&mut self, values: Assignments, model: Model) -> &mut Self {
        self.enqueue(Reply::Sat { values, model })
    }

    /// Queues a bare unsat reply.
    pub fn enqueue_unsat(&mut self) -> &mut Self {
        self.enqueue(Reply::Unsat {
            interpolants: Vec::new(),
        })
    }

    /// Queues an unsat reply carrying interpolants.
    pub fn enqueue_unsat_with_interpolants(&mut self, interpolants: Vec<TermId>) -> &mut Self {
        self.enqueue(Reply::Unsat { interpolants })
    }

    /// Every term asserted so far (named or not), in order.
    pub fn asserted(&self) -> Vec<TermId> {
        self.log
            .iter()
            .filter_map(|r| match r {
                Recorded::Assert(t) | Recorded::AssertNamed(t, _) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// The assumption lists of every `check-sat` so far, in order.
    pub fn checks(&self) -> Vec<Vec<TermId>> {
        self.log
            .iter()
            .filter_map(|r| match r {
                Recorded::CheckSat(assumptions) => Some(assumptions.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SmtSolver for ScriptedSolver {
    fn declare_var(&mut self, _pool: &TermPool, var: Var) -> SmtResult {
        self.log.push(Recorded::DeclareVar(var));
        Ok(())
    }

    fn declare_fun(&mut self, _pool: &TermPool, sym: SymId) -> SmtResult {
        self.log.push(Recorded::DeclareFun(sym));
        Ok(())
    }

    fn define_fun(
        &mut self,
        _pool: &TermPool,
        sym: SymId,
        _params: &[Var],
        _body: TermId,
    ) -> SmtResult {
        self.log.push(Recorded::DefineFun(sym));
        Ok(())
    }

    fn assert_term(&mut self, _pool: &TermPool, term: TermId) -> SmtResult {
        self.log.push(Recorded::Assert(term));
        Ok(())
    }

    fn assert_named(&mut self, _pool: &TermPool, term: TermId, name: &str) -> SmtResult {
        self.log.push(Recorded::AssertNamed(term, name.to_string()));
        Ok(())
    }

    fn push(&mut self) -> SmtResult {
        self.log.push(Recorded::Push);
        Ok(())
    }

    fn pop(&mut self) -> SmtResult {
        self.log.push(Recorded::Pop);
        Ok(())
    }

    fn check_sat_assuming(
        &mut self,
        _pool: &TermPool,
        assumptions: &[TermId],
    ) -> SmtResult<SatOutcome> {
        self.log.push(Recorded::CheckSat(assumptions.to_vec()));
        let reply = self.replies.pop_front().ok_or(SmtError::ScriptExhausted)?;
        let outcome = match &reply {
            Reply::Sat { .. } => SatOutcome::Sat,
            Reply::Unsat { .. } => SatOutcome::Unsat,
        };
        self.current = Some(reply);
        Ok(outcome)
    }

    fn get_values(&mut self, pool: &TermPool, terms: &[TermId]) -> SmtResult<Assignments> {
        match &self.current {
            Some(Reply::Sat { values, .. }) => {
                let mut out = Assignments::new();
                for &t in terms {
                    let v = values.value_of(t).ok_or_else(|| {
                        SmtError::Backend(format!(
                            "no scripted value for {}",
                            pool.display(t)
                        ))
                    })?;
                    out.push(t, v);
                }
                Ok(out)
            }
            _ => Err(SmtError::NoModel),
        }
    }

    fn get_model(&mut self, _pool: &TermPool) -> SmtResult<Model> {
        match &self.current {
            Some(Reply::Sat { model, .. }) => Ok(model.clone()),
            _ => Err(SmtError::NoModel),
        }
    }

    fn get_interpolants(
        &mut self,
        _pool: &mut TermPool,
        _names: &[String],
    ) -> SmtResult<Vec<TermId>> {
        match &self.current {
            Some(Reply::Unsat { interpolants }) => Ok(interpolants.clone()),
            _ => Err(SmtError::Backend(
                "interpolants requested without an unsat reply".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_term::Value;

    #[test]
    fn replies_are_served_in_order() {
        let mut pool = TermPool::new();
        let mut solver = ScriptedSolver::new();
        solver.enqueue_unsat();
        solver.enqueue_sat(Assignments::new(), Model::new());
        assert_eq!(
            solver.check_sat_assuming(&pool, &[]).unwrap(),
            SatOutcome::Unsat
        );
        assert_eq!(
            solver.check_sat_assuming(&pool, &[]).unwrap(),
            SatOutcome::Sat
        );
        assert_eq!(
            solver.check_sat_assuming(&mut pool, &[]),
            Err(SmtError::ScriptExhausted)
        );
    }

    #[test]
    fn values_come_from_the_current_reply() {
        let mut pool = TermPool::new();
        let t = pool.mk_true();
        let mut solver = ScriptedSolver::new();
        let values: Assignments = [(t, Value::Bool(true))].into_iter().collect();
        solver.enqueue_sat(values, Model::new());
        solver.check_sat_assuming(&pool, &[]).unwrap();
        let out = solver.get_values(&pool, &[t]).unwrap();
        assert_eq!(out.bool_of(t), Some(true));
    }

    #[test]
    fn missing_scripted_value_is_an_error() {
        let mut pool = TermPool::new();
        let t = pool.mk_true();
        let mut solver = ScriptedSolver::new();
        solver.enqueue_sat(Assignments::new(), Model::new());
        solver.check_sat_assuming(&pool, &[]).unwrap();
        assert!(solver.get_values(&pool, &[t]).is_err());
    }

    #[test]
    fn log_captures_assertions_and_checks() {
        let mut pool = TermPool::new();
        let t = pool.mk_true();
        let f = pool.mk_false();
        let mut solver = ScriptedSolver::new();
        solver.enqueue_unsat();
        solver.assert_term(&pool, t).unwrap();
        solver.assert_named(&pool, f, "a0").unwrap();
        solver.check_sat_assuming(&pool, &[t]).unwrap();
        assert_eq!(solver.asserted(), vec![t, f]);
        assert_eq!(solver.checks(), vec![vec![t]]);
    }

    #[test]
    fn interpolants_come_from_the_current_unsat_reply() {
        let mut pool = TermPool::new();
        let j = pool.mk_true();
        let mut solver = ScriptedSolver::new();
        solver.enqueue_unsat_with_interpolants(vec![j]);
        solver.check_sat_assuming(&pool, &[]).unwrap();
        let itps = solver
            .get_interpolants(&mut pool, &["a0".into(), "a1".into()])
            .unwrap();
        assert_eq!(itps, vec![j]);
    }
}
