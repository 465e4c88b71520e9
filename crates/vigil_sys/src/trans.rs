//! Symbolic transition systems.

use std::collections::HashMap;

use vigil_smt::{SmtResult, SmtSolver};
use vigil_term::{Model, SvarId, SymId, TermId, TermPool, Var};

use crate::property::{Property, PropertyStatus};
use crate::trace::Trace;

/// A defined function: `sym(params) = body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunDef {
    /// The defined symbol.
    pub sym: SymId,
    /// Formal parameters, as variable instances the body is written over.
    pub params: Vec<Var>,
    /// Definition body.
    pub body: TermId,
}

/// A symbolic transition system `(I, T, V)` with its candidate properties.
///
/// `init` is over offset 0 and `trans` relates offsets 0 (current) and 1
/// (next); [`init_of_bound`](Self::init_of_bound) and
/// [`trans_of_bound`](Self::trans_of_bound) move them along an unrolling.
#[derive(Debug, Clone)]
pub struct TransSys {
    name: String,
    logic: String,
    svars: Vec<SvarId>,
    init: TermId,
    trans: TermId,
    props: Vec<Property>,
    fun_defs: Vec<FunDef>,
    statuses: HashMap<String, PropertyStatus>,
    funs_installed: bool,
}

impl TransSys {
    /// Builds a system. Every property starts `Unknown`.
    pub fn new<N: Into<String>, L: Into<String>>(
        name: N,
        logic: L,
        svars: Vec<SvarId>,
        init: TermId,
        trans: TermId,
        props: Vec<Property>,
        fun_defs: Vec<FunDef>,
    ) -> Self {
        let statuses = props
            .iter()
            .map(|p| (p.name.clone(), PropertyStatus::Unknown))
            .collect();
        TransSys {
            name: name.into(),
            logic: logic.into(),
            svars,
            init,
            trans,
            props,
            fun_defs,
            statuses,
            funs_installed: false,
        }
    }

    /// System name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SMT-LIB logic the system lives in.
    pub fn get_logic(&self) -> &str {
        &self.logic
    }

    /// The state variables of the system.
    pub fn state_vars(&self) -> &[SvarId] {
        &self.svars
    }

    /// The initial-state predicate, over offset 0.
    pub fn init(&self) -> TermId {
        self.init
    }

    /// The transition relation, over offsets 0 (current) and 1 (next).
    pub fn trans(&self) -> TermId {
        self.trans
    }

    /// The initial-state predicate shifted to offset `k`.
    pub fn init_of_bound(&self, pool: &mut TermPool, k: i64) -> TermId {
        pool.bump(self.init, k)
    }

    /// The transition relation between offsets `k - 1` and `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k < 1`.
    pub fn trans_of_bound(&self, pool: &mut TermPool, k: i64) -> TermId {
        assert!(k >= 1, "transition relation needs a predecessor offset");
        pool.bump(self.trans, k - 1)
    }

    /// The candidate properties shifted to offset `k`.
    pub fn props_list_of_bound(&self, pool: &mut TermPool, k: i64) -> Vec<(String, TermId)> {
        self.props
            .iter()
            .map(|p| (p.name.clone(), pool.bump(p.term, k)))
            .collect()
    }

    /// The candidate properties at offset 0.
    pub fn props(&self) -> &[Property] {
        &self.props
    }

    /// The function definitions of the system.
    pub fn fun_defs(&self) -> &[FunDef] {
        &self.fun_defs
    }

    /// Current status of a property; `Unknown` for unknown names.
    pub fn prop_status(&self, name: &str) -> PropertyStatus {
        self.statuses
            .get(name)
            .cloned()
            .unwrap_or(PropertyStatus::Unknown)
    }

    /// Applies a status if it moves up the lattice; reports whether it did.
    pub fn set_prop_status(&mut self, name: &str, status: PropertyStatus) -> bool {
        match self.statuses.get_mut(name) {
            Some(current) if status.improves_on(current) => {
                *current = status;
                true
            }
            _ => false,
        }
    }

    /// Declares every state-variable instance for offsets in `[lo, hi]`.
    ///
    /// Constant variables are declared once, at offset 0, together with the
    /// function declarations and definitions, on the first call.
    pub fn define_and_declare_of_bounds<S: SmtSolver>(
        &mut self,
        pool: &TermPool,
        solver: &mut S,
        lo: i64,
        hi: i64,
    ) -> SmtResult {
        if !self.funs_installed {
            self.funs_installed = true;
            for def in &self.fun_defs {
                solver.declare_fun(pool, def.sym)?;
                solver.define_fun(pool, def.sym, &def.params, def.body)?;
            }
            for &sv in &self.svars {
                if pool.state_var(sv).is_const {
                    solver.declare_var(pool, sv.at(0))?;
                }
            }
        }
        for offset in lo..=hi {
            for &sv in &self.svars {
                if !pool.state_var(sv).is_const {
                    solver.declare_var(pool, sv.at(offset))?;
                }
            }
        }
        Ok(())
    }

    /// Materializes the concrete trace of length `k + 1` induced by `model`.
    ///
    /// Instances the model does not value (e.g. don't-care inputs) are left
    /// out of their state.
    pub fn path_from_model(&self, pool: &TermPool, model: &Model, k: i64) -> Trace {
        let mut trace = Trace::new();
        for step in 0..=k {
            let mut state = Vec::new();
            for &sv in &self.svars {
                let var = if pool.state_var(sv).is_const {
                    sv.at(0)
                } else {
                    sv.at(step)
                };
                if let Some(value) = model.get(var) {
                    state.push((var, value));
                }
            }
            trace.push_state(state);
        }
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_smt::{Recorded, ScriptedSolver};
    use vigil_term::{Sort, StateVar, Value};

    /// One boolean flag that flips every step; property: it is not both
    /// true and false (trivially true).
    fn flip_sys(pool: &mut TermPool) -> TransSys {
        let flag = pool.declare_state_var(StateVar::new("flag", ["flip"], Sort::Bool));
        let f0 = pool.mk_var(flag.at(0));
        let f1 = pool.mk_var(flag.at(1));
        let init = pool.mk_not(f0);
        let next = pool.mk_not(f0);
        let trans = pool.mk_iff(f1, next);
        let nf0 = pool.mk_not(f0);
        let taut = pool.mk_or(vec![f0, nf0]);
        let prop = Property::new("tautology", taut);
        TransSys::new(
            "flip",
            "QF_UF",
            vec![flag],
            init,
            trans,
            vec![prop],
            vec![],
        )
    }

    #[test]
    fn bounds_shift_init_and_trans() {
        let mut pool = TermPool::new();
        let sys = flip_sys(&mut pool);
        let i0 = sys.init_of_bound(&mut pool, 0);
        let i2 = sys.init_of_bound(&mut pool, 2);
        assert_eq!(pool.bump(i2, -2), i0);
        let t1 = sys.trans_of_bound(&mut pool, 1);
        let t3 = sys.trans_of_bound(&mut pool, 3);
        assert_eq!(pool.bump(t1, 2), t3);
    }

    #[test]
    #[should_panic]
    fn trans_of_bound_zero_panics() {
        let mut pool = TermPool::new();
        let sys = flip_sys(&mut pool);
        sys.trans_of_bound(&mut pool, 0);
    }

    #[test]
    fn props_list_shifts_terms() {
        let mut pool = TermPool::new();
        let sys = flip_sys(&mut pool);
        let at0 = sys.props_list_of_bound(&mut pool, 0);
        assert_eq!(at0.len(), 1);
        assert_eq!(at0[0].0, "tautology");
        assert_eq!(at0[0].1, sys.props()[0].term);
    }

    #[test]
    fn status_updates_are_monotonic() {
        let mut pool = TermPool::new();
        let mut sys = flip_sys(&mut pool);
        assert_eq!(sys.prop_status("tautology"), PropertyStatus::Unknown);
        assert!(sys.set_prop_status("tautology", PropertyStatus::KTrue(2)));
        assert!(!sys.set_prop_status("tautology", PropertyStatus::KTrue(1)));
        assert!(sys.set_prop_status("tautology", PropertyStatus::Invariant));
        assert!(!sys.set_prop_status("tautology", PropertyStatus::Falsified(Trace::new())));
        assert_eq!(sys.prop_status("tautology"), PropertyStatus::Invariant);
    }

    #[test]
    fn unknown_property_names_are_ignored() {
        let mut pool = TermPool::new();
        let mut sys = flip_sys(&mut pool);
        assert!(!sys.set_prop_status("nope", PropertyStatus::Invariant));
        assert_eq!(sys.prop_status("nope"), PropertyStatus::Unknown);
    }

    #[test]
    fn declare_of_bounds_covers_every_offset_once() {
        let mut pool = TermPool::new();
        let mut sys = flip_sys(&mut pool);
        let mut solver = ScriptedSolver::new();
        sys.define_and_declare_of_bounds(&pool, &mut solver, 0, 2)
            .unwrap();
        let declared: Vec<Var> = solver
            .log
            .iter()
            .filter_map(|r| match r {
                Recorded::DeclareVar(v) => Some(*v),
                _ => None,
            })
            .collect();
        let flag = sys.state_vars()[0];
        assert_eq!(declared, vec![flag.at(0), flag.at(1), flag.at(2)]);
    }

    #[test]
    fn path_from_model_reads_each_step() {
        let mut pool = TermPool::new();
        let sys = flip_sys(&mut pool);
        let flag = sys.state_vars()[0];
        let mut model = Model::new();
        model.insert(flag.at(0), Value::Bool(false));
        model.insert(flag.at(1), Value::Bool(true));
        let trace = sys.path_from_model(&pool, &model, 1);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.value_at(0, flag.at(0)), Some(Value::Bool(false)));
        assert_eq!(trace.value_at(1, flag.at(1)), Some(Value::Bool(true)));
    }
}
