//! Path compression for the step engine.
//!
//! A step counterexample that revisits a state is never a shortest real
//! counterexample, so the step context may restrict itself to loop-free
//! paths. Given a model of the current unrolling, the oracle looks for pairs
//! of offsets valuing every (non-input, non-constant) state variable
//! identically and emits, for each fresh pair, a constraint forbidding that
//! repetition. An empty result means no compression applied.

use std::collections::HashSet;

use vigil_sys::TransSys;
use vigil_term::{Model, SvarId, TermId, TermPool};

/// The compression oracle. One per step engine; remembers which offset
/// pairs it has already constrained so every returned set is fresh.
#[derive(Debug)]
pub struct Compressor {
    enabled: bool,
    svars: Vec<SvarId>,
    seen: HashSet<(i64, i64)>,
}

impl Compressor {
    /// Builds the oracle over the system's comparable state variables.
    pub fn new(enabled: bool, pool: &TermPool, sys: &TransSys) -> Self {
        let svars = sys
            .state_vars()
            .iter()
            .copied()
            .filter(|&sv| {
                let sv = pool.state_var(sv);
                !sv.is_input && !sv.is_const
            })
            .collect();
        Compressor {
            enabled,
            svars,
            seen: HashSet::new(),
        }
    }

    /// `true` if the oracle will ever produce constraints.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Constraints ruling out the duplicate states of `model` over offsets
    /// `0..=k`; empty if compression does not apply.
    pub fn constraints(
        &mut self,
        pool: &mut TermPool,
        model: &Model,
        k: i64,
    ) -> Vec<TermId> {
        if !self.enabled || self.svars.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for i in 0..k {
            for j in (i + 1)..=k {
                if self.seen.contains(&(i, j)) || !self.states_equal(model, i, j) {
                    continue;
                }
                self.seen.insert((i, j));
                let mut eqs = Vec::with_capacity(self.svars.len());
                for &sv in &self.svars {
                    let a = pool.mk_var(sv.at(i));
                    let b = pool.mk_var(sv.at(j));
                    eqs.push(pool.mk_eq(a, b));
                }
                let same = pool.mk_and(eqs);
                out.push(pool.mk_not(same));
            }
        }
        out
    }

    fn states_equal(&self, model: &Model, i: i64, j: i64) -> bool {
        self.svars.iter().all(|&sv| {
            match (model.get(sv.at(i)), model.get(sv.at(j))) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_sys::Property;
    use vigil_term::{Sort, StateVar, Value};

    fn two_var_sys(pool: &mut TermPool) -> TransSys {
        let a = pool.declare_state_var(StateVar::new("a", ["m"], Sort::Bool));
        let b = pool.declare_state_var(StateVar::new("b", ["m"], Sort::Bool));
        let va = pool.mk_var(a.at(0));
        let t = pool.mk_true();
        TransSys::new(
            "two",
            "QF_UF",
            vec![a, b],
            va,
            t,
            vec![Property::new("p", va)],
            vec![],
        )
    }

    fn model_of(states: &[(bool, bool)], sys: &TransSys) -> Model {
        let a = sys.state_vars()[0];
        let b = sys.state_vars()[1];
        let mut model = Model::new();
        for (i, &(va, vb)) in states.iter().enumerate() {
            model.insert(a.at(i as i64), Value::Bool(va));
            model.insert(b.at(i as i64), Value::Bool(vb));
        }
        model
    }

    #[test]
    fn distinct_states_yield_no_constraints() {
        let mut pool = TermPool::new();
        let sys = two_var_sys(&mut pool);
        let mut compressor = Compressor::new(true, &pool, &sys);
        let model = model_of(&[(false, false), (true, false)], &sys);
        assert!(compressor.constraints(&mut pool, &model, 1).is_empty());
    }

    #[test]
    fn duplicate_states_are_constrained_once() {
        let mut pool = TermPool::new();
        let sys = two_var_sys(&mut pool);
        let mut compressor = Compressor::new(true, &pool, &sys);
        let model = model_of(&[(true, false), (true, false)], &sys);
        let first = compressor.constraints(&mut pool, &model, 1);
        assert_eq!(first.len(), 1);
        // the same pair is never emitted again
        let second = compressor.constraints(&mut pool, &model, 1);
        assert!(second.is_empty());
    }

    #[test]
    fn all_duplicate_pairs_are_found() {
        let mut pool = TermPool::new();
        let sys = two_var_sys(&mut pool);
        let mut compressor = Compressor::new(true, &pool, &sys);
        let model = model_of(
            &[(false, false), (true, true), (false, false)],
            &sys,
        );
        let out = compressor.constraints(&mut pool, &model, 2);
        // only the (0, 2) pair repeats
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn disabled_oracle_is_silent() {
        let mut pool = TermPool::new();
        let sys = two_var_sys(&mut pool);
        let mut compressor = Compressor::new(false, &pool, &sys);
        assert!(!compressor.is_enabled());
        let model = model_of(&[(true, false), (true, false)], &sys);
        assert!(compressor.constraints(&mut pool, &model, 1).is_empty());
    }

    #[test]
    fn inputs_are_ignored_when_comparing_states() {
        let mut pool = TermPool::new();
        let a = pool.declare_state_var(StateVar::new("a", ["m"], Sort::Bool));
        let i = pool.declare_state_var(StateVar::new("i", ["m"], Sort::Bool).input());
        let va = pool.mk_var(a.at(0));
        let t = pool.mk_true();
        let sys = TransSys::new(
            "inp",
            "QF_UF",
            vec![a, i],
            va,
            t,
            vec![Property::new("p", va)],
            vec![],
        );
        let mut compressor = Compressor::new(true, &pool, &sys);
        let mut model = Model::new();
        // `a` repeats while the input differs; the states still compress
        model.insert(a.at(0), Value::Bool(true));
        model.insert(a.at(1), Value::Bool(true));
        model.insert(i.at(0), Value::Bool(false));
        model.insert(i.at(1), Value::Bool(true));
        let out = compressor.constraints(&mut pool, &model, 1);
        assert_eq!(out.len(), 1);
    }
}
