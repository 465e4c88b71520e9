//! Counterexample refinement: simulation and sequence interpolation.

use vigil_smt::{SmtSolver, SolverConfig};
use vigil_sys::Mailbox;
use vigil_term::{TermData, TermId};

use crate::error::{EngineError, EngineResult};

use super::Ic3ia;

/// What refinement made of an abstract counterexample path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Refinement {
    /// The abstraction grew; retry the block phase.
    Refined,
    /// The path concretizes; the property is falsified.
    Concrete(vigil_sys::Trace),
}

impl<S: SmtSolver, M: Mailbox> Ic3ia<S, M> {
    /// Simulates the abstract path (earliest cube first); if it cannot be
    /// concretized, grows the abstraction with the atoms of the sequence
    /// interpolants of the concretized unrolling.
    pub(crate) fn refine(
        &mut self,
        path: Vec<Vec<TermId>>,
    ) -> EngineResult<Refinement> {
        let steps = path.len() as i64 - 1;
        self.declare_offset_through(steps)?;

        // Simulation: cubes and couplings at their offsets, transitions in
        // between, everything behind fresh guards.
        let mut conjuncts = Vec::new();
        for (i, cube) in path.iter().enumerate() {
            let offset = i as i64;
            let conj = self.pool.mk_and(cube.clone());
            let at = self.pool.bump(conj, offset);
            conjuncts.push(at);
            let h = self.couplings(offset);
            conjuncts.extend(h);
        }
        for i in 1..=steps {
            let t = self.sys.trans_of_bound(&mut self.pool, i);
            conjuncts.push(t);
        }
        let assumptions = self.assert_gated(conjuncts)?;
        if self
            .solver
            .check_sat_assuming(&self.pool, &assumptions)?
            .is_sat()
        {
            let model = self.solver.get_model(&self.pool)?;
            let trace = self.sys.path_from_model(&self.pool, &model, steps);
            log::info!(
                "abstract counterexample of length {} is concrete",
                steps + 1
            );
            return Ok(Refinement::Concrete(trace));
        }

        // Interpolation over the concretized path: A_0 = path_0,
        // A_i = T[i-1, i] ∧ path_i@i, all named, checked unsat, then the
        // sequence interpolants are read back.
        self.solver.push()?;
        let mut names = Vec::with_capacity(path.len());
        for (i, cube) in path.iter().enumerate() {
            let offset = i as i64;
            let conj = self.pool.mk_and(cube.clone());
            let concrete = self.abv.concretize(&mut self.pool, conj);
            let group = if i == 0 {
                concrete
            } else {
                let shifted = self.pool.bump(concrete, offset);
                let t = self.sys.trans_of_bound(&mut self.pool, offset);
                self.pool.mk_and(vec![t, shifted])
            };
            let name = format!("itp{}", i);
            self.solver.assert_named(&self.pool, group, &name)?;
            names.push(name);
        }
        if self
            .solver
            .check_sat_assuming(&self.pool, &[])?
            .is_sat()
        {
            return Err(EngineError::Inconsistency(
                "interpolation query satisfiable after unsat simulation",
            ));
        }
        let interpolants = self.solver.get_interpolants(&mut self.pool, &names)?;
        self.solver.pop()?;

        let mut new_atoms = Vec::new();
        for (i, &interpolant) in interpolants.iter().enumerate() {
            let at_zero = self.pool.bump(interpolant, -(i as i64));
            match self.pool.term(at_zero) {
                TermData::True => continue,
                TermData::False => {
                    log::warn!(
                        "unexpected false interpolant at frontier {}; dropped",
                        i
                    );
                    continue;
                }
                _ => {}
            }
            new_atoms.extend(self.pool.atoms(at_zero));
        }

        let fresh = self.abv.update(&mut self.pool, &new_atoms);
        if fresh.is_empty() {
            return Err(EngineError::Inconsistency(
                "refinement produced no new predicates",
            ));
        }
        for &atom in &new_atoms {
            if !self.preds.contains(&atom) {
                self.preds.push(atom);
            }
        }
        for &svar in &fresh {
            for offset in 0..=self.declared_to {
                self.solver.declare_var(&self.pool, svar.at(offset))?;
            }
        }
        log::debug!(
            "abstraction refined with {} new predicate atom(s), {} tracked",
            fresh.len(),
            self.abv.len()
        );
        Ok(Refinement::Refined)
    }
}

/// The solver capabilities IC3IA needs from its backend.
pub fn required_solver_config() -> SolverConfig {
    SolverConfig {
        produce_assignments: true,
        produce_cores: true,
        produce_interpolants: true,
        timeout_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Ic3Config;
    use vigil_smt::{Assignments, Model, ScriptedSolver};
    use vigil_sys::{Property, QueueMailbox, TransSys};
    use vigil_term::{Sort, StateVar, TermPool, Value};

    /// One tracked variable `x` plus a spare `y` the abstraction does not
    /// know about; `I = ¬x`, `T = x' ↔ x`, `P = ¬x`.
    fn engine_with_spare_var(
    ) -> (Ic3ia<ScriptedSolver, QueueMailbox>, TermId, TermId) {
        let mut pool = TermPool::new();
        let x = pool.declare_state_var(StateVar::new("x", ["m"], Sort::Bool));
        let y = pool.declare_state_var(StateVar::new("y", ["m"], Sort::Bool));
        let vx0 = pool.mk_var(x.at(0));
        let vx1 = pool.mk_var(x.at(1));
        let init = pool.mk_not(vx0);
        let trans = pool.mk_iff(vx1, vx0);
        let prop = Property::new("safe", init);
        let sys = TransSys::new(
            "spare",
            "QF_UF",
            vec![x, y],
            init,
            trans,
            vec![prop],
            vec![],
        );
        let y0 = pool.mk_var(y.at(0));
        let y1 = pool.mk_var(y.at(1));
        let engine = Ic3ia::new(
            pool,
            sys,
            "safe",
            ScriptedSolver::new(),
            QueueMailbox::new(),
            Ic3Config::default(),
        )
        .unwrap();
        (engine, y0, y1)
    }

    fn abvar_cube(engine: &Ic3ia<ScriptedSolver, QueueMailbox>, positive: bool) -> Vec<TermId> {
        let entry = &engine.abv.entries()[0];
        vec![if positive { entry.pos } else { entry.neg }]
    }

    #[test]
    fn concretizable_path_is_a_counterexample() {
        let (mut engine, _, _) = engine_with_spare_var();
        let cube = abvar_cube(&engine, true);
        let mut model = Model::new();
        let x = engine.sys.state_vars()[0];
        model.insert(x.at(0), Value::Bool(true));
        engine.solver.enqueue_sat(Assignments::new(), model);
        match engine.refine(vec![cube]).unwrap() {
            Refinement::Concrete(trace) => assert_eq!(trace.len(), 1),
            Refinement::Refined => panic!("expected a concrete counterexample"),
        }
    }

    #[test]
    fn interpolants_grow_the_abstraction() {
        let (mut engine, y0, _) = engine_with_spare_var();
        let before = engine.abv.len();
        let c0 = abvar_cube(&engine, false);
        let c1 = abvar_cube(&engine, true);
        engine.solver.enqueue_unsat(); // simulation
        engine.solver.enqueue_unsat_with_interpolants(vec![y0]);
        match engine.refine(vec![c0, c1]).unwrap() {
            Refinement::Refined => {}
            Refinement::Concrete(_) => panic!("expected refinement"),
        }
        assert_eq!(engine.abv.len(), before + 1);
        assert!(engine.preds.contains(&y0));
    }

    #[test]
    fn interpolants_are_unbumped_to_offset_zero() {
        let (mut engine, y0, y1) = engine_with_spare_var();
        let c0 = abvar_cube(&engine, false);
        let c1 = abvar_cube(&engine, true);
        let c2 = abvar_cube(&engine, true);
        engine.solver.enqueue_unsat();
        // the frontier-1 interpolant arrives at offset 1
        let t = engine.pool.mk_true();
        engine
            .solver
            .enqueue_unsat_with_interpolants(vec![t, y1]);
        match engine.refine(vec![c0, c1, c2]).unwrap() {
            Refinement::Refined => {}
            Refinement::Concrete(_) => panic!("expected refinement"),
        }
        // y@1 unbumped by -1 is y@0
        assert!(engine.preds.contains(&y0));
        assert!(!engine.preds.contains(&y1));
    }

    #[test]
    fn false_interpolants_are_dropped_not_tracked() {
        let (mut engine, y0, y1) = engine_with_spare_var();
        let c0 = abvar_cube(&engine, false);
        let c1 = abvar_cube(&engine, true);
        let c2 = abvar_cube(&engine, true);
        engine.solver.enqueue_unsat();
        let f = engine.pool.mk_false();
        engine
            .solver
            .enqueue_unsat_with_interpolants(vec![f, y1]);
        match engine.refine(vec![c0, c1, c2]).unwrap() {
            Refinement::Refined => {}
            Refinement::Concrete(_) => panic!("expected refinement"),
        }
        assert!(!engine.preds.contains(&f));
        assert!(engine.preds.contains(&y0));
    }

    #[test]
    fn refinement_without_new_predicates_is_inconsistent() {
        let (mut engine, _, _) = engine_with_spare_var();
        let c0 = abvar_cube(&engine, false);
        let c1 = abvar_cube(&engine, true);
        engine.solver.enqueue_unsat();
        let t = engine.pool.mk_true();
        engine.solver.enqueue_unsat_with_interpolants(vec![t]);
        assert_eq!(
            engine.refine(vec![c0, c1]),
            Err(EngineError::Inconsistency(
                "refinement produced no new predicates"
            ))
        );
    }

    #[test]
    fn new_abvars_are_declared_at_every_live_offset() {
        let (mut engine, y0, _) = engine_with_spare_var();
        let c0 = abvar_cube(&engine, false);
        let c1 = abvar_cube(&engine, true);
        engine.solver.enqueue_unsat();
        engine.solver.enqueue_unsat_with_interpolants(vec![y0]);
        engine.refine(vec![c0, c1]).unwrap();
        let fresh = engine.abv.entries().last().unwrap().svar;
        let declared: Vec<i64> = engine
            .solver
            .log
            .iter()
            .filter_map(|r| match r {
                vigil_smt::Recorded::DeclareVar(v) if v.svar == fresh => Some(v.offset),
                _ => None,
            })
            .collect();
        assert_eq!(declared, vec![0, 1]);
    }

    #[test]
    fn required_config_requests_interpolants() {
        let conf = required_solver_config();
        assert!(conf.produce_assignments);
        assert!(conf.produce_cores);
        assert!(conf.produce_interpolants);
    }
}
