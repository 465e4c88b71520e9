//! IC3 with implicit predicate abstraction.
//!
//! The engine checks one property per instance. State is abstracted over a
//! growing set of predicate atoms: each atom is coupled to a fresh boolean
//! *abvar*, frames and cubes live entirely in the abvar world, and the
//! concrete transition relation rides along on a parallel set of *cloned*
//! variables so a single solver context answers both abstract and concrete
//! questions. A spurious abstract counterexample is ruled out by simulation
//! and repaired by sequence interpolation, which supplies the new predicate
//! atoms.
//!
//! Every per-query conjunct is gated behind a fresh activation literal;
//! nothing is ever retracted.

mod abstraction;
mod frames;
mod refine;

use vigil_smt::{ActlitFactory, SatOutcome, SmtError, SmtSolver};
use vigil_sys::{update_trans_sys, Mailbox, Property, PropertyStatus, Trace, TransSys};
use vigil_term::{TermId, TermPool};

use crate::config::Ic3Config;
use crate::error::{EngineError, EngineResult};

use abstraction::{AbvarMap, CloneMap};
use frames::Frames;
use refine::Refinement;

pub use refine::required_solver_config;

/// Verdict of an IC3IA run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ic3Outcome {
    /// The property is invariant.
    Proved,
    /// The property is falsified by the trace.
    Falsified(Trace),
}

enum BlockResult {
    Blocked,
    Cex(Trace),
}

/// The IC3IA engine for a single property.
pub struct Ic3ia<S: SmtSolver, M: Mailbox> {
    pool: TermPool,
    sys: TransSys,
    solver: S,
    bus: M,
    conf: Ic3Config,
    actlits: ActlitFactory,

    prop: Property,
    /// The tracked predicate set Π; seeded with `I` and `P`, grown by
    /// refinement.
    preds: Vec<TermId>,
    abv: AbvarMap,
    clones: CloneMap,
    frames: Frames,
    declared_to: i64,
}

impl<S: SmtSolver, M: Mailbox> Ic3ia<S, M> {
    /// Sets up abstraction, clones, declarations at offsets 0 and 1, and
    /// the frame sequence `[∅, [I']]`.
    pub fn new(
        mut pool: TermPool,
        mut sys: TransSys,
        prop_name: &str,
        mut solver: S,
        bus: M,
        conf: Ic3Config,
    ) -> EngineResult<Self> {
        let prop = sys
            .props()
            .iter()
            .find(|p| p.name == prop_name)
            .cloned()
            .ok_or_else(|| EngineError::NoSuchProperty(prop_name.to_string()))?;

        let init = sys.init();
        let mut preds = vec![init];
        if prop.term != init {
            preds.push(prop.term);
        }

        let mut abv = AbvarMap::new();
        abv.update(&mut pool, &preds);
        let clones = CloneMap::build(&mut pool, sys.state_vars());

        sys.define_and_declare_of_bounds(&pool, &mut solver, 0, 1)?;
        for offset in 0..=1 {
            declare_parallel_vars(&pool, &mut solver, &clones, &abv, offset)?;
        }

        let i_abs = abv.abstract_term(&mut pool, init);
        let frames = Frames::new(i_abs);

        Ok(Ic3ia {
            pool,
            sys,
            solver,
            bus,
            conf,
            actlits: ActlitFactory::new(),
            prop,
            preds,
            abv,
            clones,
            frames,
            declared_to: 1,
        })
    }

    /// The solver, for inspection.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// The mailbox, for inspection.
    pub fn mailbox(&self) -> &M {
        &self.bus
    }

    /// The term pool, for inspection.
    pub fn pool(&self) -> &TermPool {
        &self.pool
    }

    /// Runs the engine to a verdict.
    pub fn run(&mut self) -> EngineResult<Ic3Outcome> {
        if let Some(trace) = self.check_init()? {
            log::info!(
                "property '{}' falsified in the initial states",
                self.prop.name
            );
            self.publish_falsified(trace.clone());
            return Ok(Ic3Outcome::Falsified(trace));
        }

        loop {
            let events = self.bus.recv();
            let digest = update_trans_sys(&mut self.sys, events);
            self.absorb_invariants(&digest.invariants)?;
            match self.sys.prop_status(&self.prop.name) {
                PropertyStatus::Invariant => return Ok(Ic3Outcome::Proved),
                PropertyStatus::Falsified(trace) => {
                    return Ok(Ic3Outcome::Falsified(trace))
                }
                _ => {}
            }

            log::debug!(
                "block phase at frame {} ({} predicate atom(s))",
                self.frames.top(),
                self.abv.len()
            );
            match self.block()? {
                BlockResult::Cex(trace) => {
                    self.publish_falsified(trace.clone());
                    return Ok(Ic3Outcome::Falsified(trace));
                }
                BlockResult::Blocked => {}
            }

            if self.propagate()? {
                log::info!(
                    "property '{}' is invariant (fixpoint within {} frames)",
                    self.prop.name,
                    self.frames.top() + 1
                );
                self.bus
                    .send_status(&self.prop.name, PropertyStatus::Invariant);
                self.sys
                    .set_prop_status(&self.prop.name, PropertyStatus::Invariant);
                return Ok(Ic3Outcome::Proved);
            }

            let top = self.frames.top();
            if let Some(max) = self.conf.max_frames {
                if top >= max {
                    return Err(EngineError::FrameLimit(max));
                }
            }
            self.declare_offset_through(top as i64 + 1)?;
            self.frames.push_frame();
        }
    }

    fn publish_falsified(&mut self, trace: Trace) {
        self.bus
            .send_status(&self.prop.name, PropertyStatus::Falsified(trace.clone()));
        self.sys
            .set_prop_status(&self.prop.name, PropertyStatus::Falsified(trace));
    }

    /// The setup entailment check `I ∧ ⋀H ⊨ P`; a sat answer is an
    /// immediate length-one counterexample.
    fn check_init(&mut self) -> EngineResult<Option<Trace>> {
        let i_abs = self.init_abs();
        let p_abs = self.prop_abs();
        let np = self.pool.mk_not(p_abs);
        let mut conjuncts = self.couplings(0);
        conjuncts.push(i_abs);
        conjuncts.push(np);
        let assumptions = self.assert_gated(conjuncts)?;
        match self.solver.check_sat_assuming(&self.pool, &assumptions)? {
            SatOutcome::Sat => {
                let model = self.solver.get_model(&self.pool)?;
                Ok(Some(self.sys.path_from_model(&self.pool, &model, 0)))
            }
            SatOutcome::Unsat => Ok(None),
        }
    }

    /// Blocks every abstract bad state of the top frame, refining the
    /// abstraction as needed.
    fn block(&mut self) -> EngineResult<BlockResult> {
        loop {
            let top = self.frames.top();
            let mut conjuncts = self.frames.content(top);
            let h = self.couplings(0);
            conjuncts.extend(h);
            let p_abs = self.prop_abs();
            let np = self.pool.mk_not(p_abs);
            conjuncts.push(np);
            let assumptions = self.assert_gated(conjuncts)?;

            let abvar_terms: Vec<TermId> =
                self.abv.entries().iter().map(|e| e.pos).collect();
            match self.solver.check_sat_assuming(&self.pool, &assumptions)? {
                SatOutcome::Unsat => return Ok(BlockResult::Blocked),
                SatOutcome::Sat => {
                    let values = self.solver.get_values(&self.pool, &abvar_terms)?;
                    let cube = self.cube_of_values(&values)?;
                    match self.recblock(cube)? {
                        None => continue,
                        Some(path) => match self.refine(path)? {
                            Refinement::Concrete(trace) => {
                                return Ok(BlockResult::Cex(trace))
                            }
                            Refinement::Refined => continue,
                        },
                    }
                }
            }
        }
    }

    /// Discharges one bad cube by recursive blocking, as an explicit
    /// worklist over `(level, path)` obligations.
    ///
    /// Returns the abstract counterexample path (earliest cube first) if an
    /// obligation reaches the initial frame.
    fn recblock(
        &mut self,
        cube: Vec<TermId>,
    ) -> EngineResult<Option<Vec<Vec<TermId>>>> {
        let top = self.frames.top();
        let mut stack: Vec<(usize, Vec<Vec<TermId>>)> = vec![(top, vec![cube])];
        while let Some((level, path)) = stack.pop() {
            let cube = path[0].clone();
            if level <= 1 || self.intersects_initial(&cube)? {
                return Ok(Some(path));
            }
            match self.abs_rel_ind(level - 1, &cube)? {
                None => {
                    let clause = self.generalize(level - 1, &cube)?;
                    self.frames.add_clause(level, clause);
                }
                Some(cti) => {
                    let mut longer = path.clone();
                    longer.insert(0, cti);
                    stack.push((level, path));
                    stack.push((level - 1, longer));
                }
            }
        }
        Ok(None)
    }

    /// The relative-induction query: sat of
    /// `F ∧ ¬c ∧ H ∧ H' ∧ T(γ) ∧ E_Π ∧ E_Π' ∧ c'`.
    ///
    /// Returns `None` when `¬c` is inductive relative to the frame at
    /// `frame_level`, or the counterexample-to-induction cube otherwise.
    fn abs_rel_ind(
        &mut self,
        frame_level: usize,
        cube: &[TermId],
    ) -> EngineResult<Option<Vec<TermId>>> {
        let mut conjuncts = self.frames.content(frame_level);
        let cube_conj = self.pool.mk_and(cube.to_vec());
        let clause = self.pool.mk_not(cube_conj);
        conjuncts.push(clause);
        let h0 = self.couplings(0);
        conjuncts.extend(h0);
        let h1 = self.couplings(1);
        conjuncts.extend(h1);
        let t_clone = self.clone_trans();
        conjuncts.push(t_clone);
        let e0 = self.pred_couplings(0);
        conjuncts.extend(e0);
        let e1 = self.pred_couplings(1);
        conjuncts.extend(e1);
        let cube_next = self.pool.bump(cube_conj, 1);
        conjuncts.push(cube_next);
        let assumptions = self.assert_gated(conjuncts)?;

        let lits: Vec<(TermId, TermId)> = self
            .abv
            .entries()
            .iter()
            .map(|e| (e.pos, e.neg))
            .collect();
        let terms: Vec<TermId> = lits.iter().map(|&(pos, _)| pos).collect();
        let cti = self.solver.check_sat_assuming_and_get_term_values(
            &self.pool,
            &assumptions,
            &terms,
            |_, _, values| {
                let mut cube = Vec::with_capacity(lits.len());
                for &(pos, neg) in &lits {
                    match values.bool_of(pos) {
                        Some(true) => cube.push(pos),
                        Some(false) => cube.push(neg),
                        None => {
                            return Err(SmtError::Backend(
                                "abvar valuation missing".into(),
                            ))
                        }
                    }
                }
                Ok(Some(cube))
            },
            |_, _| Ok(None),
        )?;
        Ok(cti)
    }

    /// Shrinks a blocked cube literal by literal; a literal stays if
    /// dropping it breaks relative induction or lets the clause clip an
    /// initial state.
    fn generalize(
        &mut self,
        frame_level: usize,
        cube: &[TermId],
    ) -> EngineResult<TermId> {
        let mut lits: Vec<TermId> = cube.to_vec();
        if self.conf.generalize {
            for &lit in cube {
                if lits.len() == 1 {
                    break;
                }
                if !lits.contains(&lit) {
                    continue;
                }
                let reduced: Vec<TermId> =
                    lits.iter().copied().filter(|&l| l != lit).collect();
                if self.intersects_initial(&reduced)? {
                    continue;
                }
                if self.abs_rel_ind(frame_level, &reduced)?.is_none() {
                    lits = reduced;
                }
            }
        }
        let conj = self.pool.mk_and(lits);
        Ok(self.pool.mk_not(conj))
    }

    /// Sat of `I' ∧ ⋀lits`: does the (partial) cube contain an abstract
    /// initial state?
    fn intersects_initial(&mut self, lits: &[TermId]) -> EngineResult<bool> {
        let i_abs = self.init_abs();
        let mut conjuncts = vec![i_abs];
        conjuncts.extend(lits.iter().copied());
        let assumptions = self.assert_gated(conjuncts)?;
        Ok(self
            .solver
            .check_sat_assuming(&self.pool, &assumptions)?
            .is_sat())
    }

    /// Pushes clauses forward frame by frame; `true` means a store drained
    /// and the fixpoint is reached.
    fn propagate(&mut self) -> EngineResult<bool> {
        let top = self.frames.top();
        for i in 1..top {
            if self.frames.store(i).is_empty() {
                log::debug!("frame {} already empty; fixpoint", i);
                return Ok(true);
            }
            let clauses = self.frames.store(i).to_vec();
            let (keep, movers) = self.partition_absrelind(i, clauses)?;
            let drained = keep.is_empty();
            self.frames.replace_store(i, keep);
            self.frames.extend_store(i + 1, movers);
            if drained {
                log::debug!("frame {} drained by propagation; fixpoint", i);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Partitions a store into `(keep, propagate)` by iterated
    /// relative-induction checks with model-directed filtering.
    fn partition_absrelind(
        &mut self,
        level: usize,
        clauses: Vec<TermId>,
    ) -> EngineResult<(Vec<TermId>, Vec<TermId>)> {
        let frame = self.frames.content(level);
        let mut keep = Vec::new();
        let mut maybe = clauses;
        while !maybe.is_empty() {
            let mut conjuncts = frame.clone();
            let c = self.pool.mk_and(maybe.clone());
            conjuncts.push(c);
            let h0 = self.couplings(0);
            conjuncts.extend(h0);
            let h1 = self.couplings(1);
            conjuncts.extend(h1);
            let t_clone = self.clone_trans();
            conjuncts.push(t_clone);
            let e0 = self.pred_couplings(0);
            conjuncts.extend(e0);
            let e1 = self.pred_couplings(1);
            conjuncts.extend(e1);
            let c_next = self.pool.bump(c, 1);
            let nc = self.pool.mk_not(c_next);
            conjuncts.push(nc);
            let assumptions = self.assert_gated(conjuncts)?;

            let mut primed = Vec::with_capacity(maybe.len());
            for &cl in &maybe {
                primed.push(self.pool.bump(cl, 1));
            }
            match self.solver.check_sat_assuming(&self.pool, &assumptions)? {
                SatOutcome::Unsat => return Ok((keep, maybe)),
                SatOutcome::Sat => {
                    let values = self.solver.get_values(&self.pool, &primed)?;
                    let mut still = Vec::new();
                    let mut moved = false;
                    for (&cl, &pr) in maybe.iter().zip(primed.iter()) {
                        match values.bool_of(pr) {
                            Some(true) => still.push(cl),
                            Some(false) => {
                                keep.push(cl);
                                moved = true;
                            }
                            None => {
                                return Err(EngineError::Inconsistency(
                                    "clause valuation missing from propagation model",
                                ))
                            }
                        }
                    }
                    if !moved {
                        return Err(EngineError::Inconsistency(
                            "propagation query made no progress",
                        ));
                    }
                    maybe = still;
                }
            }
        }
        Ok((keep, maybe))
    }

    /// Asserts upstream invariants over both the concrete and the cloned
    /// variables, at offsets 0 and 1.
    fn absorb_invariants(&mut self, invariants: &[TermId]) -> EngineResult<()> {
        for &inv in invariants {
            let cloned = self.clones.clone_term(&mut self.pool, inv);
            for t in [inv, cloned] {
                for offset in 0..=1 {
                    let at = self.pool.bump(t, offset);
                    self.solver.assert_term(&self.pool, at)?;
                }
            }
        }
        Ok(())
    }

    // ---- Query building blocks ----

    fn init_abs(&mut self) -> TermId {
        let init = self.sys.init();
        self.abv.abstract_term(&mut self.pool, init)
    }

    fn prop_abs(&mut self) -> TermId {
        let prop = self.prop.term;
        self.abv.abstract_term(&mut self.pool, prop)
    }

    fn couplings(&mut self, offset: i64) -> Vec<TermId> {
        self.abv.couplings(&mut self.pool, offset)
    }

    fn clone_trans(&mut self) -> TermId {
        let trans = self.sys.trans();
        self.clones.clone_term(&mut self.pool, trans)
    }

    /// The predicate couplings `E_Π` at `offset`: `p ↔ γ(p)` for every
    /// tracked predicate.
    fn pred_couplings(&mut self, offset: i64) -> Vec<TermId> {
        let preds = self.preds.clone();
        let mut out = Vec::with_capacity(preds.len());
        for p in preds {
            let cp = self.clones.clone_term(&mut self.pool, p);
            let a = self.pool.bump(p, offset);
            let b = self.pool.bump(cp, offset);
            out.push(self.pool.mk_iff(a, b));
        }
        out
    }

    /// Gates every conjunct behind a fresh activation literal; returns the
    /// assumption set enabling them.
    fn assert_gated(&mut self, conjuncts: Vec<TermId>) -> EngineResult<Vec<TermId>> {
        let mut assumptions = Vec::with_capacity(conjuncts.len());
        for conjunct in conjuncts {
            let actlit = self.actlits.fresh(&mut self.pool);
            actlit.declare(&self.pool, &mut self.solver)?;
            let gated = actlit.guard(&mut self.pool, conjunct);
            self.solver.assert_term(&self.pool, gated)?;
            assumptions.push(actlit.term());
        }
        Ok(assumptions)
    }

    /// The abstract state of a sat result, as one literal per abvar.
    fn cube_of_values(
        &self,
        values: &vigil_smt::Assignments,
    ) -> EngineResult<Vec<TermId>> {
        let mut cube = Vec::with_capacity(self.abv.len());
        for entry in self.abv.entries() {
            match values.bool_of(entry.pos) {
                Some(true) => cube.push(entry.pos),
                Some(false) => cube.push(entry.neg),
                None => {
                    return Err(EngineError::Inconsistency(
                        "abvar valuation missing from block model",
                    ))
                }
            }
        }
        Ok(cube)
    }

    fn declare_offset_through(&mut self, to: i64) -> EngineResult<()> {
        while self.declared_to < to {
            self.declared_to += 1;
            let offset = self.declared_to;
            self.sys.define_and_declare_of_bounds(
                &self.pool,
                &mut self.solver,
                offset,
                offset,
            )?;
            declare_parallel_vars(
                &self.pool,
                &mut self.solver,
                &self.clones,
                &self.abv,
                offset,
            )?;
        }
        Ok(())
    }
}

/// Declares the cloned variables and abvars at `offset` (constant clones at
/// offset 0 only).
fn declare_parallel_vars<S: SmtSolver>(
    pool: &TermPool,
    solver: &mut S,
    clones: &CloneMap,
    abv: &AbvarMap,
    offset: i64,
) -> Result<(), SmtError> {
    for &(_, cln) in clones.pairs() {
        if pool.state_var(cln).is_const {
            if offset == 0 {
                solver.declare_var(pool, cln.at(0))?;
            }
        } else {
            solver.declare_var(pool, cln.at(offset))?;
        }
    }
    for entry in abv.entries() {
        solver.declare_var(pool, entry.svar.at(offset))?;
    }
    Ok(())
}
