//! The k-induction step engine.
//!
//! The engine maintains, for a growing `k`, the inductive-step context: the
//! transition relation unrolled through offset `k`, every learned invariant
//! asserted at offsets `0..k-1`, and every candidate property asserted at
//! offsets `0..k-1` gated behind its canonical activation literal. The
//! characteristic check asks whether some candidate can be falsified at
//! offset `k` under those hypotheses; candidates that cannot are promoted to
//! *optimistic* and wait for the companion BMC engine to confirm their base
//! case through the event bus.
//!
//! Nothing is ever retracted from the solver. Per-query conjuncts are gated
//! behind fresh activation literals, so backtracking after an upstream
//! falsification taints the optimistic set is just a matter of never
//! assuming a stale literal again.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use vigil_smt::{Actlit, ActlitFactory, SatOutcome, SmtSolver};
use vigil_sys::{update_trans_sys, Mailbox, Property, PropertyStatus, TransSys};
use vigil_term::{TermId, TermPool};

use crate::compress::Compressor;
use crate::config::KindConfig;
use crate::error::{EngineError, EngineResult};

/// What a finished step-engine run established.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindOutcome {
    /// Properties this engine proved invariant (confirmed and published).
    pub proved: Vec<String>,
    /// Properties another technique falsified while we worked.
    pub falsified_upstream: Vec<String>,
    /// Properties still open when the run stopped.
    pub pending: Vec<String>,
}

/// Index of the first `true` flag, if any.
///
/// `None` exactly when every flag is `false`.
fn index_of_true(flags: &[bool]) -> Option<usize> {
    flags.iter().position(|&b| b)
}

enum ConfirmResult {
    /// Every surviving optimistic property was published invariant.
    Done,
    /// A fresh falsification tainted the optimistic set; the main loop
    /// resumes at the decremented `k`.
    Retaint,
    /// The bus closed (or the poll limit ran out) before confirmation.
    Abort,
}

/// The k-induction step engine over a batch of properties.
pub struct Kind<S: SmtSolver, M: Mailbox> {
    pool: TermPool,
    sys: TransSys,
    solver: S,
    bus: M,
    conf: KindConfig,
    actlits: ActlitFactory,
    compressor: Compressor,

    k: u64,
    invariants: Vec<TermId>,
    unknowns: Vec<Property>,
    optimistics: Vec<Property>,
    prop_actlits: HashMap<String, Actlit>,

    proved: Vec<String>,
    falsified_upstream: Vec<String>,

    // High-water marks keeping re-assertion after backtracking
    // duplicate-free.
    declared_to: i64,
    trans_to: u64,
    invars_to: i64,
    prop_to: HashMap<String, i64>,
}

impl<S: SmtSolver, M: Mailbox> Kind<S, M> {
    /// Sets up the step context: declarations at offset 0, function
    /// definitions, one canonical activation literal per property.
    pub fn new(
        mut pool: TermPool,
        mut sys: TransSys,
        mut solver: S,
        bus: M,
        conf: KindConfig,
    ) -> EngineResult<Self> {
        let actlits = ActlitFactory::new();
        let compressor = Compressor::new(conf.path_compression, &pool, &sys);

        sys.define_and_declare_of_bounds(&pool, &mut solver, 0, 0)?;

        let unknowns: Vec<Property> = sys
            .props_list_of_bound(&mut pool, 0)
            .into_iter()
            .map(|(name, term)| Property::new(name, term))
            .collect();

        let mut prop_actlits = HashMap::new();
        for prop in &unknowns {
            let actlit = actlits.canonical(&mut pool, prop.term);
            actlit.declare(&pool, &mut solver)?;
            prop_actlits.insert(prop.name.clone(), actlit);
        }

        Ok(Kind {
            pool,
            sys,
            solver,
            bus,
            conf,
            actlits,
            compressor,
            k: 1,
            invariants: Vec::new(),
            unknowns,
            optimistics: Vec::new(),
            prop_actlits,
            proved: Vec::new(),
            falsified_upstream: Vec::new(),
            declared_to: 0,
            trans_to: 0,
            invars_to: -1,
            prop_to: HashMap::new(),
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

    /// Runs the step loop to completion.
    pub fn run(&mut self) -> EngineResult<KindOutcome> {
        loop {
            if let Some(max) = self.conf.max_k {
                if self.k > max {
                    log::info!("step engine giving up at k = {}", self.k);
                    return Ok(self.outcome());
                }
            }

            let events = self.bus.recv();
            let digest = update_trans_sys(&mut self.sys, events);
            self.filter_candidates();
            self.add_invariants(&digest.invariants)?;

            if !digest.falsifieds.is_empty() && !self.optimistics.is_empty() {
                // Optimism is tainted: re-open everything and step back.
                log::debug!(
                    "falsification received at k = {}; backtracking",
                    self.k
                );
                let mut opts = std::mem::take(&mut self.optimistics);
                self.unknowns.append(&mut opts);
                self.k = (self.k - 1).max(1);
                continue;
            }

            if self.unknowns.is_empty() && self.optimistics.is_empty() {
                return Ok(self.outcome());
            }

            let k = self.k as i64;
            log::debug!("step iteration at k = {}", k);
            self.ensure_declared(k)?;
            self.assert_transition_to(self.k)?;
            self.assert_invariants_to(k - 1)?;
            self.assert_candidates_to(k - 1)?;

            if !self.unknowns.is_empty() {
                let (unfalsifiable, falsifiable) = self.split_closure(k)?;
                self.optimistics.extend(unfalsifiable);
                self.unknowns = falsifiable;
            }

            if self.unknowns.is_empty() {
                match self.confirm(self.k)? {
                    ConfirmResult::Done => return Ok(self.outcome()),
                    ConfirmResult::Abort => return Ok(self.outcome()),
                    ConfirmResult::Retaint => continue,
                }
            }

            self.k += 1;
        }
    }

    fn outcome(&self) -> KindOutcome {
        let mut pending: Vec<String> =
            self.unknowns.iter().map(|p| p.name.clone()).collect();
        pending.extend(self.optimistics.iter().map(|p| p.name.clone()));
        KindOutcome {
            proved: self.proved.clone(),
            falsified_upstream: self.falsified_upstream.clone(),
            pending,
        }
    }

    /// Drops candidates another technique has decided.
    fn filter_candidates(&mut self) {
        let sys = &self.sys;
        let falsified = &mut self.falsified_upstream;
        let keep = |p: &Property, falsified: &mut Vec<String>| match sys.prop_status(&p.name) {
            PropertyStatus::Invariant => false,
            PropertyStatus::Falsified(_) => {
                falsified.push(p.name.clone());
                false
            }
            _ => true,
        };
        self.unknowns.retain(|p| keep(p, falsified));
        self.optimistics.retain(|p| keep(p, falsified));
    }

    fn ensure_declared(&mut self, to: i64) -> EngineResult<()> {
        if to > self.declared_to {
            self.sys.define_and_declare_of_bounds(
                &self.pool,
                &mut self.solver,
                self.declared_to + 1,
                to,
            )?;
            self.declared_to = to;
        }
        Ok(())
    }

    fn assert_transition_to(&mut self, to: u64) -> EngineResult<()> {
        while self.trans_to < to {
            self.trans_to += 1;
            let t = self
                .sys
                .trans_of_bound(&mut self.pool, self.trans_to as i64);
            self.solver.assert_term(&self.pool, t)?;
        }
        Ok(())
    }

    /// Installs freshly learned invariants at every offset already covered.
    fn add_invariants(&mut self, new: &[TermId]) -> EngineResult<()> {
        for &inv in new {
            for i in 0..=self.invars_to {
                let at = self.pool.bump(inv, i);
                self.solver.assert_term(&self.pool, at)?;
            }
            self.invariants.push(inv);
        }
        Ok(())
    }

    /// Extends every invariant's unconditional assertions through `to`.
    fn assert_invariants_to(&mut self, to: i64) -> EngineResult<()> {
        while self.invars_to < to {
            self.invars_to += 1;
            let offset = self.invars_to;
            let invs = self.invariants.clone();
            for inv in invs {
                let at = self.pool.bump(inv, offset);
                self.solver.assert_term(&self.pool, at)?;
            }
        }
        Ok(())
    }

    /// Extends every candidate's gated assertions through offset `to`.
    fn assert_candidates_to(&mut self, to: i64) -> EngineResult<()> {
        let cands: Vec<(String, TermId)> = self
            .unknowns
            .iter()
            .chain(self.optimistics.iter())
            .map(|p| (p.name.clone(), p.term))
            .collect();
        for (name, term) in cands {
            let actlit = self.prop_actlits[&name];
            let from = self.prop_to.get(&name).copied().unwrap_or(-1) + 1;
            for i in from..=to {
                let at = self.pool.bump(term, i);
                let gated = actlit.guard(&mut self.pool, at);
                self.solver.assert_term(&self.pool, gated)?;
            }
            let hw = self.prop_to.entry(name).or_insert(-1);
            *hw = (*hw).max(to);
        }
        Ok(())
    }

    /// The split-closure: partitions the unknowns into
    /// `(unfalsifiable, falsifiable)` at offset `k`.
    ///
    /// Each closure iteration asserts, behind a fresh literal, the negation
    /// of the remaining candidates at `k` conjoined with the optimistic
    /// candidates at `k`; a sat model either triggers path compression (and
    /// a re-check under the unchanged assumptions) or votes candidates out.
    fn split_closure(
        &mut self,
        k: i64,
    ) -> EngineResult<(Vec<Property>, Vec<Property>)> {
        let mut l = std::mem::take(&mut self.unknowns);
        let mut falsifiable = Vec::new();

        // Canonical literals of every candidate stay assumed throughout.
        let mut base = Vec::with_capacity(l.len() + self.optimistics.len());
        for p in l.iter().chain(self.optimistics.iter()) {
            base.push(self.prop_actlits[&p.name].term());
        }

        // Optimism term M is fixed across closure iterations.
        let opt_terms: Vec<TermId> =
            self.optimistics.iter().map(|p| p.term).collect();
        let mut m_parts = Vec::with_capacity(opt_terms.len());
        for t in opt_terms {
            m_parts.push(self.pool.bump(t, k));
        }
        let m = self.pool.mk_and(m_parts);

        while !l.is_empty() {
            let mut l_at_k = Vec::with_capacity(l.len());
            for p in &l {
                l_at_k.push(self.pool.bump(p.term, k));
            }
            let conj = self.pool.mk_and(l_at_k.clone());
            let n = self.pool.mk_not(conj);
            let body = self.pool.mk_and(vec![n, m]);

            let fresh = self.actlits.fresh(&mut self.pool);
            fresh.declare(&self.pool, &mut self.solver)?;
            let gated = fresh.guard(&mut self.pool, body);
            self.solver.assert_term(&self.pool, gated)?;

            let mut assumptions = base.clone();
            assumptions.push(fresh.term());

            loop {
                match self
                    .solver
                    .check_sat_assuming(&self.pool, &assumptions)?
                {
                    SatOutcome::Unsat => {
                        // Nothing in `l` can be falsified at `k`.
                        return Ok((l, falsifiable));
                    }
                    SatOutcome::Sat => {
                        if self.compressor.is_enabled() {
                            let model = self.solver.get_model(&self.pool)?;
                            let extra = self
                                .compressor
                                .constraints(&mut self.pool, &model, k);
                            if !extra.is_empty() {
                                log::debug!(
                                    "compressing {} duplicate state pair(s) at k = {}",
                                    extra.len(),
                                    k
                                );
                                let conj = self.pool.mk_and(extra);
                                self.solver.assert_term(&self.pool, conj)?;
                                // Same assumptions, tighter search.
                                continue;
                            }
                        }

                        let values =
                            self.solver.get_values(&self.pool, &l_at_k)?;
                        let cur = std::mem::take(&mut l);
                        let mut moved = 0;
                        for (p, t) in cur.into_iter().zip(l_at_k.iter()) {
                            match values.bool_of(*t) {
                                Some(true) => l.push(p),
                                Some(false) => {
                                    falsifiable.push(p);
                                    moved += 1;
                                }
                                None => {
                                    return Err(EngineError::Inconsistency(
                                        "candidate valuation missing from step model",
                                    ))
                                }
                            }
                        }
                        if moved == 0 {
                            return Err(EngineError::Inconsistency(
                                "step model falsifies no candidate despite the closure constraint",
                            ));
                        }
                        break;
                    }
                }
            }
        }
        Ok((l, falsifiable))
    }

    /// Waits for the companion BMC engine to confirm the base case of every
    /// optimistic property, then publishes them invariant.
    fn confirm(&mut self, k: u64) -> EngineResult<ConfirmResult> {
        log::debug!(
            "confirming {} optimistic properties at k = {}",
            self.optimistics.len(),
            k
        );
        let mut polls = 0u64;
        loop {
            if let Some(max) = self.conf.max_confirm_polls {
                if polls >= max {
                    return Ok(ConfirmResult::Abort);
                }
            }
            polls += 1;

            let events = self.bus.recv();
            let digest = update_trans_sys(&mut self.sys, events);
            self.filter_candidates();
            self.add_invariants(&digest.invariants)?;

            if !digest.falsifieds.is_empty() && !self.optimistics.is_empty() {
                let mut opts = std::mem::take(&mut self.optimistics);
                self.unknowns.append(&mut opts);
                self.k = (self.k - 1).max(1);
                return Ok(ConfirmResult::Retaint);
            }

            if self.optimistics.is_empty() {
                return Ok(ConfirmResult::Done);
            }

            let unconfirmed: Vec<bool> = self
                .optimistics
                .iter()
                .map(|p| match self.sys.prop_status(&p.name) {
                    PropertyStatus::KTrue(m) => m + 1 < k,
                    _ => true,
                })
                .collect();
            match index_of_true(&unconfirmed) {
                Some(i) => {
                    log::debug!(
                        "still waiting on base case of '{}'",
                        self.optimistics[i].name
                    );
                }
                None => {
                    for p in &self.optimistics {
                        log::info!("property '{}' is invariant (k = {})", p.name, k);
                        self.bus.send_status(&p.name, PropertyStatus::Invariant);
                        self.proved.push(p.name.clone());
                    }
                    let names: Vec<String> = self
                        .optimistics
                        .drain(..)
                        .map(|p| p.name)
                        .collect();
                    for name in names {
                        self.sys.set_prop_status(&name, PropertyStatus::Invariant);
                    }
                    return Ok(ConfirmResult::Done);
                }
            }

            if self.bus.is_closed() {
                return Ok(ConfirmResult::Abort);
            }
            if self.conf.confirm_sleep_ms > 0 {
                thread::sleep(Duration::from_millis(self.conf.confirm_sleep_ms));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_of_true_is_none_iff_all_false() {
        assert_eq!(index_of_true(&[]), None);
        assert_eq!(index_of_true(&[false, false]), None);
        assert_eq!(index_of_true(&[true]), Some(0));
        assert_eq!(index_of_true(&[false, true, true]), Some(1));
    }
}
