//! Implicit-abstraction bookkeeping: abstraction variables and clones.
//!
//! Every tracked predicate atom gets a fresh boolean state variable (an
//! *abvar*) in scope `[<orig-scope-head>, "abv"]`; the bijective map between
//! atoms and abvars only ever grows. The concrete transition relation is
//! embedded alongside the abstract one through a second, parallel variable
//! set in scope `[<orig-scope>, "cln"]`.

use std::collections::HashMap;

use vigil_term::{Sort, StateVar, SvarId, TermId, TermPool};

/// One atom/abvar pairing, with the literals of the abvar at offset 0
/// pre-built so cube extraction from valuations never touches the pool.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AbvarEntry {
    /// The concrete atom, normalized to offset 0.
    pub atom: TermId,
    /// The abstraction variable.
    pub svar: SvarId,
    /// `abvar@0`.
    pub pos: TermId,
    /// `¬abvar@0`.
    pub neg: TermId,
}

/// The bijective atom ↔ abvar map; grow-only.
#[derive(Debug, Default)]
pub(crate) struct AbvarMap {
    entries: Vec<AbvarEntry>,
    by_atom: HashMap<TermId, usize>,
    counter: u64,
}

impl AbvarMap {
    pub fn new() -> Self {
        AbvarMap::default()
    }

    /// Extends the map with every atom of `preds` not yet tracked; returns
    /// the fresh abvars. Idempotent: a second call with the same predicates
    /// adds nothing.
    pub fn update(&mut self, pool: &mut TermPool, preds: &[TermId]) -> Vec<SvarId> {
        let mut fresh = Vec::new();
        for &pred in preds {
            for atom in pool.atoms(pred) {
                if self.by_atom.contains_key(&atom) {
                    continue;
                }
                let scope_head = pool
                    .free_vars(atom)
                    .iter()
                    .next()
                    .and_then(|v| pool.state_var(v.svar).scope.first().cloned())
                    .unwrap_or_else(|| "sys".to_string());
                let name = format!("abv{}", self.counter);
                self.counter += 1;
                let svar = pool.declare_state_var(StateVar::new(
                    name,
                    [scope_head, "abv".to_string()],
                    Sort::Bool,
                ));
                let pos = pool.mk_var(svar.at(0));
                let neg = pool.mk_not(pos);
                let idx = self.entries.len();
                self.entries.push(AbvarEntry {
                    atom,
                    svar,
                    pos,
                    neg,
                });
                self.by_atom.insert(atom, idx);
                fresh.push(svar);
            }
        }
        fresh
    }

    pub fn entries(&self) -> &[AbvarEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Replaces every tracked atom of `t` by its abvar.
    pub fn abstract_term(&self, pool: &mut TermPool, t: TermId) -> TermId {
        let map: HashMap<TermId, TermId> =
            self.entries.iter().map(|e| (e.atom, e.pos)).collect();
        pool.substitute(t, &map)
    }

    /// Replaces every abvar of `t` by its atom; inverse of
    /// [`abstract_term`](Self::abstract_term) on tracked terms.
    pub fn concretize(&self, pool: &mut TermPool, t: TermId) -> TermId {
        let map: HashMap<TermId, TermId> =
            self.entries.iter().map(|e| (e.pos, e.atom)).collect();
        pool.substitute(t, &map)
    }

    /// The coupling set `H` at `offset`: one `atom = abvar` equation per
    /// tracked pair.
    pub fn couplings(&self, pool: &mut TermPool, offset: i64) -> Vec<TermId> {
        let pairs: Vec<(TermId, TermId)> =
            self.entries.iter().map(|e| (e.atom, e.pos)).collect();
        pairs
            .into_iter()
            .map(|(atom, abv)| {
                let a = pool.bump(atom, offset);
                let v = pool.bump(abv, offset);
                pool.mk_eq(a, v)
            })
            .collect()
    }
}

/// The total injective clone map `γ` over a system's state variables.
#[derive(Debug)]
pub(crate) struct CloneMap {
    map: HashMap<SvarId, SvarId>,
    pairs: Vec<(SvarId, SvarId)>,
}

impl CloneMap {
    /// Builds (and memoizes) one clone per state variable, in scope
    /// `[<orig-scope>, "cln"]`, preserving sort and flags.
    pub fn build(pool: &mut TermPool, svars: &[SvarId]) -> Self {
        let mut map = HashMap::new();
        let mut pairs = Vec::with_capacity(svars.len());
        for &sv in svars {
            let orig = pool.state_var(sv).clone();
            let mut scope = orig.scope.clone();
            scope.push("cln".to_string());
            let mut cloned = StateVar::new(orig.name.clone(), scope, orig.sort);
            cloned.is_input = orig.is_input;
            cloned.is_const = orig.is_const;
            let cln = pool.declare_state_var(cloned);
            map.insert(sv, cln);
            pairs.push((sv, cln));
        }
        CloneMap { map, pairs }
    }

    /// The `(original, clone)` pairs, in declaration order.
    pub fn pairs(&self) -> &[(SvarId, SvarId)] {
        &self.pairs
    }

    /// Rewrites every variable instance of `t` into its clone.
    pub fn clone_term(&self, pool: &mut TermPool, t: TermId) -> TermId {
        let vars = pool.free_vars(t);
        let mut map = HashMap::new();
        for v in vars {
            if let Some(&cln) = self.map.get(&v.svar) {
                let from = pool.mk_var(v);
                let to = pool.mk_var(cln.at(v.offset));
                map.insert(from, to);
            }
        }
        pool.substitute(t, &map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_flags() -> (TermPool, SvarId, SvarId) {
        let mut pool = TermPool::new();
        let a = pool.declare_state_var(StateVar::new("a", ["top"], Sort::Bool));
        let b = pool.declare_state_var(StateVar::new("b", ["top"], Sort::Bool));
        (pool, a, b)
    }

    #[test]
    fn update_tracks_each_atom_once() {
        let (mut pool, a, b) = pool_with_flags();
        let va = pool.mk_var(a.at(0));
        let vb = pool.mk_var(b.at(0));
        let pred = pool.mk_and(vec![va, vb]);
        let mut abv = AbvarMap::new();
        let fresh = abv.update(&mut pool, &[pred]);
        assert_eq!(fresh.len(), 2);
        assert_eq!(abv.len(), 2);
    }

    #[test]
    fn update_is_idempotent() {
        let (mut pool, a, _) = pool_with_flags();
        let va = pool.mk_var(a.at(0));
        let mut abv = AbvarMap::new();
        assert_eq!(abv.update(&mut pool, &[va]).len(), 1);
        assert!(abv.update(&mut pool, &[va]).is_empty());
        assert_eq!(abv.len(), 1);
    }

    #[test]
    fn abvars_live_in_the_abv_scope() {
        let (mut pool, a, _) = pool_with_flags();
        let va = pool.mk_var(a.at(0));
        let mut abv = AbvarMap::new();
        let fresh = abv.update(&mut pool, &[va]);
        let sv = pool.state_var(fresh[0]);
        assert_eq!(sv.scope, vec!["top".to_string(), "abv".to_string()]);
        assert_eq!(sv.sort, Sort::Bool);
    }

    #[test]
    fn concretize_inverts_abstraction() {
        let (mut pool, a, b) = pool_with_flags();
        let va = pool.mk_var(a.at(0));
        let vb = pool.mk_var(b.at(0));
        let nb = pool.mk_not(vb);
        let pred = pool.mk_implies(va, nb);
        let mut abv = AbvarMap::new();
        abv.update(&mut pool, &[pred]);
        let abstracted = abv.abstract_term(&mut pool, pred);
        assert_ne!(abstracted, pred);
        assert_eq!(abv.concretize(&mut pool, abstracted), pred);
    }

    #[test]
    fn couplings_pair_atom_with_abvar() {
        let (mut pool, a, _) = pool_with_flags();
        let va = pool.mk_var(a.at(0));
        let mut abv = AbvarMap::new();
        abv.update(&mut pool, &[va]);
        let h0 = abv.couplings(&mut pool, 0);
        assert_eq!(h0.len(), 1);
        let h1 = abv.couplings(&mut pool, 1);
        assert_eq!(pool.bump(h0[0], 1), h1[0]);
    }

    #[test]
    fn clone_map_preserves_sort_and_flags() {
        let mut pool = TermPool::new();
        let inp = pool.declare_state_var(StateVar::new("i", ["top"], Sort::Bool).input());
        let clones = CloneMap::build(&mut pool, &[inp]);
        let (orig, cln) = clones.pairs()[0];
        assert_eq!(orig, inp);
        let sv = pool.state_var(cln);
        assert!(sv.is_input);
        assert_eq!(sv.scope, vec!["top".to_string(), "cln".to_string()]);
    }

    #[test]
    fn clone_term_rewrites_every_instance() {
        let (mut pool, a, b) = pool_with_flags();
        let clones = CloneMap::build(&mut pool, &[a, b]);
        let va = pool.mk_var(a.at(0));
        let vb1 = pool.mk_var(b.at(1));
        let t = pool.mk_and(vec![va, vb1]);
        let cloned = clones.clone_term(&mut pool, t);
        assert_ne!(cloned, t);
        let vars = pool.free_vars(cloned);
        assert!(vars.iter().all(|v| {
            pool.state_var(v.svar).scope.last().map(String::as_str) == Some("cln")
        }));
        // offsets survive the rewrite
        assert!(vars.iter().any(|v| v.offset == 1));
    }
}
