//! Traversals and rewrites: offset bumping, substitution, variable and atom
//! extraction, sort computation.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::pool::TermPool;
use crate::svar::{Sort, SvarId, Var};
use crate::term::{TermData, TermId};

impl TermPool {
    /// Shifts every free state-variable instance of `t` by `delta`.
    ///
    /// Constant state variables are pinned at their declaration offset and
    /// are not shifted. Bumping by `k` and then by `-k` yields the original
    /// handle.
    pub fn bump(&mut self, t: TermId, delta: i64) -> TermId {
        if delta == 0 {
            return t;
        }
        let mut memo = HashMap::new();
        self.bump_rec(t, delta, &mut memo)
    }

    fn bump_rec(&mut self, t: TermId, delta: i64, memo: &mut HashMap<TermId, TermId>) -> TermId {
        if let Some(&r) = memo.get(&t) {
            return r;
        }
        let r = match self.term(t).clone() {
            TermData::True | TermData::False | TermData::Int(_) => t,
            TermData::Var(v) => {
                if self.state_var(v.svar).is_const {
                    t
                } else {
                    self.mk_var(v.bumped(delta))
                }
            }
            TermData::App(sym, args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.bump_rec(a, delta, memo))
                    .collect();
                self.mk_app(sym, args)
            }
            TermData::Not(x) => {
                let x = self.bump_rec(x, delta, memo);
                self.mk_not(x)
            }
            TermData::And(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.bump_rec(x, delta, memo))
                    .collect();
                self.mk_and(xs)
            }
            TermData::Or(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.bump_rec(x, delta, memo))
                    .collect();
                self.mk_or(xs)
            }
            TermData::Implies(a, b) => {
                let a = self.bump_rec(a, delta, memo);
                let b = self.bump_rec(b, delta, memo);
                self.mk_implies(a, b)
            }
            TermData::Iff(a, b) => {
                let a = self.bump_rec(a, delta, memo);
                let b = self.bump_rec(b, delta, memo);
                self.mk_iff(a, b)
            }
            TermData::Ite(c, x, y) => {
                let c = self.bump_rec(c, delta, memo);
                let x = self.bump_rec(x, delta, memo);
                let y = self.bump_rec(y, delta, memo);
                self.mk_ite(c, x, y)
            }
            TermData::Eq(a, b) => {
                let a = self.bump_rec(a, delta, memo);
                let b = self.bump_rec(b, delta, memo);
                self.mk_eq(a, b)
            }
            TermData::Leq(a, b) => {
                let a = self.bump_rec(a, delta, memo);
                let b = self.bump_rec(b, delta, memo);
                self.mk_leq(a, b)
            }
            TermData::Lt(a, b) => {
                let a = self.bump_rec(a, delta, memo);
                let b = self.bump_rec(b, delta, memo);
                self.mk_lt(a, b)
            }
            TermData::Add(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.bump_rec(x, delta, memo))
                    .collect();
                self.mk_add(xs)
            }
            TermData::Sub(a, b) => {
                let a = self.bump_rec(a, delta, memo);
                let b = self.bump_rec(b, delta, memo);
                self.mk_sub(a, b)
            }
        };
        memo.insert(t, r);
        r
    }

    /// Rewrites `t` by the given map, top-down: a mapped sub-term is replaced
    /// wholesale and its children are not visited.
    pub fn substitute(&mut self, t: TermId, map: &HashMap<TermId, TermId>) -> TermId {
        if map.is_empty() {
            return t;
        }
        let mut memo = HashMap::new();
        self.subst_rec(t, map, &mut memo)
    }

    fn subst_rec(
        &mut self,
        t: TermId,
        map: &HashMap<TermId, TermId>,
        memo: &mut HashMap<TermId, TermId>,
    ) -> TermId {
        if let Some(&r) = map.get(&t) {
            return r;
        }
        if let Some(&r) = memo.get(&t) {
            return r;
        }
        let r = match self.term(t).clone() {
            TermData::True
            | TermData::False
            | TermData::Int(_)
            | TermData::Var(_) => t,
            TermData::App(sym, args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.subst_rec(a, map, memo))
                    .collect();
                self.mk_app(sym, args)
            }
            TermData::Not(x) => {
                let x = self.subst_rec(x, map, memo);
                self.mk_not(x)
            }
            TermData::And(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.subst_rec(x, map, memo))
                    .collect();
                self.mk_and(xs)
            }
            TermData::Or(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.subst_rec(x, map, memo))
                    .collect();
                self.mk_or(xs)
            }
            TermData::Implies(a, b) => {
                let a = self.subst_rec(a, map, memo);
                let b = self.subst_rec(b, map, memo);
                self.mk_implies(a, b)
            }
            TermData::Iff(a, b) => {
                let a = self.subst_rec(a, map, memo);
                let b = self.subst_rec(b, map, memo);
                self.mk_iff(a, b)
            }
            TermData::Ite(c, x, y) => {
                let c = self.subst_rec(c, map, memo);
                let x = self.subst_rec(x, map, memo);
                let y = self.subst_rec(y, map, memo);
                self.mk_ite(c, x, y)
            }
            TermData::Eq(a, b) => {
                let a = self.subst_rec(a, map, memo);
                let b = self.subst_rec(b, map, memo);
                self.mk_eq(a, b)
            }
            TermData::Leq(a, b) => {
                let a = self.subst_rec(a, map, memo);
                let b = self.subst_rec(b, map, memo);
                self.mk_leq(a, b)
            }
            TermData::Lt(a, b) => {
                let a = self.subst_rec(a, map, memo);
                let b = self.subst_rec(b, map, memo);
                self.mk_lt(a, b)
            }
            TermData::Add(xs) => {
                let xs = xs
                    .into_iter()
                    .map(|x| self.subst_rec(x, map, memo))
                    .collect();
                self.mk_add(xs)
            }
            TermData::Sub(a, b) => {
                let a = self.subst_rec(a, map, memo);
                let b = self.subst_rec(b, map, memo);
                self.mk_sub(a, b)
            }
        };
        memo.insert(t, r);
        r
    }

    /// Every state-variable instance occurring in `t`.
    pub fn free_vars(&self, t: TermId) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        let mut stack = vec![t];
        let mut seen = HashSet::new();
        while let Some(t) = stack.pop() {
            if !seen.insert(t) {
                continue;
            }
            match self.term(t) {
                TermData::Var(v) => {
                    out.insert(*v);
                }
                TermData::True | TermData::False | TermData::Int(_) => {}
                TermData::App(_, xs) | TermData::And(xs) | TermData::Or(xs) | TermData::Add(xs) => {
                    stack.extend(xs.iter().copied());
                }
                TermData::Not(x) => stack.push(*x),
                TermData::Implies(a, b)
                | TermData::Iff(a, b)
                | TermData::Eq(a, b)
                | TermData::Leq(a, b)
                | TermData::Lt(a, b)
                | TermData::Sub(a, b) => {
                    stack.push(*a);
                    stack.push(*b);
                }
                TermData::Ite(c, x, y) => {
                    stack.push(*c);
                    stack.push(*x);
                    stack.push(*y);
                }
            }
        }
        out
    }

    /// The state variables (declarations, not instances) occurring in `t`.
    pub fn svars_of(&self, t: TermId) -> BTreeSet<SvarId> {
        self.free_vars(t).into_iter().map(|v| v.svar).collect()
    }

    /// Maximal boolean sub-terms of `t` that are not boolean connectives,
    /// deduplicated in discovery order.
    ///
    /// Connectives are `not`, `and`, `or`, `=>`, `<=>` and boolean `ite`;
    /// everything else boolean-sorted (variables, applications, equalities,
    /// comparisons) is an atom.
    pub fn atoms(&self, t: TermId) -> Vec<TermId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.atoms_rec(t, &mut seen, &mut out);
        out
    }

    fn atoms_rec(&self, t: TermId, seen: &mut HashSet<TermId>, out: &mut Vec<TermId>) {
        match self.term(t) {
            TermData::True | TermData::False => {}
            TermData::Not(x) => self.atoms_rec(*x, seen, out),
            TermData::And(xs) | TermData::Or(xs) => {
                for &x in xs {
                    self.atoms_rec(x, seen, out);
                }
            }
            TermData::Implies(a, b) | TermData::Iff(a, b) => {
                let (a, b) = (*a, *b);
                self.atoms_rec(a, seen, out);
                self.atoms_rec(b, seen, out);
            }
            TermData::Ite(c, x, y) if self.sort_of(*x) == Sort::Bool => {
                let (c, x, y) = (*c, *x, *y);
                self.atoms_rec(c, seen, out);
                self.atoms_rec(x, seen, out);
                self.atoms_rec(y, seen, out);
            }
            _ => {
                if self.sort_of(t) == Sort::Bool && seen.insert(t) {
                    out.push(t);
                }
            }
        }
    }

    /// The sort of `t`.
    pub fn sort_of(&self, t: TermId) -> Sort {
        match self.term(t) {
            TermData::True
            | TermData::False
            | TermData::Not(_)
            | TermData::And(_)
            | TermData::Or(_)
            | TermData::Implies(_, _)
            | TermData::Iff(_, _)
            | TermData::Eq(_, _)
            | TermData::Leq(_, _)
            | TermData::Lt(_, _) => Sort::Bool,
            TermData::Int(_) | TermData::Add(_) | TermData::Sub(_, _) => Sort::Int,
            TermData::Var(v) => self.state_var(v.svar).sort,
            TermData::App(sym, _) => self.fun_sym(*sym).ret,
            TermData::Ite(_, x, _) => self.sort_of(*x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svar::StateVar;

    fn bool_var(pool: &mut TermPool, name: &str) -> (SvarId, TermId) {
        let sv = pool.declare_state_var(StateVar::new(name, ["m"], Sort::Bool));
        let t = pool.mk_var(sv.at(0));
        (sv, t)
    }

    #[test]
    fn bump_then_unbump_is_identity() {
        let mut pool = TermPool::new();
        let (_, x) = bool_var(&mut pool, "x");
        let (_, y) = bool_var(&mut pool, "y");
        let t = pool.mk_implies(x, y);
        let up = pool.bump(t, 3);
        assert_ne!(up, t);
        assert_eq!(pool.bump(up, -3), t);
    }

    #[test]
    fn bump_by_zero_is_identity() {
        let mut pool = TermPool::new();
        let (_, x) = bool_var(&mut pool, "x");
        assert_eq!(pool.bump(x, 0), x);
    }

    #[test]
    fn bump_skips_constants() {
        let mut pool = TermPool::new();
        let c = pool.declare_state_var(StateVar::new("n", ["m"], Sort::Int).constant());
        let vc = pool.mk_var(c.at(0));
        assert_eq!(pool.bump(vc, 5), vc);
    }

    #[test]
    fn bump_shifts_nested_vars() {
        let mut pool = TermPool::new();
        let x = pool.declare_state_var(StateVar::new("x", ["m"], Sort::Int));
        let vx = pool.mk_var(x.at(0));
        let one = pool.mk_int(1);
        let sum = pool.mk_add(vec![vx, one]);
        let bumped = pool.bump(sum, 2);
        let vx2 = pool.mk_var(x.at(2));
        assert_eq!(bumped, pool.mk_add(vec![vx2, one]));
    }

    #[test]
    fn substitute_with_empty_map_is_identity() {
        let mut pool = TermPool::new();
        let (_, x) = bool_var(&mut pool, "x");
        let n = pool.mk_not(x);
        assert_eq!(pool.substitute(n, &HashMap::new()), n);
    }

    #[test]
    fn substitute_replaces_mapped_subterm() {
        let mut pool = TermPool::new();
        let (_, x) = bool_var(&mut pool, "x");
        let (_, y) = bool_var(&mut pool, "y");
        let (_, z) = bool_var(&mut pool, "z");
        let t = pool.mk_and(vec![x, y]);
        let mut map = HashMap::new();
        map.insert(y, z);
        assert_eq!(pool.substitute(t, &map), pool.mk_and(vec![x, z]));
    }

    #[test]
    fn substitute_is_top_down() {
        // mapping `x ∧ y` wholesale wins over mapping `x` inside it
        let mut pool = TermPool::new();
        let (_, x) = bool_var(&mut pool, "x");
        let (_, y) = bool_var(&mut pool, "y");
        let (_, z) = bool_var(&mut pool, "z");
        let conj = pool.mk_and(vec![x, y]);
        let mut map = HashMap::new();
        map.insert(conj, z);
        map.insert(x, y);
        assert_eq!(pool.substitute(conj, &map), z);
    }

    #[test]
    fn free_vars_collects_instances() {
        let mut pool = TermPool::new();
        let x = pool.declare_state_var(StateVar::new("x", ["m"], Sort::Bool));
        let v0 = pool.mk_var(x.at(0));
        let v1 = pool.mk_var(x.at(1));
        let t = pool.mk_implies(v0, v1);
        let vars = pool.free_vars(t);
        assert_eq!(vars.len(), 2);
        assert!(vars.contains(&x.at(0)));
        assert!(vars.contains(&x.at(1)));
        assert_eq!(pool.svars_of(t).len(), 1);
    }

    #[test]
    fn atoms_stop_below_connectives() {
        let mut pool = TermPool::new();
        let c = pool.declare_state_var(StateVar::new("c", ["m"], Sort::Int));
        let vc = pool.mk_var(c.at(0));
        let three = pool.mk_int(3);
        let eq = pool.mk_eq(vc, three);
        let (_, p) = bool_var(&mut pool, "p");
        let neq = pool.mk_not(eq);
        let t = pool.mk_and(vec![neq, p]);
        let atoms = pool.atoms(t);
        assert_eq!(atoms, vec![eq, p]);
    }

    #[test]
    fn atoms_deduplicate() {
        let mut pool = TermPool::new();
        let (_, p) = bool_var(&mut pool, "p");
        let np = pool.mk_not(p);
        let t = pool.mk_or(vec![p, np]);
        assert_eq!(pool.atoms(t), vec![p]);
    }

    #[test]
    fn sort_of_basic_nodes() {
        let mut pool = TermPool::new();
        let (_, p) = bool_var(&mut pool, "p");
        let n = pool.mk_int(4);
        let c = pool.declare_state_var(StateVar::new("c", ["m"], Sort::Int));
        let vc = pool.mk_var(c.at(0));
        let eq = pool.mk_eq(vc, n);
        assert_eq!(pool.sort_of(p), Sort::Bool);
        assert_eq!(pool.sort_of(n), Sort::Int);
        assert_eq!(pool.sort_of(vc), Sort::Int);
        assert_eq!(pool.sort_of(eq), Sort::Bool);
    }
}
