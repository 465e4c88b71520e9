//! Term nodes and rendering.

use std::fmt;

use crate::pool::{SymId, TermPool};
use crate::svar::{Sort, Var};

/// A handle to an interned term.
///
/// The handle is the term's stable tag: two handles are equal exactly when
/// the terms are structurally identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    /// The interning index, usable as a reproducible tag.
    pub fn tag(self) -> u32 {
        self.0
    }
}

/// An uninterpreted (or defined) function symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunSym {
    /// Symbol name, unique in the pool.
    pub name: String,
    /// Argument sorts; empty for nullary symbols such as activation literals.
    pub args: Vec<Sort>,
    /// Result sort.
    pub ret: Sort,
}

/// One interned term node.
///
/// Children are [`TermId`] handles into the same pool. Nodes are immutable
/// after interning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermData {
    /// Boolean constant true.
    True,
    /// Boolean constant false.
    False,
    /// Integer constant.
    Int(i64),
    /// State-variable instance.
    Var(Var),
    /// Function application; nullary applications are plain symbols.
    App(SymId, Vec<TermId>),
    /// Negation.
    Not(TermId),
    /// N-ary conjunction.
    And(Vec<TermId>),
    /// N-ary disjunction.
    Or(Vec<TermId>),
    /// Implication.
    Implies(TermId, TermId),
    /// Boolean equivalence.
    Iff(TermId, TermId),
    /// If-then-else.
    Ite(TermId, TermId, TermId),
    /// Equality.
    Eq(TermId, TermId),
    /// Less-or-equal.
    Leq(TermId, TermId),
    /// Strictly-less.
    Lt(TermId, TermId),
    /// N-ary sum.
    Add(Vec<TermId>),
    /// Difference.
    Sub(TermId, TermId),
}

/// Pool-borrowing display adapter; renders terms as s-expressions.
///
/// Obtained from [`TermPool::display`].
///
/// [`TermPool::display`]: crate::TermPool::display
pub struct TermDisplay<'a> {
    pub(crate) pool: &'a TermPool,
    pub(crate) id: TermId,
}

impl<'a> TermDisplay<'a> {
    fn child(&self, id: TermId) -> TermDisplay<'a> {
        TermDisplay {
            pool: self.pool,
            id,
        }
    }

    fn nary(&self, f: &mut fmt::Formatter<'_>, op: &str, kids: &[TermId]) -> fmt::Result {
        write!(f, "({}", op)?;
        for kid in kids {
            write!(f, " {}", self.child(*kid))?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for TermDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pool.term(self.id) {
            TermData::True => write!(f, "true"),
            TermData::False => write!(f, "false"),
            TermData::Int(n) => {
                if *n < 0 {
                    write!(f, "(- {})", n.unsigned_abs())
                } else {
                    write!(f, "{}", n)
                }
            }
            TermData::Var(v) => {
                let sv = self.pool.state_var(v.svar);
                if sv.is_const {
                    write!(f, "{}", sv.qualified())
                } else {
                    write!(f, "{}@{}", sv.qualified(), v.offset)
                }
            }
            TermData::App(sym, args) => {
                let name = &self.pool.fun_sym(*sym).name;
                if args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    self.nary(f, name, args)
                }
            }
            TermData::Not(t) => self.nary(f, "not", &[*t]),
            TermData::And(ts) => self.nary(f, "and", ts),
            TermData::Or(ts) => self.nary(f, "or", ts),
            TermData::Implies(a, b) => self.nary(f, "=>", &[*a, *b]),
            TermData::Iff(a, b) => self.nary(f, "=", &[*a, *b]),
            TermData::Ite(c, t, e) => self.nary(f, "ite", &[*c, *t, *e]),
            TermData::Eq(a, b) => self.nary(f, "=", &[*a, *b]),
            TermData::Leq(a, b) => self.nary(f, "<=", &[*a, *b]),
            TermData::Lt(a, b) => self.nary(f, "<", &[*a, *b]),
            TermData::Add(ts) => self.nary(f, "+", ts),
            TermData::Sub(a, b) => self.nary(f, "-", &[*a, *b]),
        }
    }
}
