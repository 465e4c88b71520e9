//! State variables and their instances.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort of a state variable or term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sort {
    /// Boolean.
    Bool,
    /// Mathematical integer.
    Int,
    /// Mathematical real.
    Real,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
        }
    }
}

/// A handle to a declared state variable.
///
/// Handles are `Copy` and compare in O(1); use [`TermPool::state_var`]
/// to retrieve the declaration.
///
/// [`TermPool::state_var`]: crate::TermPool::state_var
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SvarId(pub(crate) u32);

impl SvarId {
    /// The internal index of this handle.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The instance of this variable at the given offset.
    pub fn at(self, offset: i64) -> Var {
        Var { svar: self, offset }
    }
}

/// A state variable declaration: named, scoped, sorted.
///
/// The declaration itself carries no time information; engines work with
/// [`Var`] instances, which pair the declaration with an offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateVar {
    /// Base name, unique within the scope.
    pub name: String,
    /// Scope segments, outermost first.
    pub scope: Vec<String>,
    /// Sort of every instance.
    pub sort: Sort,
    /// Unconstrained input: fresh at every step.
    pub is_input: bool,
    /// Constant: a single instance shared by every step.
    pub is_const: bool,
}

impl StateVar {
    /// A plain (non-input, non-constant) state variable.
    pub fn new<N, S, I>(name: N, scope: I, sort: Sort) -> Self
    where
        N: Into<String>,
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        StateVar {
            name: name.into(),
            scope: scope.into_iter().map(Into::into).collect(),
            sort,
            is_input: false,
            is_const: false,
        }
    }

    /// Marks this variable as an input.
    pub fn input(mut self) -> Self {
        self.is_input = true;
        self
    }

    /// Marks this variable as a constant.
    pub fn constant(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Dot-joined scope and name, e.g. `main.buffer.full`.
    pub fn qualified(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.scope.join("."), self.name)
        }
    }
}

/// An instance of a state variable at a time offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Var {
    /// The declaration this instance belongs to.
    pub svar: SvarId,
    /// Time offset of the instance.
    pub offset: i64,
}

impl Var {
    /// The same variable shifted by `delta`.
    pub fn bumped(self, delta: i64) -> Var {
        Var {
            svar: self.svar,
            offset: self.offset + delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_joins_scope_and_name() {
        let sv = StateVar::new("full", ["top", "buffer"], Sort::Bool);
        assert_eq!(sv.qualified(), "top.buffer.full");
    }

    #[test]
    fn qualified_without_scope_is_bare_name() {
        let sv = StateVar::new("x", Vec::<String>::new(), Sort::Int);
        assert_eq!(sv.qualified(), "x");
    }

    #[test]
    fn builder_flags() {
        let sv = StateVar::new("clk", ["sys"], Sort::Bool).input();
        assert!(sv.is_input);
        assert!(!sv.is_const);
        let sv = StateVar::new("n", ["sys"], Sort::Int).constant();
        assert!(sv.is_const);
    }

    #[test]
    fn bumped_shifts_offset() {
        let v = SvarId(3).at(1);
        assert_eq!(v.bumped(4).offset, 5);
        assert_eq!(v.bumped(-1).offset, 0);
        assert_eq!(v.bumped(0), v);
    }
}
