//! Safety properties and their status lattice.

use serde::{Deserialize, Serialize};

use vigil_term::TermId;

use crate::trace::Trace;

/// A named candidate invariant over offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name, unique within its system.
    pub name: String,
    /// The candidate term, over offset 0.
    pub term: TermId,
}

impl Property {
    /// A property from a name and a term.
    pub fn new<N: Into<String>>(name: N, term: TermId) -> Self {
        Property {
            name: name.into(),
            term,
        }
    }
}

/// Verification status of a property.
///
/// Statuses only ever move up the lattice
/// `Unknown ⊑ KTrue(k) ⊑ KTrue(k+1) ⊑ Invariant`; `Falsified` is the
/// absorbing sibling of the upper branch. Both `Invariant` and `Falsified`
/// are terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyStatus {
    /// Nothing is known yet.
    #[default]
    Unknown,
    /// Holds on every execution up to `k` steps.
    KTrue(u64),
    /// Holds on every execution.
    Invariant,
    /// Falsified by a concrete trace.
    Falsified(Trace),
}

impl PropertyStatus {
    /// `true` for the terminal statuses.
    pub fn is_decided(&self) -> bool {
        matches!(self, PropertyStatus::Invariant | PropertyStatus::Falsified(_))
    }

    /// `true` if replacing `old` with `self` moves strictly up the lattice.
    pub fn improves_on(&self, old: &PropertyStatus) -> bool {
        if old.is_decided() {
            return false;
        }
        match self {
            PropertyStatus::Unknown => false,
            PropertyStatus::KTrue(k) => match old {
                PropertyStatus::Unknown => true,
                PropertyStatus::KTrue(j) => k > j,
                _ => false,
            },
            PropertyStatus::Invariant | PropertyStatus::Falsified(_) => true,
        }
    }

    /// The `k` of a `KTrue` status.
    pub fn k_true(&self) -> Option<u64> {
        match self {
            PropertyStatus::KTrue(k) => Some(*k),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ktrue_improves_on_unknown_and_smaller_k() {
        assert!(PropertyStatus::KTrue(1).improves_on(&PropertyStatus::Unknown));
        assert!(PropertyStatus::KTrue(3).improves_on(&PropertyStatus::KTrue(2)));
        assert!(!PropertyStatus::KTrue(2).improves_on(&PropertyStatus::KTrue(2)));
        assert!(!PropertyStatus::KTrue(1).improves_on(&PropertyStatus::KTrue(2)));
    }

    #[test]
    fn terminal_statuses_absorb() {
        let falsified = PropertyStatus::Falsified(Trace::new());
        assert!(!PropertyStatus::Invariant.improves_on(&falsified));
        assert!(!falsified.improves_on(&PropertyStatus::Invariant));
        assert!(!PropertyStatus::KTrue(10).improves_on(&PropertyStatus::Invariant));
    }

    #[test]
    fn deciding_improves_on_any_undecided() {
        assert!(PropertyStatus::Invariant.improves_on(&PropertyStatus::KTrue(7)));
        let falsified = PropertyStatus::Falsified(Trace::new());
        assert!(falsified.improves_on(&PropertyStatus::Unknown));
        assert!(falsified.improves_on(&PropertyStatus::KTrue(7)));
    }

    #[test]
    fn unknown_never_improves() {
        assert!(!PropertyStatus::Unknown.improves_on(&PropertyStatus::Unknown));
        assert!(!PropertyStatus::Unknown.improves_on(&PropertyStatus::KTrue(0)));
    }
}
