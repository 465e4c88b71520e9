//! Difference-encoded frame sequence.
//!
//! Frames are kept ascending: `levels[0]` is the ground sentinel for
//! `F_0 ≡ I` and is never written; `levels[1]` holds the abstract initial
//! predicate. The logical content of `F_i` is the conjunction of the clauses
//! stored at levels `i..=top`, so storing a clause at level `ℓ` adds it to
//! every frame at or below `ℓ`, and monotonicity `F_i ⇒ F_{i+1}` holds by
//! construction. Propagation moves clauses from `store(i)` to `store(i+1)`;
//! a drained store is the fixpoint `F_i = F_{i+1}`.

use vigil_term::TermId;

#[derive(Debug, Clone)]
pub(crate) struct Frames {
    levels: Vec<Vec<TermId>>,
}

impl Frames {
    /// The two-frame sequence `[∅, [I']]`.
    pub fn new(init_abs: TermId) -> Self {
        Frames {
            levels: vec![Vec::new(), vec![init_abs]],
        }
    }

    /// Index of the top frame.
    pub fn top(&self) -> usize {
        self.levels.len() - 1
    }

    /// Adds an empty top frame.
    pub fn push_frame(&mut self) {
        self.levels.push(Vec::new());
    }

    /// The clauses making up the logical content of `F_level`.
    pub fn content(&self, level: usize) -> Vec<TermId> {
        self.levels[level..].iter().flatten().copied().collect()
    }

    /// Stores a blocking clause at `level`.
    pub fn add_clause(&mut self, level: usize, clause: TermId) {
        self.levels[level].push(clause);
    }

    /// The clauses stored exactly at `level`.
    pub fn store(&self, level: usize) -> &[TermId] {
        &self.levels[level]
    }

    /// Replaces the store at `level`.
    pub fn replace_store(&mut self, level: usize, clauses: Vec<TermId>) {
        self.levels[level] = clauses;
    }

    /// Appends clauses to the store at `level`.
    pub fn extend_store(&mut self, level: usize, clauses: Vec<TermId>) {
        self.levels[level].extend(clauses);
    }
}
