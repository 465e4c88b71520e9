//! Concrete counterexample traces.

use serde::{Deserialize, Serialize};

use vigil_term::{Value, Var};

/// A concrete execution: one state per time step, earliest first.
///
/// Each state lists the valued state-variable instances of that step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    states: Vec<Vec<(Var, Value)>>,
}

impl Trace {
    /// An empty trace.
    pub fn new() -> Self {
        Trace { states: Vec::new() }
    }

    /// Appends a state.
    pub fn push_state(&mut self, state: Vec<(Var, Value)>) {
        self.states.push(state);
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// `true` if the trace has no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The states, earliest first.
    pub fn states(&self) -> &[Vec<(Var, Value)>] {
        &self.states
    }

    /// The value of `var` in state `step`, if present.
    pub fn value_at(&self, step: usize, var: Var) -> Option<Value> {
        self.states
            .get(step)?
            .iter()
            .find(|(v, _)| *v == var)
            .map(|(_, val)| *val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_term::{Sort, StateVar, TermPool};

    #[test]
    fn states_accumulate_in_order() {
        let mut pool = TermPool::new();
        let x = pool.declare_state_var(StateVar::new("x", ["m"], Sort::Bool));
        let mut trace = Trace::new();
        assert!(trace.is_empty());
        trace.push_state(vec![(x.at(0), Value::Bool(false))]);
        trace.push_state(vec![(x.at(1), Value::Bool(true))]);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.value_at(0, x.at(0)), Some(Value::Bool(false)));
        assert_eq!(trace.value_at(1, x.at(1)), Some(Value::Bool(true)));
        assert_eq!(trace.value_at(2, x.at(1)), None);
    }
}
