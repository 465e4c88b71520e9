//! Concrete values and models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::svar::Var;

/// A concrete value assigned by a solver model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
}

impl Value {
    /// The boolean payload, if this is a boolean value.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    /// The integer payload, if this is an integer value.
    pub fn as_int(self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(n),
            Value::Bool(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
        }
    }
}

/// A (partial) assignment of state-variable instances to values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    map: HashMap<Var, Value>,
}

impl Model {
    /// An empty model.
    pub fn new() -> Self {
        Model {
            map: HashMap::new(),
        }
    }

    /// Records a value for an instance.
    pub fn insert(&mut self, var: Var, value: Value) {
        self.map.insert(var, value);
    }

    /// The value of an instance, if assigned.
    pub fn get(&self, var: Var) -> Option<Value> {
        self.map.get(&var).copied()
    }

    /// The boolean value of an instance, if assigned and boolean.
    pub fn get_bool(&self, var: Var) -> Option<bool> {
        self.get(var).and_then(Value::as_bool)
    }

    /// Iterates over all assignments.
    pub fn iter(&self) -> impl Iterator<Item = (Var, Value)> + '_ {
        self.map.iter().map(|(v, x)| (*v, *x))
    }

    /// Number of assigned instances.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// `true` if nothing is assigned.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(Var, Value)> for Model {
    fn from_iter<I: IntoIterator<Item = (Var, Value)>>(iter: I) -> Self {
        Model {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svar::SvarId;

    #[test]
    fn value_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Bool(true).as_int(), None);
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_bool(), None);
    }

    #[test]
    fn model_roundtrip() {
        let mut model = Model::new();
        let v = SvarId(0).at(2);
        model.insert(v, Value::Bool(false));
        assert_eq!(model.get(v), Some(Value::Bool(false)));
        assert_eq!(model.get_bool(v), Some(false));
        assert_eq!(model.get(SvarId(0).at(3)), None);
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn model_from_iterator() {
        let model: Model = [(SvarId(1).at(0), Value::Int(3))].into_iter().collect();
        assert_eq!(model.get(SvarId(1).at(0)), Some(Value::Int(3)));
    }
}
