//! Exhaustive enumeration backend for finite boolean systems.
//!
//! `FiniteSolver` decides satisfiability by enumerating assignments over the
//! declared boolean state-variable instances. It is complete on the small
//! finite systems the integration suites use, and it honors the whole facade
//! (assertion stack, assumptions, values, models), so the engines run against
//! it unmodified.
//!
//! Nullary applications (activation literals) evaluate to `true` exactly when
//! assumed in the current check. Every occurrence of an activation literal is
//! an implication guard, so forcing un-assumed literals to `false` preserves
//! satisfiability.

use std::collections::{HashMap, HashSet};

use vigil_term::{Model, Sort, SymId, TermData, TermId, TermPool, Value, Var};

use crate::error::{SmtError, SmtResult};
use crate::solver::{Assignments, SatOutcome, SmtSolver};

/// Hard cap on enumerated variables; beyond this the search space is too
/// large to sweep.
const MAX_VARS: usize = 20;

/// An in-process, enumeration-based solver for boolean state spaces.
#[derive(Debug, Default)]
pub struct FiniteSolver {
    vars: Vec<Var>,
    var_set: HashSet<Var>,
    defs: HashMap<SymId, (Vec<Var>, TermId)>,
    /// Assertion levels; index 0 is the base level.
    levels: Vec<Vec<TermId>>,
    /// Model of the most recent sat check.
    model: Option<Model>,
    /// Nullary symbols assumed true in the most recent check.
    assumed: HashSet<SymId>,
}

impl FiniteSolver {
    /// A solver with an empty base assertion level.
    pub fn new() -> Self {
        FiniteSolver {
            vars: Vec::new(),
            var_set: HashSet::new(),
            defs: HashMap::new(),
            levels: vec![Vec::new()],
            model: None,
            assumed: HashSet::new(),
        }
    }

    fn all_assertions(&self) -> impl Iterator<Item = TermId> + '_ {
        self.levels.iter().flatten().copied()
    }

    fn eval(&self, pool: &TermPool, t: TermId, model: &Model) -> SmtResult<Value> {
        self.eval_in(pool, t, model, &HashMap::new())
    }

    fn eval_in(
        &self,
        pool: &TermPool,
        t: TermId,
        model: &Model,
        env: &HashMap<Var, Value>,
    ) -> SmtResult<Value> {
        let bool_of = |v: Value| {
            v.as_bool()
                .ok_or_else(|| SmtError::Backend("boolean operand expected".into()))
        };
        let int_of = |v: Value| {
            v.as_int()
                .ok_or_else(|| SmtError::Backend("integer operand expected".into()))
        };
        match pool.term(t) {
            TermData::True => Ok(Value::Bool(true)),
            TermData::False => Ok(Value::Bool(false)),
            TermData::Int(n) => Ok(Value::Int(*n)),
            TermData::Var(v) => env.get(v).copied().or_else(|| model.get(*v)).ok_or_else(|| {
                SmtError::Backend(format!(
                    "undeclared instance {}",
                    pool.display(t)
                ))
            }),
            TermData::App(sym, args) => {
                if let Some((params, body)) = self.defs.get(sym) {
                    if params.len() != args.len() {
                        return Err(SmtError::Backend(format!(
                            "arity mismatch applying {}",
                            pool.fun_sym(*sym).name
                        )));
                    }
                    let mut inner = env.clone();
                    for (p, a) in params.iter().zip(args.iter()) {
                        let v = self.eval_in(pool, *a, model, env)?;
                        inner.insert(*p, v);
                    }
                    self.eval_in(pool, *body, model, &inner)
                } else if args.is_empty() {
                    Ok(Value::Bool(self.assumed.contains(sym)))
                } else {
                    Err(SmtError::Unsupported(
                        "uninterpreted non-nullary applications",
                    ))
                }
            }
            TermData::Not(x) => {
                let x = bool_of(self.eval_in(pool, *x, model, env)?)?;
                Ok(Value::Bool(!x))
            }
            TermData::And(xs) => {
                for &x in xs {
                    if !bool_of(self.eval_in(pool, x, model, env)?)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            TermData::Or(xs) => {
                for &x in xs {
                    if bool_of(self.eval_in(pool, x, model, env)?)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            TermData::Implies(a, b) => {
                let a = bool_of(self.eval_in(pool, *a, model, env)?)?;
                if !a {
                    return Ok(Value::Bool(true));
                }
                self.eval_in(pool, *b, model, env)
            }
            TermData::Iff(a, b) => {
                let a = bool_of(self.eval_in(pool, *a, model, env)?)?;
                let b = bool_of(self.eval_in(pool, *b, model, env)?)?;
                Ok(Value::Bool(a == b))
            }
            TermData::Ite(c, x, y) => {
                let c = bool_of(self.eval_in(pool, *c, model, env)?)?;
                if c {
                    self.eval_in(pool, *x, model, env)
                } else {
                    self.eval_in(pool, *y, model, env)
                }
            }
            TermData::Eq(a, b) => {
                let a = self.eval_in(pool, *a, model, env)?;
                let b = self.eval_in(pool, *b, model, env)?;
                match (a, b) {
                    (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a == b)),
                    (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a == b)),
                    _ => Err(SmtError::Backend("equality on mismatched sorts".into())),
                }
            }
            TermData::Leq(a, b) => {
                let a = int_of(self.eval_in(pool, *a, model, env)?)?;
                let b = int_of(self.eval_in(pool, *b, model, env)?)?;
                Ok(Value::Bool(a <= b))
            }
            TermData::Lt(a, b) => {
                let a = int_of(self.eval_in(pool, *a, model, env)?)?;
                let b = int_of(self.eval_in(pool, *b, model, env)?)?;
                Ok(Value::Bool(a < b))
            }
            TermData::Add(xs) => {
                let mut acc = 0i64;
                for &x in xs {
                    acc += int_of(self.eval_in(pool, x, model, env)?)?;
                }
                Ok(Value::Int(acc))
            }
            TermData::Sub(a, b) => {
                let a = int_of(self.eval_in(pool, *a, model, env)?)?;
                let b = int_of(self.eval_in(pool, *b, model, env)?)?;
                Ok(Value::Int(a - b))
            }
        }
    }
}

impl SmtSolver for FiniteSolver {
    fn declare_var(&mut self, pool: &TermPool, var: Var) -> SmtResult {
        if pool.state_var(var.svar).sort != Sort::Bool {
            return Err(SmtError::Unsupported(
                "non-boolean state variables under enumeration",
            ));
        }
        if self.var_set.insert(var) {
            self.vars.push(var);
        }
        Ok(())
    }

    fn declare_fun(&mut self, _pool: &TermPool, _sym: SymId) -> SmtResult {
        Ok(())
    }

    fn define_fun(
        &mut self,
        _pool: &TermPool,
        sym: SymId,
        params: &[Var],
        body: TermId,
    ) -> SmtResult {
        self.defs.insert(sym, (params.to_vec(), body));
        Ok(())
    }

    fn assert_term(&mut self, _pool: &TermPool, term: TermId) -> SmtResult {
        match self.levels.last_mut() {
            Some(level) => {
                level.push(term);
                Ok(())
            }
            None => Err(SmtError::Backend("assertion stack is gone".into())),
        }
    }

    fn assert_named(&mut self, pool: &TermPool, term: TermId, _name: &str) -> SmtResult {
        self.assert_term(pool, term)
    }

    fn push(&mut self) -> SmtResult {
        self.levels.push(Vec::new());
        Ok(())
    }

    fn pop(&mut self) -> SmtResult {
        if self.levels.len() <= 1 {
            return Err(SmtError::Backend("pop on empty assertion stack".into()));
        }
        self.levels.pop();
        Ok(())
    }

    fn check_sat_assuming(
        &mut self,
        pool: &TermPool,
        assumptions: &[TermId],
    ) -> SmtResult<SatOutcome> {
        // Nullary-application assumptions select the enabled guards; any
        // other assumption term is treated as an extra constraint.
        self.assumed.clear();
        let mut constraints = Vec::new();
        for &a in assumptions {
            match pool.term(a) {
                TermData::App(sym, args) if args.is_empty() => {
                    self.assumed.insert(*sym);
                }
                _ => constraints.push(a),
            }
        }

        // An assertion gated by an un-assumed literal is vacuous; dropping
        // it keeps the enumeration restricted to the variables this query
        // actually constrains.
        let mut active = Vec::new();
        for t in self.all_assertions().chain(constraints.iter().copied()) {
            if let TermData::Implies(lhs, _) = pool.term(t) {
                if let TermData::App(sym, args) = pool.term(*lhs) {
                    if args.is_empty() && !self.assumed.contains(sym) {
                        continue;
                    }
                }
            }
            active.push(t);
        }

        let mut var_list = Vec::new();
        let mut active_vars = HashSet::new();
        for &t in &active {
            for v in pool.free_vars(t) {
                if active_vars.insert(v) {
                    if !self.var_set.contains(&v) {
                        return Err(SmtError::Backend(format!(
                            "undeclared instance {}@{}",
                            pool.state_var(v.svar).qualified(),
                            v.offset
                        )));
                    }
                    var_list.push(v);
                }
            }
        }
        if var_list.len() > MAX_VARS {
            return Err(SmtError::Backend(format!(
                "{} active boolean instances exceed the enumeration cap of {}",
                var_list.len(),
                MAX_VARS
            )));
        }

        let n = var_list.len();
        for mask in 0u64..(1u64 << n) {
            let mut model = Model::new();
            for (i, &v) in var_list.iter().enumerate() {
                model.insert(v, Value::Bool(mask & (1 << i) != 0));
            }
            let mut ok = true;
            for &t in &active {
                match self.eval(pool, t, &model)?.as_bool() {
                    Some(true) => {}
                    Some(false) => {
                        ok = false;
                        break;
                    }
                    None => {
                        return Err(SmtError::Backend(
                            "asserted term is not boolean".into(),
                        ))
                    }
                }
            }
            if ok {
                // Complete the model so trace extraction sees every
                // declared instance.
                for &v in &self.vars {
                    if !active_vars.contains(&v) {
                        model.insert(v, Value::Bool(false));
                    }
                }
                self.model = Some(model);
                return Ok(SatOutcome::Sat);
            }
        }
        self.model = None;
        Ok(SatOutcome::Unsat)
    }

    fn get_values(&mut self, pool: &TermPool, terms: &[TermId]) -> SmtResult<Assignments> {
        let model = self.model.clone().ok_or(SmtError::NoModel)?;
        let mut out = Assignments::new();
        for &t in terms {
            out.push(t, self.eval(pool, t, &model)?);
        }
        Ok(out)
    }

    fn get_model(&mut self, _pool: &TermPool) -> SmtResult<Model> {
        self.model.clone().ok_or(SmtError::NoModel)
    }

    fn get_interpolants(
        &mut self,
        _pool: &mut TermPool,
        _names: &[String],
    ) -> SmtResult<Vec<TermId>> {
        Err(SmtError::Unsupported("interpolation"))
    }
}
