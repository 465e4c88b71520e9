//! Z3-backed solver (feature `z3`, requires a local Z3 install).
//!
//! Pool terms are translated to `z3::ast` nodes on the fly; variable
//! instances become named constants (`scope.name@offset`), uninterpreted
//! symbols become `FuncDecl`s, and n-ary definitions are installed as
//! quantified axioms. Z3 provides no sequence interpolation, so
//! `get_interpolants` reports `Unsupported`; an interpolating backend plugs
//! in through the same trait.

use std::collections::HashSet;

use z3::ast::{Ast, Bool, Dynamic, Int, Real};
use z3::{Config, Context, FuncDecl, SatResult, Solver};

use vigil_term::{Model, Sort, SymId, TermData, TermId, TermPool, Value, Var};

use crate::error::{SmtError, SmtResult};
use crate::solver::{Assignments, SatOutcome, SmtSolver, SolverConfig};

/// Builds a Z3 [`Config`] from a facade [`SolverConfig`].
pub fn z3_config(conf: &SolverConfig) -> Config {
    let mut cfg = Config::new();
    if let Some(ms) = conf.timeout_ms {
        cfg.set_param_value("timeout", &ms.to_string());
    }
    cfg
}

/// An incremental Z3 session over a caller-owned [`Context`].
pub struct Z3Solver<'ctx> {
    ctx: &'ctx Context,
    solver: Solver<'ctx>,
    vars: Vec<Var>,
    var_set: HashSet<Var>,
}

impl<'ctx> Z3Solver<'ctx> {
    /// A fresh session on the given context.
    pub fn new(ctx: &'ctx Context) -> Self {
        Z3Solver {
            ctx,
            solver: Solver::new(ctx),
            vars: Vec::new(),
            var_set: HashSet::new(),
        }
    }

    fn var_name(pool: &TermPool, var: Var) -> String {
        let sv = pool.state_var(var.svar);
        if sv.is_const {
            sv.qualified()
        } else {
            format!("{}@{}", sv.qualified(), var.offset)
        }
    }

    fn z3_sort(&self, sort: Sort) -> z3::Sort<'ctx> {
        match sort {
            Sort::Bool => z3::Sort::bool(self.ctx),
            Sort::Int => z3::Sort::int(self.ctx),
            Sort::Real => z3::Sort::real(self.ctx),
        }
    }

    fn encode_var(&self, pool: &TermPool, var: Var) -> Dynamic<'ctx> {
        let name = Self::var_name(pool, var);
        match pool.state_var(var.svar).sort {
            Sort::Bool => Dynamic::from_ast(&Bool::new_const(self.ctx, name.as_str())),
            Sort::Int => Dynamic::from_ast(&Int::new_const(self.ctx, name.as_str())),
            Sort::Real => Dynamic::from_ast(&Real::new_const(self.ctx, name.as_str())),
        }
    }

    fn fun_decl(&self, pool: &TermPool, sym: SymId) -> FuncDecl<'ctx> {
        let fs = pool.fun_sym(sym);
        let domain: Vec<z3::Sort> = fs.args.iter().map(|s| self.z3_sort(*s)).collect();
        let domain_refs: Vec<&z3::Sort> = domain.iter().collect();
        FuncDecl::new(self.ctx, fs.name.as_str(), &domain_refs, &self.z3_sort(fs.ret))
    }

    fn as_bool(&self, d: Dynamic<'ctx>) -> SmtResult<Bool<'ctx>> {
        d.as_bool()
            .ok_or_else(|| SmtError::Backend("boolean term expected".into()))
    }

    fn as_int(&self, d: Dynamic<'ctx>) -> SmtResult<Int<'ctx>> {
        d.as_int()
            .ok_or_else(|| SmtError::Backend("integer term expected".into()))
    }

    fn encode(&self, pool: &TermPool, t: TermId) -> SmtResult<Dynamic<'ctx>> {
        let b = |x: Bool<'ctx>| Dynamic::from_ast(&x);
        Ok(match pool.term(t) {
            TermData::True => b(Bool::from_bool(self.ctx, true)),
            TermData::False => b(Bool::from_bool(self.ctx, false)),
            TermData::Int(n) => Dynamic::from_ast(&Int::from_i64(self.ctx, *n)),
            TermData::Var(v) => self.encode_var(pool, *v),
            TermData::App(sym, args) => {
                let decl = self.fun_decl(pool, *sym);
                let encoded: Vec<Dynamic> = args
                    .iter()
                    .map(|a| self.encode(pool, *a))
                    .collect::<SmtResult<_>>()?;
                let refs: Vec<&dyn Ast> = encoded.iter().map(|a| a as &dyn Ast).collect();
                decl.apply(&refs)
            }
            TermData::Not(x) => {
                let x = self.as_bool(self.encode(pool, *x)?)?;
                b(x.not())
            }
            TermData::And(xs) => {
                let kids: Vec<Bool> = xs
                    .iter()
                    .map(|x| self.as_bool(self.encode(pool, *x)?))
                    .collect::<SmtResult<_>>()?;
                let refs: Vec<&Bool> = kids.iter().collect();
                b(Bool::and(self.ctx, &refs))
            }
            TermData::Or(xs) => {
                let kids: Vec<Bool> = xs
                    .iter()
                    .map(|x| self.as_bool(self.encode(pool, *x)?))
                    .collect::<SmtResult<_>>()?;
                let refs: Vec<&Bool> = kids.iter().collect();
                b(Bool::or(self.ctx, &refs))
            }
            TermData::Implies(lhs, rhs) => {
                let lhs = self.as_bool(self.encode(pool, *lhs)?)?;
                let rhs = self.as_bool(self.encode(pool, *rhs)?)?;
                b(lhs.implies(&rhs))
            }
            TermData::Iff(lhs, rhs) => {
                let lhs = self.as_bool(self.encode(pool, *lhs)?)?;
                let rhs = self.as_bool(self.encode(pool, *rhs)?)?;
                b(lhs._eq(&rhs))
            }
            TermData::Ite(c, x, y) => {
                let c = self.as_bool(self.encode(pool, *c)?)?;
                let x = self.encode(pool, *x)?;
                let y = self.encode(pool, *y)?;
                c.ite(&x, &y)
            }
            TermData::Eq(lhs, rhs) => {
                let lhs = self.encode(pool, *lhs)?;
                let rhs = self.encode(pool, *rhs)?;
                b(lhs._eq(&rhs))
            }
            TermData::Leq(lhs, rhs) => {
                let lhs = self.as_int(self.encode(pool, *lhs)?)?;
                let rhs = self.as_int(self.encode(pool, *rhs)?)?;
                b(lhs.le(&rhs))
            }
            TermData::Lt(lhs, rhs) => {
                let lhs = self.as_int(self.encode(pool, *lhs)?)?;
                let rhs = self.as_int(self.encode(pool, *rhs)?)?;
                b(lhs.lt(&rhs))
            }
            TermData::Add(xs) => {
                let kids: Vec<Int> = xs
                    .iter()
                    .map(|x| self.as_int(self.encode(pool, *x)?))
                    .collect::<SmtResult<_>>()?;
                let refs: Vec<&Int> = kids.iter().collect();
                Dynamic::from_ast(&Int::add(self.ctx, &refs))
            }
            TermData::Sub(lhs, rhs) => {
                let lhs = self.as_int(self.encode(pool, *lhs)?)?;
                let rhs = self.as_int(self.encode(pool, *rhs)?)?;
                Dynamic::from_ast(&(lhs - rhs))
            }
        })
    }

    fn extract(&self, d: &Dynamic<'ctx>) -> SmtResult<Value> {
        if let Some(b) = d.as_bool().and_then(|b| b.as_bool()) {
            return Ok(Value::Bool(b));
        }
        if let Some(n) = d.as_int().and_then(|i| i.as_i64()) {
            return Ok(Value::Int(n));
        }
        Err(SmtError::Backend(
            "model value is neither boolean nor integer".into(),
        ))
    }
}

impl SmtSolver for Z3Solver<'_> {
    fn declare_var(&mut self, _pool: &TermPool, var: Var) -> SmtResult {
        if self.var_set.insert(var) {
            self.vars.push(var);
        }
        Ok(())
    }

    fn declare_fun(&mut self, _pool: &TermPool, _sym: SymId) -> SmtResult {
        // FuncDecls are interned by name on use.
        Ok(())
    }

    fn define_fun(
        &mut self,
        pool: &TermPool,
        sym: SymId,
        params: &[Var],
        body: TermId,
    ) -> SmtResult {
        let decl = self.fun_decl(pool, sym);
        let encoded_params: Vec<Dynamic> =
            params.iter().map(|p| self.encode_var(pool, *p)).collect();
        let param_refs: Vec<&dyn Ast> = encoded_params.iter().map(|p| p as &dyn Ast).collect();
        let app = decl.apply(&param_refs);
        let body = self.encode(pool, body)?;
        let eq = app._eq(&body);
        if params.is_empty() {
            self.solver.assert(&eq);
        } else {
            let axiom = z3::ast::forall_const(self.ctx, &param_refs, &[], &eq);
            self.solver.assert(&axiom);
        }
        Ok(())
    }

    fn assert_term(&mut self, pool: &TermPool, term: TermId) -> SmtResult {
        let t = self.as_bool(self.encode(pool, term)?)?;
        self.solver.assert(&t);
        Ok(())
    }

    fn assert_named(&mut self, pool: &TermPool, term: TermId, name: &str) -> SmtResult {
        let t = self.as_bool(self.encode(pool, term)?)?;
        let tag = Bool::new_const(self.ctx, name);
        self.solver.assert_and_track(&t, &tag);
        Ok(())
    }

    fn push(&mut self) -> SmtResult {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> SmtResult {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat_assuming(
        &mut self,
        pool: &TermPool,
        assumptions: &[TermId],
    ) -> SmtResult<SatOutcome> {
        let encoded: Vec<Bool> = assumptions
            .iter()
            .map(|a| self.as_bool(self.encode(pool, *a)?))
            .collect::<SmtResult<_>>()?;
        match self.solver.check_assumptions(&encoded) {
            SatResult::Sat => Ok(SatOutcome::Sat),
            SatResult::Unsat => Ok(SatOutcome::Unsat),
            SatResult::Unknown => Err(SmtError::Unknown),
        }
    }

    fn get_values(&mut self, pool: &TermPool, terms: &[TermId]) -> SmtResult<Assignments> {
        let model = self.solver.get_model().ok_or(SmtError::NoModel)?;
        let mut out = Assignments::new();
        for &t in terms {
            let ast = self.encode(pool, t)?;
            let evaluated = model
                .eval(&ast, true)
                .ok_or_else(|| SmtError::Backend("model evaluation failed".into()))?;
            out.push(t, self.extract(&evaluated)?);
        }
        Ok(out)
    }

    fn get_model(&mut self, pool: &TermPool) -> SmtResult<Model> {
        let model = self.solver.get_model().ok_or(SmtError::NoModel)?;
        let mut out = Model::new();
        for &var in &self.vars {
            let ast = self.encode_var(pool, var);
            let evaluated = model
                .eval(&ast, true)
                .ok_or_else(|| SmtError::Backend("model evaluation failed".into()))?;
            out.insert(var, self.extract(&evaluated)?);
        }
        Ok(out)
    }

    fn get_interpolants(
        &mut self,
        _pool: &mut TermPool,
        _names: &[String],
    ) -> SmtResult<Vec<TermId>> {
        Err(SmtError::Unsupported("interpolation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_term::StateVar;

    #[test]
    fn sat_and_unsat_roundtrip() {
        let cfg = z3_config(&SolverConfig::default());
        let ctx = Context::new(&cfg);
        let mut pool = TermPool::new();
        let mut solver = Z3Solver::new(&ctx);

        let sv = pool.declare_state_var(StateVar::new("p", ["m"], Sort::Bool));
        solver.declare_var(&pool, sv.at(0)).unwrap();
        let p = pool.mk_var(sv.at(0));
        solver.assert_term(&pool, p).unwrap();
        assert_eq!(
            solver.check_sat_assuming(&pool, &[]).unwrap(),
            SatOutcome::Sat
        );
        let model = solver.get_model(&pool).unwrap();
        assert_eq!(model.get_bool(sv.at(0)), Some(true));

        let np = pool.mk_not(p);
        solver.assert_term(&pool, np).unwrap();
        assert_eq!(
            solver.check_sat_assuming(&pool, &[]).unwrap(),
            SatOutcome::Unsat
        );
    }

    #[test]
    fn integer_arithmetic_checks() {
        let cfg = z3_config(&SolverConfig::default());
        let ctx = Context::new(&cfg);
        let mut pool = TermPool::new();
        let mut solver = Z3Solver::new(&ctx);

        let sv = pool.declare_state_var(StateVar::new("n", ["m"], Sort::Int));
        solver.declare_var(&pool, sv.at(0)).unwrap();
        let n = pool.mk_var(sv.at(0));
        let five = pool.mk_int(5);
        let lt = pool.mk_lt(n, five);
        let geq = pool.mk_leq(five, n);
        solver.assert_term(&pool, lt).unwrap();
        assert!(solver.check_sat_assuming(&pool, &[]).unwrap().is_sat());
        solver.assert_term(&pool, geq).unwrap();
        assert_eq!(
            solver.check_sat_assuming(&pool, &[]).unwrap(),
            SatOutcome::Unsat
        );
    }
}
