use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

use super::{parse, Expr, FormulaError};
use crate::domain::{Parameter, ParameterContext, ParameterRedef, ParameterValue, Uncertainty};
use crate::uncertainty::NumberGenerator;

/// Bound value of a parameter. Formulas are parsed when bound; a parse
/// error is kept and reported on every lookup.
#[derive(Debug, Clone)]
enum Bound {
    Value(f64),
    Formula(Result<Arc<Expr>, FormulaError>),
}

impl From<ParameterValue> for Bound {
    fn from(value: ParameterValue) -> Self {
        match value {
            ParameterValue::Value(v) => Bound::Value(v),
            ParameterValue::Formula(text) => Bound::Formula(parse(&text).map(Arc::new)),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Bound,
    uncertainty: Option<Uncertainty>,
}

/// One symbol table. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: HashMap<String, Entry>,
}

impl Scope {
    fn bind(&mut self, name: &str, value: ParameterValue, uncertainty: Option<Uncertainty>) {
        self.entries.insert(name.to_lowercase(), Entry { value: value.into(), uncertainty });
    }

    fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parameter scopes for formula evaluation: one global table plus one
/// local table per process or impact category. Lookups go local first,
/// then global. Global formulas only see the global table.
#[derive(Debug, Clone, Default)]
pub struct FormulaContext {
    global: Scope,
    locals: HashMap<ParameterContext, Scope>,
}

impl FormulaContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(parameters: &[Parameter]) -> Self {
        let mut context = Self::new();
        for parameter in parameters {
            context.bind(parameter);
        }
        context
    }

    pub fn bind(&mut self, parameter: &Parameter) {
        self.scope_mut(parameter.context)
            .bind(&parameter.name, parameter.value.clone(), parameter.uncertainty.clone());
    }

    pub fn bind_value(&mut self, context: Option<ParameterContext>, name: &str, value: f64) {
        self.scope_mut(context).bind(name, ParameterValue::Value(value), None);
    }

    /// Redefinitions replace the bound value (and uncertainty) of a
    /// parameter; a redefined formula parameter becomes an input value.
    pub fn apply_redefs(&mut self, redefs: &[ParameterRedef]) {
        for redef in redefs {
            self.scope_mut(redef.context).bind(
                &redef.name,
                ParameterValue::Value(redef.value),
                redef.uncertainty.clone(),
            );
        }
    }

    fn scope_mut(&mut self, context: Option<ParameterContext>) -> &mut Scope {
        match context {
            None => &mut self.global,
            Some(c) => self.locals.entry(c).or_default(),
        }
    }

    pub fn global_scope(&self) -> &Scope {
        &self.global
    }

    pub fn local_scope(&self, context: ParameterContext) -> Option<&Scope> {
        self.locals.get(&context)
    }

    pub fn eval(&self, context: Option<ParameterContext>, formula: &str) -> Result<f64, FormulaError> {
        let expr = parse(formula)?;
        self.eval_expr(context, &expr)
    }

    pub fn eval_expr(&self, context: Option<ParameterContext>, expr: &Expr) -> Result<f64, FormulaError> {
        let mut visiting = Vec::new();
        let value = expr.eval(&mut |name: &str| self.resolve(context, name, &mut visiting))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NotFinite(value))
        }
    }

    /// Current value of a parameter as seen from the given context.
    pub fn value_of(&self, context: Option<ParameterContext>, name: &str) -> Result<f64, FormulaError> {
        let mut visiting = Vec::new();
        self.resolve(context, &name.to_lowercase(), &mut visiting)
    }

    fn resolve(
        &self,
        context: Option<ParameterContext>,
        name: &str,
        visiting: &mut Vec<(Option<ParameterContext>, String)>,
    ) -> Result<f64, FormulaError> {
        let local = context.and_then(|c| self.locals.get(&c).and_then(|s| s.get(name)).map(|e| (Some(c), e)));
        let (owner, entry) = match local {
            Some(found) => found,
            None => match self.global.get(name) {
                Some(entry) => (None, entry),
                None => return Err(FormulaError::UnknownVariable(name.to_string())),
            },
        };

        match &entry.value {
            Bound::Value(v) => Ok(*v),
            Bound::Formula(Err(e)) => Err(e.clone()),
            Bound::Formula(Ok(expr)) => {
                let key = (owner, name.to_string());
                if visiting.contains(&key) {
                    return Err(FormulaError::Cycle(name.to_string()));
                }
                visiting.push(key);
                let value = expr.eval(&mut |n: &str| self.resolve(owner, n, visiting));
                visiting.pop();
                value
            }
        }
    }

    pub fn has_uncertainties(&self) -> bool {
        std::iter::once(&self.global)
            .chain(self.locals.values())
            .flat_map(|s| s.entries.values())
            .any(|e| e.uncertainty.as_ref().is_some_and(|u| !u.is_none()))
    }

    /// A copy in which every uncertain input value is replaced by one draw
    /// from its distribution. Formula parameters keep their formulas.
    pub fn sampled<R: Rng + ?Sized>(&self, rng: &mut R) -> FormulaContext {
        let mut copy = self.clone();
        for scope in std::iter::once(&mut copy.global).chain(copy.locals.values_mut()) {
            for entry in scope.entries.values_mut() {
                let (Bound::Value(v), Some(u)) = (&entry.value, &entry.uncertainty) else {
                    continue;
                };
                if u.is_none() {
                    continue;
                }
                let sample = NumberGenerator::of(u, *v).next(rng);
                entry.value = Bound::Value(sample);
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const P1: ParameterContext = ParameterContext::Process(1);
    const P2: ParameterContext = ParameterContext::Process(2);

    fn context() -> FormulaContext {
        FormulaContext::from_parameters(&[
            Parameter::global("g", 2.0),
            Parameter::global("g2", 0.0).with_formula("g * 10"),
            Parameter::local("a", P1, 3.0),
            Parameter::local("g", P1, 5.0),
            Parameter::local("b", P1, 0.0).with_formula("a + g + g2"),
        ])
    }

    #[test]
    fn test_local_then_global() {
        let ctx = context();
        assert_eq!(ctx.eval(Some(P1), "g").unwrap(), 5.0);
        assert_eq!(ctx.eval(Some(P2), "g").unwrap(), 2.0);
        assert_eq!(ctx.eval(None, "G").unwrap(), 2.0);
        assert_eq!(ctx.eval(Some(P1), "b").unwrap(), 3.0 + 5.0 + 20.0);
        assert_eq!(
            ctx.eval(Some(P2), "a"),
            Err(FormulaError::UnknownVariable("a".to_string()))
        );
    }

    #[test]
    fn test_redefs_override() {
        let mut ctx = context();
        ctx.apply_redefs(&[
            ParameterRedef::new("g", None, 4.0),
            ParameterRedef::new("a", Some(P1), 1.0),
        ]);
        assert_eq!(ctx.value_of(None, "g2").unwrap(), 40.0);
        assert_eq!(ctx.value_of(Some(P1), "b").unwrap(), 1.0 + 5.0 + 40.0);
    }

    #[test]
    fn test_cycles_are_detected() {
        let ctx = FormulaContext::from_parameters(&[
            Parameter::global("x", 0.0).with_formula("y + 1"),
            Parameter::global("y", 0.0).with_formula("x + 1"),
        ]);
        assert!(matches!(ctx.eval(None, "x"), Err(FormulaError::Cycle(_))));
    }

    #[test]
    fn test_division_by_zero_is_not_finite() {
        let ctx = FormulaContext::new();
        assert!(matches!(ctx.eval(None, "1 / 0"), Err(FormulaError::NotFinite(_))));
    }

    #[test]
    fn test_sampled_replaces_uncertain_inputs() {
        let ctx = FormulaContext::from_parameters(&[
            Parameter::global("u", 5.0).with_uncertainty(Uncertainty::uniform(10.0, 20.0)),
            Parameter::global("c", 1.0),
        ]);
        assert!(ctx.has_uncertainties());
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let sampled = ctx.sampled(&mut rng);
            let u = sampled.value_of(None, "u").unwrap();
            assert!((10.0..20.0).contains(&u));
            assert_eq!(sampled.value_of(None, "c").unwrap(), 1.0);
        }
        assert_eq!(ctx.value_of(None, "u").unwrap(), 5.0);
    }

    #[test]
    fn test_formula_parameters_survive_sampling() {
        let ctx = FormulaContext::from_parameters(&[
            Parameter::global("u", 5.0).with_uncertainty(Uncertainty::uniform(1.0, 2.0)),
            Parameter::global("w", 0.0).with_formula("u * 10"),
            Parameter::global("broken", 0.0).with_formula("sqrt("),
        ]);
        assert_eq!(ctx.value_of(None, "w").unwrap(), 50.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10 {
            let sampled = ctx.sampled(&mut rng);
            let w = sampled.value_of(None, "w").unwrap();
            assert!((10.0..20.0).contains(&w));
            assert!(matches!(sampled.value_of(None, "broken"), Err(FormulaError::Parse { .. })));
        }
    }
}
