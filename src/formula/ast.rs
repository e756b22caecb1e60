use super::FormulaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Parsed formula. Identifiers are stored lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

fn truth(v: bool) -> f64 {
    if v { 1.0 } else { 0.0 }
}

impl Expr {
    /// Evaluates the expression; `lookup` resolves variable names.
    pub fn eval<F>(&self, lookup: &mut F) -> Result<f64, FormulaError>
    where
        F: FnMut(&str) -> Result<f64, FormulaError>,
    {
        match self {
            Expr::Number(v) => Ok(*v),
            Expr::Variable(name) => match lookup(name.as_str()) {
                Err(FormulaError::UnknownVariable(_)) if name == "pi" => Ok(std::f64::consts::PI),
                Err(FormulaError::UnknownVariable(_)) if name == "e" => Ok(std::f64::consts::E),
                other => other,
            },
            Expr::Neg(inner) => Ok(-inner.eval(lookup)?),
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.eval(lookup)?;
                let b = rhs.eval(lookup)?;
                Ok(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Lt => truth(a < b),
                    BinaryOp::Le => truth(a <= b),
                    BinaryOp::Gt => truth(a > b),
                    BinaryOp::Ge => truth(a >= b),
                    BinaryOp::Eq => truth(a == b),
                    BinaryOp::Ne => truth(a != b),
                })
            }
            Expr::Call(name, args) => call(name, args, lookup),
        }
    }
}

fn arity(name: &str, expected: &str, got: usize) -> FormulaError {
    FormulaError::Arity { name: name.to_string(), expected: expected.to_string(), got }
}

fn call<F>(name: &str, args: &[Expr], lookup: &mut F) -> Result<f64, FormulaError>
where
    F: FnMut(&str) -> Result<f64, FormulaError>,
{
    // `if` only evaluates the branch it takes
    if name == "if" {
        if args.len() != 3 {
            return Err(arity(name, "3", args.len()));
        }
        let condition = args[0].eval(lookup)?;
        return if condition != 0.0 { args[1].eval(lookup) } else { args[2].eval(lookup) };
    }

    let values = args.iter().map(|a| a.eval(lookup)).collect::<Result<Vec<_>, _>>()?;
    let unary = |f: fn(f64) -> f64| -> Result<f64, FormulaError> {
        match values.as_slice() {
            [x] => Ok(f(*x)),
            _ => Err(arity(name, "1", values.len())),
        }
    };

    match name {
        "abs" => unary(f64::abs),
        "sqrt" => unary(f64::sqrt),
        "exp" => unary(f64::exp),
        "ln" => unary(f64::ln),
        "log" | "log10" => unary(f64::log10),
        "ceil" => unary(f64::ceil),
        "floor" => unary(f64::floor),
        "not" => unary(|x| truth(x == 0.0)),
        "round" => match values.as_slice() {
            [x] => Ok(x.round()),
            [x, digits] => {
                let factor = 10f64.powi(*digits as i32);
                Ok((x * factor).round() / factor)
            }
            _ => Err(arity(name, "1 or 2", values.len())),
        },
        "min" | "max" | "sum" | "avg" | "and" | "or" => {
            if values.is_empty() {
                return Err(arity(name, "at least 1", 0));
            }
            let it = values.iter().copied();
            Ok(match name {
                "min" => it.fold(f64::INFINITY, f64::min),
                "max" => it.fold(f64::NEG_INFINITY, f64::max),
                "sum" => it.sum(),
                "avg" => it.sum::<f64>() / values.len() as f64,
                "and" => truth(values.iter().all(|v| *v != 0.0)),
                _ => truth(values.iter().any(|v| *v != 0.0)),
            })
        }
        _ => Err(FormulaError::UnknownFunction(name.to_string())),
    }
}
