use nalgebra::DMatrix;
use rand::Rng;
use tracing::error;

use crate::domain::{ParameterContext, Uncertainty};
use crate::formula::{parse, Expr, FormulaContext};
use crate::uncertainty::NumberGenerator;

/// The raw amount of a cell.
#[derive(Debug, Clone)]
pub enum CellValue {
    Literal(f64),
    /// `expr` is `None` when the formula does not parse; the cell then
    /// always uses `fallback`.
    Formula { text: String, expr: Option<Expr>, fallback: f64 },
}

impl CellValue {
    pub fn of(amount: f64, formula: Option<&str>) -> Self {
        match formula.map(str::trim).filter(|f| !f.is_empty()) {
            None => CellValue::Literal(amount),
            Some(text) => {
                let expr = match parse(text) {
                    Ok(expr) => Some(expr),
                    Err(e) => {
                        error!(formula = text, error = %e, "invalid formula; using stored amount");
                        None
                    }
                };
                CellValue::Formula { text: text.to_string(), expr, fallback: amount }
            }
        }
    }
}

/// One contribution to a matrix entry: an exchange, an impact factor, or a
/// cost value, together with the rules to turn it into a number.
#[derive(Debug, Clone)]
pub struct Cell {
    pub value: CellValue,
    pub conversion_factor: f64,
    pub negate: bool,
    pub allocation_factor: f64,
    pub context: Option<ParameterContext>,
    pub uncertainty: Option<Uncertainty>,
}

impl Cell {
    pub fn literal(amount: f64) -> Self {
        Self {
            value: CellValue::Literal(amount),
            conversion_factor: 1.0,
            negate: false,
            allocation_factor: 1.0,
            context: None,
            uncertainty: None,
        }
    }

    pub fn new(value: CellValue, context: Option<ParameterContext>) -> Self {
        Self { value, context, ..Self::literal(0.0) }
    }

    pub fn with_conversion_factor(mut self, factor: f64) -> Self {
        self.conversion_factor = factor;
        self
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn with_allocation_factor(mut self, factor: f64) -> Self {
        self.allocation_factor = factor;
        self
    }

    /// Keeps the uncertainty only when it declares a distribution.
    pub fn with_uncertainty(mut self, uncertainty: Option<Uncertainty>) -> Self {
        self.uncertainty = uncertainty.filter(|u| !u.is_none());
        self
    }

    /// The deterministic amount before conversion and sign.
    fn amount(&self, context: &FormulaContext) -> f64 {
        match &self.value {
            CellValue::Literal(v) => *v,
            CellValue::Formula { text, expr, fallback } => {
                let Some(expr) = expr else {
                    return *fallback;
                };
                match context.eval_expr(self.context, expr) {
                    Ok(v) => v,
                    Err(e) => {
                        error!(
                            formula = text.as_str(),
                            context = ?self.context,
                            error = %e,
                            "formula evaluation failed; using stored amount"
                        );
                        *fallback
                    }
                }
            }
        }
    }

    fn finish(&self, amount: f64) -> f64 {
        let v = amount * self.conversion_factor * self.allocation_factor;
        if self.negate {
            -v
        } else {
            v
        }
    }

    pub fn value(&self, context: &FormulaContext) -> f64 {
        self.finish(self.amount(context))
    }

    /// One independent draw. Without a distribution this is exactly
    /// [`Cell::value`].
    pub fn next_sample<R: Rng + ?Sized>(&self, context: &FormulaContext, rng: &mut R) -> f64 {
        let amount = self.amount(context);
        match &self.uncertainty {
            None => self.finish(amount),
            Some(uncertainty) => self.finish(NumberGenerator::of(uncertainty, amount).next(rng)),
        }
    }

    pub fn is_uncertain(&self) -> bool {
        self.uncertainty.is_some()
    }
}

/// A sparse list of cells that evaluates to a dense matrix. Cells at the
/// same position are summed.
#[derive(Debug, Clone)]
pub struct CellMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<(usize, usize, Cell)>,
}

impl CellMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, entries: Vec::new() }
    }

    pub fn add(&mut self, row: usize, col: usize, cell: Cell) {
        self.entries.push((row, col, cell));
    }

    /// Grows the row count, e.g. when the flow index learns new flows
    /// after the matrix was created.
    pub fn set_rows(&mut self, rows: usize) {
        self.rows = self.rows.max(rows);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_uncertainties(&self) -> bool {
        self.entries.iter().any(|(_, _, c)| c.is_uncertain())
    }

    pub fn evaluate(&self, context: &FormulaContext) -> DMatrix<f64> {
        let mut matrix = DMatrix::zeros(self.rows, self.cols);
        for (row, col, cell) in &self.entries {
            matrix[(*row, *col)] += cell.value(context);
        }
        matrix
    }

    pub fn sample<R: Rng + ?Sized>(&self, context: &FormulaContext, rng: &mut R) -> DMatrix<f64> {
        let mut matrix = DMatrix::zeros(self.rows, self.cols);
        for (row, col, cell) in &self.entries {
            matrix[(*row, *col)] += cell.next_sample(context, rng);
        }
        matrix
    }
}
