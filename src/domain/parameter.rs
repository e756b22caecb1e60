use serde::{Deserialize, Serialize};

use super::exchange::Uncertainty;
use super::types::ParameterContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    Value(f64),
    Formula(String),
}

/// A named input or calculated parameter. `context == None` means global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub context: Option<ParameterContext>,
    pub value: ParameterValue,
    pub uncertainty: Option<Uncertainty>,
}

impl Parameter {
    pub fn global(name: impl Into<String>, value: f64) -> Self {
        Self { name: name.into(), context: None, value: ParameterValue::Value(value), uncertainty: None }
    }

    pub fn local(name: impl Into<String>, context: ParameterContext, value: f64) -> Self {
        Self { name: name.into(), context: Some(context), value: ParameterValue::Value(value), uncertainty: None }
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.value = ParameterValue::Formula(formula.into());
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: Uncertainty) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }
}

/// Scenario override of a parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRedef {
    pub name: String,
    pub context: Option<ParameterContext>,
    pub value: f64,
    pub uncertainty: Option<Uncertainty>,
}

impl ParameterRedef {
    pub fn new(name: impl Into<String>, context: Option<ParameterContext>, value: f64) -> Self {
        Self { name: name.into(), context, value, uncertainty: None }
    }
}
