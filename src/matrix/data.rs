use nalgebra::{DMatrix, DVector};
use rand::Rng;

use super::CellMatrix;
use crate::formula::FormulaContext;
use crate::index::{FlowIndex, ImpactIndex, TechIndex};

/// The numeric matrices of one calculation. Read-only once built.
#[derive(Debug, Clone)]
pub struct MatrixData {
    pub tech_index: TechIndex,
    pub flow_index: FlowIndex,
    pub impact_index: ImpactIndex,
    /// A (n x n)
    pub tech_matrix: DMatrix<f64>,
    /// B (k x n)
    pub enviro_matrix: DMatrix<f64>,
    /// C (l x k), absent without impact assessment.
    pub impact_matrix: Option<DMatrix<f64>>,
    pub cost_vector: Option<DVector<f64>>,
}

impl MatrixData {
    /// Final demand f with the reference demand at slot 0. The demand takes
    /// the sign of the reference diagonal, so a waste treatment reference
    /// (negative diagonal) still gives a positive scaling factor.
    pub fn demand_vector(&self) -> DVector<f64> {
        let n = self.tech_index.size();
        let mut demand = DVector::zeros(n);
        if n == 0 {
            return demand;
        }
        let amount = self.tech_index.demand();
        demand[0] = if self.tech_matrix[(0, 0)] < 0.0 { -amount } else { amount };
        demand
    }

    pub fn has_impacts(&self) -> bool {
        self.impact_matrix.is_some()
    }

    pub fn has_costs(&self) -> bool {
        self.cost_vector.is_some()
    }
}

/// The cell form of [`MatrixData`]: the topology is fixed, the values can
/// be evaluated deterministically or sampled any number of times.
#[derive(Debug, Clone)]
pub struct MatrixModel {
    pub tech_index: TechIndex,
    pub flow_index: FlowIndex,
    pub impact_index: ImpactIndex,
    pub tech: CellMatrix,
    pub enviro: CellMatrix,
    pub impacts: Option<CellMatrix>,
    /// n x 1
    pub costs: Option<CellMatrix>,
    pub context: FormulaContext,
}

impl MatrixModel {
    pub fn has_uncertainties(&self) -> bool {
        self.context.has_uncertainties()
            || self.tech.has_uncertainties()
            || self.enviro.has_uncertainties()
            || self.impacts.as_ref().is_some_and(CellMatrix::has_uncertainties)
    }

    pub fn evaluate(&self) -> MatrixData {
        self.data(
            self.tech.evaluate(&self.context),
            self.enviro.evaluate(&self.context),
            self.impacts.as_ref().map(|c| c.evaluate(&self.context)),
            self.costs.as_ref().map(|k| k.evaluate(&self.context)),
        )
    }

    /// Fresh matrices with resampled parameters and cells.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> MatrixData {
        let context = self.context.sampled(rng);
        let tech = self.tech.sample(&context, rng);
        let enviro = self.enviro.sample(&context, rng);
        let impacts = self.impacts.as_ref().map(|c| c.sample(&context, rng));
        // costs carry no distributions of their own
        let costs = self.costs.as_ref().map(|k| k.evaluate(&context));
        self.data(tech, enviro, impacts, costs)
    }

    fn data(
        &self,
        tech_matrix: DMatrix<f64>,
        enviro_matrix: DMatrix<f64>,
        impact_matrix: Option<DMatrix<f64>>,
        costs: Option<DMatrix<f64>>,
    ) -> MatrixData {
        MatrixData {
            tech_index: self.tech_index.clone(),
            flow_index: self.flow_index.clone(),
            impact_index: self.impact_index.clone(),
            tech_matrix,
            enviro_matrix,
            impact_matrix,
            cost_vector: costs.map(|k| k.column(0).into_owned()),
        }
    }
}
