//! Life-cycle assessment calculation engine.
//!
//! The pipeline runs in four stages:
//! 1. [`index::TechGraphResolver`] walks the provider graph of a product
//!    system into a [`index::TechIndex`].
//! 2. [`matrix::MatrixAssembler`] turns the index plus the raw exchange,
//!    parameter and characterization data into numeric matrices.
//! 3. A [`solver::MatrixSolver`] backend solves the technology matrix.
//! 4. A [`results::SolutionProvider`] derives every reportable quantity
//!    from the solution.
//!
//! [`calculation::SystemCalculator`] wires these together, and
//! [`simulation::Simulator`] repeats stages 2-4 with sampled values.

pub mod calculation;
pub mod config;
pub mod domain;
pub mod error;
pub mod formula;
pub mod index;
pub mod matrix;
pub mod results;
pub mod simulation;
pub mod solver;
pub mod source;
pub mod telemetry;
pub mod uncertainty;

pub use calculation::{CalculationSetup, SystemCalculator};
pub use error::{CalcError, CalcResult};
pub use results::SolutionProvider;
