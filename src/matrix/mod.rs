//! Matrix assembly.
//!
//! Raw records become [`Cell`]s first (literal or formula amount, optional
//! distribution), collected in a [`MatrixModel`]. Evaluating the model gives
//! the numeric [`MatrixData`]; sampling it gives one Monte Carlo draw.

pub mod allocation;
pub mod assembler;
pub mod cell;
pub mod config;
pub mod data;
pub mod impact_builder;

pub use allocation::AllocationIndex;
pub use assembler::MatrixAssembler;
pub use cell::{Cell, CellMatrix, CellValue};
pub use config::MatrixConfig;
pub use data::{MatrixData, MatrixModel};
pub use impact_builder::ImpactBuilder;
