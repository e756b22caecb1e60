//! Read-only snapshot records loaded from the data source.

pub mod exchange;
pub mod parameter;
pub mod system;
pub mod types;

pub use exchange::*;
pub use parameter::*;
pub use system::*;
pub use types::*;
