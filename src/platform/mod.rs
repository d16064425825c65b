//! Backend implementations.

pub mod process_backend;
pub mod simulation;
pub mod stdin_buffer;

#[cfg(unix)]
pub use process_backend::ProcessBackend;
pub use process_backend::ProcessFactory;
pub use simulation::{SimulationBackend, SimulationFactory, SIM_COLUMNS, SIM_ROWS};
