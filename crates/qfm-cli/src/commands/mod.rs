//! CLI command implementations.

pub mod ansaetze;
pub mod coefficients;
pub mod common;
pub mod entanglement;
pub mod expressibility;
pub mod train;
