//! Error types for the sim crate.

use thiserror::Error;

/// Errors produced by density-matrix simulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Register is too wide for dense simulation.
    #[error("Cannot simulate {requested} qubits densely (maximum {max})")]
    TooManyQubits {
        /// Requested register width.
        requested: usize,
        /// Supported maximum.
        max: usize,
    },

    /// A noise channel parameter is outside its physical range.
    #[error("Invalid {channel} channel: {reason}")]
    InvalidChannel {
        /// Channel name.
        channel: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Qubit index is outside the state register.
    #[error("Qubit {qubit} out of range for {num_qubits}-qubit state")]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: usize,
        /// Register width of the state.
        num_qubits: usize,
    },

    /// Matrix or circuit dimensions do not agree.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        got: usize,
    },

    /// Circuit builder returned an error.
    #[error("Circuit IR error: {0}")]
    Ir(#[from] qfm_ir::IrError),
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
