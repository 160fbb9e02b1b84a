//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type QfmResult<T> = Result<T, QfmError>;

/// Errors that can occur while building or evaluating a model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QfmError {
    /// Ansatz name does not match any known topology.
    #[error("Unknown ansatz '{name}' (available: {available})")]
    UnknownAnsatz {
        /// The requested name.
        name: String,
        /// Comma-separated list of valid names.
        available: String,
    },

    /// Qubit count is unusable for the requested model.
    #[error("Invalid qubit count {n_qubits}: {reason}")]
    InvalidQubitCount {
        /// The requested qubit count.
        n_qubits: usize,
        /// Why it was rejected.
        reason: String,
    },

    /// Noise config key is not a recognized noise kind.
    #[error("Unknown noise kind '{0}'")]
    UnknownNoiseKind(String),

    /// Noise rate outside its valid range.
    #[error("Invalid rate {value} for noise kind '{kind}': {reason}")]
    InvalidNoiseRate {
        /// Noise kind name.
        kind: String,
        /// The offending value.
        value: f64,
        /// Valid range description.
        reason: String,
    },

    /// Selective-noise mode is not one of "both", "iec", "pqc".
    #[error("selective_noise must be 'both', 'iec' or 'pqc', got '{0}'")]
    InvalidSelectiveNoise(String),

    /// Array shape does not match what the model expects.
    #[error("Invalid shape for {what}: expected {expected}, got {got}")]
    InvalidShape {
        /// Which array was malformed.
        what: &'static str,
        /// Expected shape.
        expected: String,
        /// Actual shape.
        got: String,
    },

    /// Output qubit selection references a missing qubit or is empty.
    #[error("Invalid output qubit selection: {0}")]
    InvalidOutputQubit(String),

    /// Any other invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An expected upstream result is missing or empty.
    #[error("No data available: {0}")]
    DataUnavailable(String),

    /// Circuit construction failed.
    #[error("Circuit IR error: {0}")]
    Ir(#[from] qfm_ir::IrError),

    /// Simulation failed.
    #[error("Simulation error: {0}")]
    Sim(#[from] qfm_sim::SimError),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QfmError {
    /// Whether this error stems from invalid configuration rather than a
    /// runtime failure.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            QfmError::UnknownAnsatz { .. }
                | QfmError::InvalidQubitCount { .. }
                | QfmError::UnknownNoiseKind(_)
                | QfmError::InvalidNoiseRate { .. }
                | QfmError::InvalidSelectiveNoise(_)
                | QfmError::InvalidShape { .. }
                | QfmError::InvalidOutputQubit(_)
                | QfmError::InvalidArgument(_)
                | QfmError::Sim(qfm_sim::SimError::InvalidChannel { .. })
        )
    }

    /// Whether this error signals a missing upstream result.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, QfmError::DataUnavailable(_))
    }
}
