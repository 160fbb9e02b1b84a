//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur while building a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index is outside the circuit register.
    #[error("Qubit {qubit} out of range for {num_qubits}-qubit circuit{}", format_op_context(.op_name))]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Register width of the circuit.
        num_qubits: u32,
        /// Optional gate or channel name for context.
        op_name: Option<String>,
    },

    /// Gate requires different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_op_context(.op_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate or channel name for context.
        op_name: Option<String>,
    },

    /// A gate angle is NaN or infinite.
    #[error("Non-finite angle {value} in gate '{gate_name}'")]
    NonFiniteAngle {
        /// Name of the gate.
        gate_name: String,
        /// The offending value.
        value: f64,
    },
}

#[allow(clippy::ref_option)]
fn format_op_context(op_name: &Option<String>) -> String {
    match op_name {
        Some(name) => format!(" (op: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
