//! Circuit execution on a density matrix.

use qfm_ir::Circuit;
use tracing::trace;

use crate::density::DensityMatrix;
use crate::error::{SimError, SimResult};

/// Maximum register width for dense simulation (a 4096 × 4096 matrix).
pub const MAX_QUBITS: usize = 12;

/// Dense density-matrix simulator.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    max_qubits: usize,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Create a simulator with the default width limit.
    pub fn new() -> Self {
        Self {
            max_qubits: MAX_QUBITS,
        }
    }

    /// Override the register width limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Run a circuit from |0…0⟩.
    pub fn run(&self, circuit: &Circuit) -> SimResult<DensityMatrix> {
        let n = circuit.num_qubits() as usize;
        if n > self.max_qubits {
            return Err(SimError::TooManyQubits {
                requested: n,
                max: self.max_qubits,
            });
        }
        let mut state = DensityMatrix::new(n);
        self.run_on(&mut state, circuit)?;
        Ok(state)
    }

    /// Run a circuit on an existing state.
    pub fn run_on(&self, state: &mut DensityMatrix, circuit: &Circuit) -> SimResult<()> {
        let n = circuit.num_qubits() as usize;
        if state.num_qubits() != n {
            return Err(SimError::DimensionMismatch {
                expected: state.num_qubits(),
                got: n,
            });
        }
        trace!(
            num_qubits = n,
            num_gates = circuit.num_gates(),
            num_noise_ops = circuit.num_noise_ops(),
            "executing circuit"
        );
        for inst in circuit.instructions() {
            state.apply(inst)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use qfm_ir::{NoiseChannel, QubitId};

    #[test]
    fn test_run_bell() {
        let mut circuit = Circuit::new(2);
        circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        let rho = Simulator::new().run(&circuit).unwrap();
        let probs = rho.probabilities(&[0, 1]).unwrap();
        assert_abs_diff_eq!(probs[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(probs[3], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_noise_reduces_purity() {
        let mut circuit = Circuit::new(1);
        circuit
            .h(QubitId(0))
            .unwrap()
            .noise(NoiseChannel::PhaseFlip { p: 0.5 }, QubitId(0))
            .unwrap();
        let rho = Simulator::new().run(&circuit).unwrap();
        assert_abs_diff_eq!(rho.purity(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_channel_propagates() {
        let mut circuit = Circuit::new(1);
        circuit
            .noise(NoiseChannel::BitFlip { p: 2.0 }, QubitId(0))
            .unwrap();
        assert!(matches!(
            Simulator::new().run(&circuit),
            Err(SimError::InvalidChannel { .. })
        ));
    }

    #[test]
    fn test_width_limit() {
        let circuit = Circuit::new(4);
        let sim = Simulator::new().with_max_qubits(3);
        assert!(matches!(
            sim.run(&circuit),
            Err(SimError::TooManyQubits {
                requested: 4,
                max: 3
            })
        ));
    }
}
