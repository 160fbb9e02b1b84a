//! `qfm-sim`: exact density-matrix simulation for noisy QFM circuits.
//!
//! Executes a [`qfm_ir::Circuit`] on a dense `2^n × 2^n` density matrix:
//!
//! - unitary gates act as `ρ → U ρ U†`, applied pairwise over the affected
//!   basis indices without materializing the full operator
//! - noise channels act as Kraus maps `ρ → Σₖ Kₖ ρ Kₖ†`
//!
//! Qubit 0 is the most significant bit of the basis index, so the basis
//! state `|q0 q1 … q(n-1)⟩` has index `q0·2^(n-1) + … + q(n-1)`.
//!
//! Besides execution, [`DensityMatrix`] provides the reductions used by the
//! metric estimators: Pauli-Z expectation, marginal probabilities, partial
//! trace, purity, von Neumann entropy, eigen-decomposition and Uhlmann
//! fidelity.
//!
//! # Quick start
//!
//! ```rust
//! use qfm_ir::{Circuit, QubitId};
//! use qfm_sim::Simulator;
//!
//! let mut circuit = Circuit::new(2);
//! circuit.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let rho = Simulator::new().run(&circuit).unwrap();
//! assert!((rho.purity() - 1.0).abs() < 1e-12);
//! assert!((rho.reduced(0).unwrap().purity() - 0.5).abs() < 1e-12);
//! ```

pub mod channels;
pub mod density;
pub mod error;
pub mod gates;
pub mod simulator;

pub use density::DensityMatrix;
pub use error::{SimError, SimResult};
pub use gates::{GateMatrix, Matrix2};
pub use simulator::{MAX_QUBITS, Simulator};
