//! QFM Circuit Intermediate Representation
//!
//! Flat, validated op lists for the layered variational circuits studied by
//! the QFM engine. A [`Circuit`] is a sequence of [`Instruction`]s, each of
//! which is either a unitary [`StandardGate`] or a single-qubit
//! [`NoiseChannel`]. All gate angles are concrete `f64` values; circuits are
//! rebuilt for every parameter set, which keeps the IR trivially cloneable
//! and hashable for caching upstream.
//!
//! # Example
//!
//! ```rust
//! use qfm_ir::{Circuit, NoiseChannel, QubitId};
//!
//! let mut circuit = Circuit::new(2);
//! circuit
//!     .ry(0.3, QubitId(0))
//!     .unwrap()
//!     .cz(QubitId(0), QubitId(1))
//!     .unwrap()
//!     .noise(NoiseChannel::BitFlip { p: 0.01 }, QubitId(1))
//!     .unwrap();
//!
//! assert_eq!(circuit.num_gates(), 2);
//! assert_eq!(circuit.num_noise_ops(), 1);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Description |
//! |------|--------|-------------|
//! | `H` | 1 | Hadamard gate |
//! | `X`, `Y`, `Z` | 1 | Pauli gates |
//! | `Rx`, `Ry`, `Rz` | 1 | Rotation gates |
//! | `Rot` | 1 | General rotation RZ(ω)·RY(θ)·RZ(φ) |
//! | `CX`, `CZ` | 2 | Controlled-NOT and Controlled-Z |
//! | `CRx`, `CRy`, `CRz` | 2 | Controlled rotations |

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod noise;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use noise::NoiseChannel;
pub use qubit::QubitId;
