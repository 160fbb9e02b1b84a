//! 2×2 gate matrices.

use num_complex::Complex64;
use qfm_ir::StandardGate;
use std::f64::consts::FRAC_1_SQRT_2;

/// A 2×2 complex matrix in row-major order.
pub type Matrix2 = [[Complex64; 2]; 2];

/// Local action of a standard gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateMatrix {
    /// Acts on a single qubit.
    Single(Matrix2),
    /// Acts on the target when the control is |1⟩.
    Controlled(Matrix2),
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// Identity.
pub const IDENTITY: Matrix2 = [[ONE, ZERO], [ZERO, ONE]];
/// Pauli-X.
pub const PAULI_X: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];
/// Pauli-Y.
pub const PAULI_Y: Matrix2 = [[ZERO, Complex64::new(0.0, -1.0)], [I, ZERO]];
/// Pauli-Z.
pub const PAULI_Z: Matrix2 = [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]];
/// Hadamard.
pub const HADAMARD: Matrix2 = [
    [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(FRAC_1_SQRT_2, 0.0)],
    [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(-FRAC_1_SQRT_2, 0.0)],
];

/// `RX(θ) = exp(-iθX/2)`.
pub fn rx(theta: f64) -> Matrix2 {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
    [[c, neg_i_s], [neg_i_s, c]]
}

/// `RY(θ) = exp(-iθY/2)`.
pub fn ry(theta: f64) -> Matrix2 {
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    [
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
    ]
}

/// `RZ(θ) = exp(-iθZ/2)`.
pub fn rz(theta: f64) -> Matrix2 {
    [
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
    ]
}

/// `Rot(φ, θ, ω) = RZ(ω)·RY(θ)·RZ(φ)`.
pub fn rot(phi: f64, theta: f64, omega: f64) -> Matrix2 {
    matmul(&rz(omega), &matmul(&ry(theta), &rz(phi)))
}

/// Matrix product `a · b`.
pub fn matmul(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[ZERO; 2]; 2];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = a[r][0] * b[0][c] + a[r][1] * b[1][c];
        }
    }
    out
}

/// Conjugate transpose.
pub fn adjoint(m: &Matrix2) -> Matrix2 {
    [
        [m[0][0].conj(), m[1][0].conj()],
        [m[0][1].conj(), m[1][1].conj()],
    ]
}

/// Scale every entry by a real factor.
pub fn scale(m: &Matrix2, factor: f64) -> Matrix2 {
    [
        [m[0][0] * factor, m[0][1] * factor],
        [m[1][0] * factor, m[1][1] * factor],
    ]
}

/// Get the local matrix of a standard gate.
pub fn gate_matrix(gate: &StandardGate) -> GateMatrix {
    match *gate {
        StandardGate::H => GateMatrix::Single(HADAMARD),
        StandardGate::X => GateMatrix::Single(PAULI_X),
        StandardGate::Y => GateMatrix::Single(PAULI_Y),
        StandardGate::Z => GateMatrix::Single(PAULI_Z),
        StandardGate::Rx(t) => GateMatrix::Single(rx(t)),
        StandardGate::Ry(t) => GateMatrix::Single(ry(t)),
        StandardGate::Rz(t) => GateMatrix::Single(rz(t)),
        StandardGate::Rot(phi, theta, omega) => GateMatrix::Single(rot(phi, theta, omega)),
        StandardGate::CX => GateMatrix::Controlled(PAULI_X),
        StandardGate::CZ => GateMatrix::Controlled(PAULI_Z),
        StandardGate::CRx(t) => GateMatrix::Controlled(rx(t)),
        StandardGate::CRy(t) => GateMatrix::Controlled(ry(t)),
        StandardGate::CRz(t) => GateMatrix::Controlled(rz(t)),
    }
}
