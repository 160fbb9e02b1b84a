//! Dense density-matrix state.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use num_complex::Complex64;
use qfm_ir::{Instruction, InstructionKind};

use crate::channels::kraus_sequence;
use crate::error::{SimError, SimResult};
use crate::gates::{GateMatrix, Matrix2, gate_matrix};

/// Eigenvalues below this are treated as zero in entropies and square roots.
const EIGEN_EPS: f64 = 1e-12;

/// A mixed quantum state on `n` qubits, stored as a `2^n × 2^n` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    data: Array2<Complex64>,
    num_qubits: usize,
}

impl DensityMatrix {
    /// Create the state |0…0⟩⟨0…0|.
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut data = Array2::zeros((dim, dim));
        data[[0, 0]] = Complex64::new(1.0, 0.0);
        Self { data, num_qubits }
    }

    /// Create the pure state |ψ⟩⟨ψ|.
    pub fn from_statevector(amplitudes: &[Complex64]) -> SimResult<Self> {
        let num_qubits = qubits_for_dim(amplitudes.len())?;
        let dim = amplitudes.len();
        let data = Array2::from_shape_fn((dim, dim), |(r, c)| amplitudes[r] * amplitudes[c].conj());
        Ok(Self { data, num_qubits })
    }

    /// Wrap an existing square matrix of power-of-two dimension.
    pub fn from_array(data: Array2<Complex64>) -> SimResult<Self> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(SimError::DimensionMismatch {
                expected: rows,
                got: cols,
            });
        }
        let num_qubits = qubits_for_dim(rows)?;
        Ok(Self { data, num_qubits })
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Matrix dimension `2^n`.
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Borrow the underlying matrix.
    pub fn as_array(&self) -> &Array2<Complex64> {
        &self.data
    }

    /// Consume the state and return the underlying matrix.
    pub fn into_array(self) -> Array2<Complex64> {
        self.data
    }

    // =========================================================================
    // Evolution
    // =========================================================================

    /// Apply an instruction to the state.
    pub fn apply(&mut self, instruction: &Instruction) -> SimResult<()> {
        let qubits: Vec<usize> = instruction.qubits.iter().map(|q| q.index()).collect();
        for &q in &qubits {
            self.check_qubit(q)?;
        }
        match &instruction.kind {
            InstructionKind::Gate(gate) => match gate_matrix(gate) {
                GateMatrix::Single(u) => self.apply_single(&u, qubits[0]),
                GateMatrix::Controlled(u) => self.apply_controlled(&u, qubits[0], qubits[1]),
            },
            InstructionKind::Noise(channel) => {
                for set in kraus_sequence(channel)? {
                    self.apply_kraus(&set, qubits[0]);
                }
            }
        }
        Ok(())
    }

    /// Apply `ρ → U ρ U†` for a 2×2 operator on `qubit`.
    pub fn apply_single(&mut self, u: &Matrix2, qubit: usize) {
        let mask = self.mask(qubit);
        conjugate_by(&mut self.data, u, mask, 0);
    }

    /// Apply `ρ → U ρ U†` for `U` acting on `target` when `control` is |1⟩.
    pub fn apply_controlled(&mut self, u: &Matrix2, control: usize, target: usize) {
        let tmask = self.mask(target);
        let cmask = self.mask(control);
        conjugate_by(&mut self.data, u, tmask, cmask);
    }

    /// Apply the channel `ρ → Σₖ Kₖ ρ Kₖ†` on `qubit`.
    pub fn apply_kraus(&mut self, kraus: &[Matrix2], qubit: usize) {
        let mask = self.mask(qubit);
        let mut acc = Array2::<Complex64>::zeros(self.data.raw_dim());
        for k in kraus {
            let mut term = self.data.clone();
            conjugate_by(&mut term, k, mask, 0);
            acc += &term;
        }
        self.data = acc;
    }

    // =========================================================================
    // Measurement statistics
    // =========================================================================

    /// Trace of the matrix (real part).
    pub fn trace(&self) -> f64 {
        self.data.diag().iter().map(|z| z.re).sum()
    }

    /// `⟨Z⟩` on a single qubit.
    pub fn expectation_z(&self, qubit: usize) -> SimResult<f64> {
        self.check_qubit(qubit)?;
        let mask = self.mask(qubit);
        Ok(self
            .data
            .diag()
            .iter()
            .enumerate()
            .map(|(i, z)| if i & mask == 0 { z.re } else { -z.re })
            .sum())
    }

    /// Marginal computational-basis distribution over `qubits`.
    ///
    /// The outcome index is big-endian in the order the qubits are given.
    pub fn probabilities(&self, qubits: &[usize]) -> SimResult<Vec<f64>> {
        for &q in qubits {
            self.check_qubit(q)?;
        }
        let k = qubits.len();
        let mut probs = vec![0.0; 1 << k];
        for (i, z) in self.data.diag().iter().enumerate() {
            let mut outcome = 0;
            for (pos, &q) in qubits.iter().enumerate() {
                if i & self.mask(q) != 0 {
                    outcome |= 1 << (k - 1 - pos);
                }
            }
            // Diagonal entries can dip below zero by rounding under heavy noise.
            probs[outcome] += z.re.max(0.0);
        }
        Ok(probs)
    }

    // =========================================================================
    // Reductions
    // =========================================================================

    /// Trace out every qubit not in `keep`.
    ///
    /// The reduced state orders its qubits as given in `keep`.
    pub fn partial_trace(&self, keep: &[usize]) -> SimResult<DensityMatrix> {
        for (i, &q) in keep.iter().enumerate() {
            self.check_qubit(q)?;
            if keep[..i].contains(&q) {
                return Err(SimError::DimensionMismatch {
                    expected: keep.len() - 1,
                    got: keep.len(),
                });
            }
        }
        let keep_mask: usize = keep.iter().map(|&q| self.mask(q)).sum();
        let k = keep.len();
        let sub = |i: usize| -> usize {
            let mut s = 0;
            for (pos, &q) in keep.iter().enumerate() {
                if i & self.mask(q) != 0 {
                    s |= 1 << (k - 1 - pos);
                }
            }
            s
        };

        let dim = self.dim();
        let mut out = Array2::<Complex64>::zeros((1 << k, 1 << k));
        for i in 0..dim {
            let si = sub(i);
            let traced_i = i & !keep_mask;
            for j in 0..dim {
                if j & !keep_mask == traced_i {
                    out[[si, sub(j)]] += self.data[[i, j]];
                }
            }
        }
        Ok(DensityMatrix {
            data: out,
            num_qubits: k,
        })
    }

    /// Single-qubit reduced state of `qubit`.
    pub fn reduced(&self, qubit: usize) -> SimResult<DensityMatrix> {
        self.partial_trace(&[qubit])
    }

    /// Purity `Tr ρ²`.
    pub fn purity(&self) -> f64 {
        // Tr ρ² = Σ |ρᵢⱼ|² for Hermitian ρ.
        self.data.iter().map(|z| z.norm_sqr()).sum()
    }

    /// Hermitian eigen-decomposition.
    ///
    /// Returns eigenvalues and a matrix whose columns are the matching
    /// normalized eigenvectors.
    pub fn eigen(&self) -> (Vec<f64>, Array2<Complex64>) {
        let eig = SymmetricEigen::new(self.to_dmatrix());
        let values = eig.eigenvalues.iter().copied().collect();
        let dim = self.dim();
        let vectors = Array2::from_shape_fn((dim, dim), |(r, c)| eig.eigenvectors[(r, c)]);
        (values, vectors)
    }

    /// Von Neumann entropy `-Tr ρ ln ρ` in nats.
    pub fn von_neumann_entropy(&self) -> f64 {
        let (values, _) = self.eigen();
        -values
            .into_iter()
            .filter(|&l| l > EIGEN_EPS)
            .map(|l| l * l.ln())
            .sum::<f64>()
    }

    /// Uhlmann fidelity `(Tr √(√ρ σ √ρ))²`, clamped to `[0, 1]`.
    pub fn fidelity(&self, other: &DensityMatrix) -> SimResult<f64> {
        if self.num_qubits != other.num_qubits {
            return Err(SimError::DimensionMismatch {
                expected: self.num_qubits,
                got: other.num_qubits,
            });
        }
        let sqrt_rho = psd_sqrt(self.to_dmatrix());
        let inner = &sqrt_rho * other.to_dmatrix() * &sqrt_rho;
        let eig = SymmetricEigen::new(inner);
        let root_trace: f64 = eig.eigenvalues.iter().map(|&l| l.max(0.0).sqrt()).sum();
        Ok((root_trace * root_trace).clamp(0.0, 1.0))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn mask(&self, qubit: usize) -> usize {
        1 << (self.num_qubits - 1 - qubit)
    }

    fn check_qubit(&self, qubit: usize) -> SimResult<()> {
        if qubit >= self.num_qubits {
            return Err(SimError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    fn to_dmatrix(&self) -> DMatrix<Complex64> {
        let dim = self.dim();
        DMatrix::from_fn(dim, dim, |r, c| self.data[[r, c]])
    }
}

/// `ρ → U ρ U†` on the index pairs differing in `tmask`, restricted to
/// indices with every bit of `cmask` set.
fn conjugate_by(data: &mut Array2<Complex64>, u: &Matrix2, tmask: usize, cmask: usize) {
    let dim = data.nrows();

    // Left multiplication: rows.
    for i in 0..dim {
        if i & tmask != 0 || i & cmask != cmask {
            continue;
        }
        let j = i | tmask;
        for c in 0..dim {
            let a = data[[i, c]];
            let b = data[[j, c]];
            data[[i, c]] = u[0][0] * a + u[0][1] * b;
            data[[j, c]] = u[1][0] * a + u[1][1] * b;
        }
    }

    // Right multiplication by U†: columns.
    for i in 0..dim {
        if i & tmask != 0 || i & cmask != cmask {
            continue;
        }
        let j = i | tmask;
        for r in 0..dim {
            let a = data[[r, i]];
            let b = data[[r, j]];
            data[[r, i]] = a * u[0][0].conj() + b * u[0][1].conj();
            data[[r, j]] = a * u[1][0].conj() + b * u[1][1].conj();
        }
    }
}

/// Square root of a positive semi-definite Hermitian matrix.
fn psd_sqrt(m: DMatrix<Complex64>) -> DMatrix<Complex64> {
    let eig = SymmetricEigen::new(m);
    let dim = eig.eigenvalues.len();
    let v = &eig.eigenvectors;
    DMatrix::from_fn(dim, dim, |r, c| {
        (0..dim)
            .map(|k| {
                let l = eig.eigenvalues[k];
                if l > EIGEN_EPS {
                    v[(r, k)] * v[(c, k)].conj() * l.sqrt()
                } else {
                    Complex64::new(0.0, 0.0)
                }
            })
            .sum()
    })
}

fn qubits_for_dim(dim: usize) -> SimResult<usize> {
    if dim == 0 || !dim.is_power_of_two() {
        return Err(SimError::DimensionMismatch {
            expected: dim.next_power_of_two(),
            got: dim,
        });
    }
    Ok(dim.trailing_zeros() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{HADAMARD, PAULI_X, rx, ry};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn bell() -> DensityMatrix {
        let mut rho = DensityMatrix::new(2);
        rho.apply_single(&HADAMARD, 0);
        rho.apply_controlled(&PAULI_X, 0, 1);
        rho
    }

    #[test]
    fn test_initial_state() {
        let rho = DensityMatrix::new(2);
        assert_abs_diff_eq!(rho.trace(), 1.0);
        assert_abs_diff_eq!(rho.purity(), 1.0);
        assert_abs_diff_eq!(rho.expectation_z(0).unwrap(), 1.0);
    }

    #[test]
    fn test_big_endian_ordering() {
        let mut rho = DensityMatrix::new(2);
        rho.apply_single(&PAULI_X, 0);
        // |10⟩ has index 2.
        assert_abs_diff_eq!(rho.as_array()[[2, 2]].re, 1.0);
        assert_eq!(rho.probabilities(&[0, 1]).unwrap(), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(rho.probabilities(&[1, 0]).unwrap(), vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rotation_expectation() {
        let mut rho = DensityMatrix::new(1);
        rho.apply_single(&ry(0.9), 0);
        assert_abs_diff_eq!(rho.expectation_z(0).unwrap(), 0.9f64.cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_bell_reduced_state() {
        let rho = bell();
        assert_abs_diff_eq!(rho.purity(), 1.0, epsilon = 1e-12);
        for q in 0..2 {
            let red = rho.reduced(q).unwrap();
            assert_abs_diff_eq!(red.purity(), 0.5, epsilon = 1e-12);
            assert_abs_diff_eq!(red.trace(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_partial_trace_product_state() {
        let mut rho = DensityMatrix::new(3);
        rho.apply_single(&rx(1.2), 1);
        let red = rho.reduced(1).unwrap();
        assert_abs_diff_eq!(red.purity(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(red.expectation_z(0).unwrap(), 1.2f64.cos(), epsilon = 1e-12);

        let pair = rho.partial_trace(&[1, 2]).unwrap();
        assert_eq!(pair.num_qubits(), 2);
        assert_abs_diff_eq!(pair.trace(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_entropy() {
        assert_abs_diff_eq!(DensityMatrix::new(2).von_neumann_entropy(), 0.0, epsilon = 1e-9);
        let red = bell().reduced(0).unwrap();
        assert_abs_diff_eq!(red.von_neumann_entropy(), 2f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_fidelity() {
        let zero = DensityMatrix::new(1);
        let mut plus = DensityMatrix::new(1);
        plus.apply_single(&HADAMARD, 0);
        assert_abs_diff_eq!(zero.fidelity(&zero).unwrap(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(zero.fidelity(&plus).unwrap(), 0.5, epsilon = 1e-9);

        let mut one = DensityMatrix::new(1);
        one.apply_single(&PAULI_X, 0);
        assert_abs_diff_eq!(zero.fidelity(&one).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_from_statevector() {
        let amp = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let rho = DensityMatrix::from_statevector(&[amp, amp]).unwrap();
        let mut plus = DensityMatrix::new(1);
        plus.apply_single(&HADAMARD, 0);
        assert_abs_diff_eq!(rho.fidelity(&plus).unwrap(), 1.0, epsilon = 1e-9);
        assert!(DensityMatrix::from_statevector(&[amp, amp, amp]).is_err());
    }

    #[test]
    fn test_depolarizing_full_mixes() {
        let mut rho = DensityMatrix::new(1);
        rho.apply_single(&ry(PI / 3.0), 0);
        rho.apply_kraus(&crate::channels::depolarizing(0.75), 0);
        assert_abs_diff_eq!(rho.purity(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_eigen_reconstructs_mixture() {
        let mut rho = DensityMatrix::new(1);
        rho.apply_kraus(&crate::channels::bit_flip(0.25), 0);
        let (mut values, _) = rho.eigen();
        values.sort_by(f64::total_cmp);
        assert_abs_diff_eq!(values[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 0.75, epsilon = 1e-12);
    }
}
