//! Ansatz library: the variational layer topologies.
//!
//! Each [`Ansatz`] maps a flat per-layer parameter slice and a qubit count to
//! a deterministic gate sequence. Gate order is fixed per topology because
//! the Fourier-degree accounting downstream depends on it.
//!
//! | Name | Params/layer (n > 1) | Layer |
//! |---|---|---|
//! | `Circuit_1` | 2n | RX, RZ per qubit |
//! | `Circuit_5` | 4n + n(n-1) | RX, RZ per qubit; all-to-all CRZ; RX, RZ per qubit |
//! | `Circuit_9` | n | H all; descending CZ chain; RX per qubit |
//! | `Circuit_15` | 2n | RY per qubit; CNOT ring; RY per qubit; offset CNOT ring |
//! | `Circuit_18` | 3n | RX, RZ per qubit; CRZ ring |
//! | `Circuit_19` | 3n | RX, RZ per qubit; CRX ring |
//! | `No_Entangling` | 3n | Rot per qubit |
//! | `Strongly_Entangling` | 6n | Rot per qubit; CNOT ring; Rot per qubit; CNOT ring at n/2 |
//! | `Hardware_Efficient` | 3n | RY, RZ per qubit; CZ chain |
//!
//! With a single qubit the entangling topologies degrade to a two-parameter
//! local layer.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use qfm_ir::{Circuit, IrResult, QubitId};
use serde::{Deserialize, Serialize};

use crate::error::QfmError;

/// A named variational layer topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ansatz {
    /// Local RX/RZ rotations, no entanglement.
    Circuit1,
    /// Local rotations around an all-to-all controlled-RZ block.
    Circuit5,
    /// Hadamard layer, CZ chain, RX rotations.
    Circuit9,
    /// RY rotations with two CNOT rings.
    Circuit15,
    /// Local rotations with a controlled-RZ ring.
    Circuit18,
    /// Local rotations with a controlled-RX ring.
    Circuit19,
    /// One general rotation per qubit.
    NoEntangling,
    /// Two rounds of general rotations, each followed by a CNOT ring.
    StronglyEntangling,
    /// RY/RZ rotations with a nearest-neighbour CZ chain.
    HardwareEfficient,
}

/// Parameter-shift recipe for one parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftRule {
    /// Two-term rule with shifts ±π/2 (single-qubit Pauli rotations).
    TwoTerm,
    /// Four-term rule with shifts ±π/2, ±3π/2 (controlled rotations).
    FourTerm,
}

/// A strided index range into a layer's parameter slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlIndices {
    /// First index.
    pub start: usize,
    /// One past the last index.
    pub end: usize,
    /// Stride.
    pub step: usize,
}

impl ControlIndices {
    /// Iterate over the selected indices.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (self.start..self.end).step_by(self.step.max(1))
    }

    /// Number of selected indices.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no index is selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ansatz {
    /// All topologies, in listing order.
    pub const ALL: [Ansatz; 9] = [
        Ansatz::Circuit1,
        Ansatz::Circuit5,
        Ansatz::Circuit9,
        Ansatz::Circuit15,
        Ansatz::Circuit18,
        Ansatz::Circuit19,
        Ansatz::NoEntangling,
        Ansatz::StronglyEntangling,
        Ansatz::HardwareEfficient,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Ansatz::Circuit1 => "Circuit_1",
            Ansatz::Circuit5 => "Circuit_5",
            Ansatz::Circuit9 => "Circuit_9",
            Ansatz::Circuit15 => "Circuit_15",
            Ansatz::Circuit18 => "Circuit_18",
            Ansatz::Circuit19 => "Circuit_19",
            Ansatz::NoEntangling => "No_Entangling",
            Ansatz::StronglyEntangling => "Strongly_Entangling",
            Ansatz::HardwareEfficient => "Hardware_Efficient",
        }
    }

    /// Comma-separated canonical names, for error messages.
    pub fn available() -> String {
        Self::ALL.iter().map(Ansatz::name).collect::<Vec<_>>().join(", ")
    }

    /// Whether the topology places entangling gates when `n > 1`.
    pub fn is_entangling(&self) -> bool {
        !matches!(
            self,
            Ansatz::Circuit1 | Ansatz::NoEntangling
        )
    }

    /// Number of parameters one layer consumes.
    pub fn params_per_layer(&self, n_qubits: usize) -> usize {
        let n = n_qubits;
        match self {
            Ansatz::Circuit1 => 2 * n,
            Ansatz::Circuit9 => n,
            Ansatz::NoEntangling => 3 * n,
            _ if n < 2 => 2,
            Ansatz::Circuit5 => 4 * n + n * (n - 1),
            Ansatz::Circuit15 => 2 * n,
            Ansatz::Circuit18 | Ansatz::Circuit19 | Ansatz::HardwareEfficient => 3 * n,
            Ansatz::StronglyEntangling => 6 * n,
        }
    }

    /// Indices of the parameters that act as entangling-control angles.
    ///
    /// Purely diagnostic; `None` when the topology has no controlled
    /// rotations at this width.
    pub fn control_indices(&self, n_qubits: usize) -> Option<ControlIndices> {
        if n_qubits < 2 {
            return None;
        }
        let ppl = self.params_per_layer(n_qubits);
        match self {
            Ansatz::Circuit18 | Ansatz::Circuit19 | Ansatz::StronglyEntangling => {
                Some(ControlIndices {
                    start: 2,
                    end: ppl,
                    step: 3,
                })
            }
            Ansatz::Circuit5 => Some(ControlIndices {
                start: 2 * n_qubits,
                end: 2 * n_qubits + n_qubits * (n_qubits - 1),
                step: 1,
            }),
            _ => None,
        }
    }

    /// Control angles of one layer's parameter slice.
    pub fn control_params(&self, layer: &[f64], n_qubits: usize) -> Option<Vec<f64>> {
        let idx = self.control_indices(n_qubits)?;
        Some(idx.iter().filter_map(|i| layer.get(i).copied()).collect())
    }

    /// Mean control-rotation magnitude `Σ (|θ| mod 2π) / count` over layers.
    pub fn control_rotation_mean<'a>(
        &self,
        layers: impl IntoIterator<Item = &'a [f64]>,
        n_qubits: usize,
    ) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for layer in layers {
            for theta in self.control_params(layer, n_qubits)? {
                sum += theta.abs() % TAU;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Shift rule for parameter slot `idx` of a layer.
    pub fn shift_rule(&self, idx: usize, n_qubits: usize) -> ShiftRule {
        let n = n_qubits;
        if n < 2 {
            return ShiftRule::TwoTerm;
        }
        let controlled = match self {
            Ansatz::Circuit18 | Ansatz::Circuit19 => idx >= 2 * n,
            Ansatz::Circuit5 => (2 * n..2 * n + n * (n - 1)).contains(&idx),
            _ => false,
        };
        if controlled {
            ShiftRule::FourTerm
        } else {
            ShiftRule::TwoTerm
        }
    }

    /// Append one layer to `circuit`.
    ///
    /// `w` must hold at least [`params_per_layer`](Self::params_per_layer)
    /// values.
    pub fn build(&self, w: &[f64], n_qubits: usize, circuit: &mut Circuit) -> IrResult<()> {
        debug_assert!(w.len() >= self.params_per_layer(n_qubits));
        let n = n_qubits;
        let q = |i: usize| QubitId::from(i);

        match self {
            Ansatz::Circuit1 => {
                for i in 0..n {
                    circuit.rx(w[2 * i], q(i))?.rz(w[2 * i + 1], q(i))?;
                }
            }

            Ansatz::Circuit9 => {
                for i in 0..n {
                    circuit.h(q(i))?;
                }
                for i in 0..n.saturating_sub(1) {
                    circuit.cz(q(n - i - 2), q(n - i - 1))?;
                }
                for i in 0..n {
                    circuit.rx(w[i], q(i))?;
                }
            }

            Ansatz::NoEntangling => {
                for i in 0..n {
                    circuit.rot(w[3 * i], w[3 * i + 1], w[3 * i + 2], q(i))?;
                }
            }

            Ansatz::HardwareEfficient => {
                for i in 0..n {
                    circuit.ry(w[2 * i], q(i))?.rz(w[2 * i + 1], q(i))?;
                }
                for i in 0..n.saturating_sub(1) {
                    circuit.cz(q(i), q(i + 1))?;
                }
            }

            Ansatz::Circuit18 | Ansatz::Circuit19 => {
                for i in 0..n {
                    circuit.rx(w[2 * i], q(i))?.rz(w[2 * i + 1], q(i))?;
                }
                if n > 1 {
                    let mut idx = 2 * n;
                    for i in 0..n {
                        let (control, target) = (q(n - i - 1), q((n - i) % n));
                        if *self == Ansatz::Circuit19 {
                            circuit.crx(w[idx], control, target)?;
                        } else {
                            circuit.crz(w[idx], control, target)?;
                        }
                        idx += 1;
                    }
                }
            }

            Ansatz::Circuit5 => {
                if n < 2 {
                    circuit.rx(w[0], q(0))?.rz(w[1], q(0))?;
                    return Ok(());
                }
                let mut idx = 0;
                for i in 0..n {
                    circuit.rx(w[idx], q(i))?.rz(w[idx + 1], q(i))?;
                    idx += 2;
                }
                for c in 0..n {
                    for t in 0..n {
                        if c == t {
                            continue;
                        }
                        circuit.crz(w[idx], q(n - c - 1), q(n - t - 1))?;
                        idx += 1;
                    }
                }
                for i in 0..n {
                    circuit.rx(w[idx], q(i))?.rz(w[idx + 1], q(i))?;
                    idx += 2;
                }
            }

            Ansatz::Circuit15 => {
                if n < 2 {
                    circuit.ry(w[0], q(0))?.rz(w[1], q(0))?;
                    return Ok(());
                }
                for i in 0..n {
                    circuit.ry(w[i], q(i))?;
                }
                for i in 0..n {
                    circuit.cx(q(n - i - 1), q((n - i) % n))?;
                }
                for i in 0..n {
                    circuit.ry(w[n + i], q(i))?;
                }
                for i in 0..n {
                    circuit.cx(q((i + n - 1) % n), q((i + n - 2) % n))?;
                }
            }

            Ansatz::StronglyEntangling => {
                if n < 2 {
                    circuit.ry(w[0], q(0))?.rz(w[1], q(0))?;
                    return Ok(());
                }
                for i in 0..n {
                    circuit.rot(w[3 * i], w[3 * i + 1], w[3 * i + 2], q(i))?;
                }
                for i in 0..n {
                    circuit.cx(q(i), q((i + 1) % n))?;
                }
                let offset = 3 * n;
                for i in 0..n {
                    circuit.rot(
                        w[offset + 3 * i],
                        w[offset + 3 * i + 1],
                        w[offset + 3 * i + 2],
                        q(i),
                    )?;
                }
                for i in 0..n {
                    circuit.cx(q(i), q((i + n / 2) % n))?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Ansatz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Ansatz {
    type Err = QfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ansatz = match s {
            "Circuit_1" | "Circuit_01" => Ansatz::Circuit1,
            "Circuit_5" | "Circuit_05" => Ansatz::Circuit5,
            "Circuit_9" | "Circuit_09" => Ansatz::Circuit9,
            "Circuit_15" => Ansatz::Circuit15,
            "Circuit_18" => Ansatz::Circuit18,
            "Circuit_19" => Ansatz::Circuit19,
            "No_Entangling" => Ansatz::NoEntangling,
            "Strongly_Entangling" => Ansatz::StronglyEntangling,
            "Hardware_Efficient" => Ansatz::HardwareEfficient,
            other => {
                return Err(QfmError::UnknownAnsatz {
                    name: other.to_string(),
                    available: Self::available(),
                });
            }
        };
        Ok(ansatz)
    }
}

impl TryFrom<String> for Ansatz {
    type Error = QfmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ansatz> for String {
    fn from(value: Ansatz) -> Self {
        value.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(ansatz: Ansatz, n: usize) -> Circuit {
        let w: Vec<f64> = (0..ansatz.params_per_layer(n))
            .map(|i| 0.1 * (i + 1) as f64)
            .collect();
        let mut circuit = Circuit::new(n as u32);
        ansatz.build(&w, n, &mut circuit).unwrap();
        circuit
    }

    #[test]
    fn test_params_per_layer_table() {
        let n = 4;
        assert_eq!(Ansatz::HardwareEfficient.params_per_layer(n), 12);
        assert_eq!(Ansatz::Circuit19.params_per_layer(n), 12);
        assert_eq!(Ansatz::Circuit18.params_per_layer(n), 12);
        assert_eq!(Ansatz::Circuit9.params_per_layer(n), 4);
        assert_eq!(Ansatz::Circuit1.params_per_layer(n), 8);
        assert_eq!(Ansatz::StronglyEntangling.params_per_layer(n), 24);
        assert_eq!(Ansatz::NoEntangling.params_per_layer(n), 12);
        assert_eq!(Ansatz::Circuit5.params_per_layer(n), 28);
        assert_eq!(Ansatz::Circuit15.params_per_layer(n), 8);
    }

    #[test]
    fn test_single_qubit_fallback() {
        for ansatz in [
            Ansatz::HardwareEfficient,
            Ansatz::Circuit19,
            Ansatz::Circuit18,
            Ansatz::StronglyEntangling,
            Ansatz::Circuit5,
            Ansatz::Circuit15,
        ] {
            assert_eq!(ansatz.params_per_layer(1), 2, "{ansatz}");
            let circuit = layer(ansatz, 1);
            assert_eq!(circuit.num_gates(), 2, "{ansatz}");
        }
    }

    #[test]
    fn test_gate_sequences() {
        let counts = layer(Ansatz::HardwareEfficient, 3).count_ops();
        assert_eq!(counts.get("ry"), Some(&3));
        assert_eq!(counts.get("rz"), Some(&3));
        assert_eq!(counts.get("cz"), Some(&2));

        let counts = layer(Ansatz::Circuit19, 3).count_ops();
        assert_eq!(counts.get("crx"), Some(&3));

        let counts = layer(Ansatz::Circuit5, 3).count_ops();
        assert_eq!(counts.get("crz"), Some(&6));
        assert_eq!(counts.get("rx"), Some(&6));

        let counts = layer(Ansatz::StronglyEntangling, 2).count_ops();
        assert_eq!(counts.get("rot"), Some(&4));
        assert_eq!(counts.get("cx"), Some(&4));
    }

    #[test]
    fn test_circuit19_wiring() {
        let circuit = layer(Ansatz::Circuit19, 3);
        let ctrl: Vec<(u32, u32)> = circuit
            .instructions()
            .iter()
            .filter(|i| i.name() == "crx")
            .map(|i| (i.qubits[0].0, i.qubits[1].0))
            .collect();
        assert_eq!(ctrl, vec![(2, 0), (1, 2), (0, 1)]);
    }

    #[test]
    fn test_circuit9_wiring() {
        let circuit = layer(Ansatz::Circuit9, 3);
        let cz: Vec<(u32, u32)> = circuit
            .instructions()
            .iter()
            .filter(|i| i.name() == "cz")
            .map(|i| (i.qubits[0].0, i.qubits[1].0))
            .collect();
        assert_eq!(cz, vec![(1, 2), (0, 1)]);
    }

    #[test]
    fn test_control_indices() {
        let idx = Ansatz::Circuit19.control_indices(3).unwrap();
        assert_eq!(idx.iter().collect::<Vec<_>>(), vec![2, 5, 8]);
        assert!(Ansatz::HardwareEfficient.control_indices(3).is_none());
        assert!(Ansatz::Circuit19.control_indices(1).is_none());
    }

    #[test]
    fn test_control_rotation_mean() {
        let w = [0.0, 0.0, 1.0, 0.0, 0.0, -3.0];
        let mean = Ansatz::Circuit19
            .control_rotation_mean([&w[..]], 2)
            .unwrap();
        assert!((mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_shift_rules() {
        assert_eq!(Ansatz::Circuit19.shift_rule(0, 3), ShiftRule::TwoTerm);
        assert_eq!(Ansatz::Circuit19.shift_rule(6, 3), ShiftRule::FourTerm);
        assert_eq!(Ansatz::Circuit5.shift_rule(6, 3), ShiftRule::FourTerm);
        assert_eq!(Ansatz::Circuit5.shift_rule(12, 3), ShiftRule::TwoTerm);
        assert_eq!(Ansatz::HardwareEfficient.shift_rule(5, 3), ShiftRule::TwoTerm);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Circuit_01".parse::<Ansatz>().unwrap(), Ansatz::Circuit1);
        assert_eq!(
            "Hardware_Efficient".parse::<Ansatz>().unwrap(),
            Ansatz::HardwareEfficient
        );
        let err = "Circuit_42".parse::<Ansatz>().unwrap_err();
        assert!(err.is_configuration_error());
        for ansatz in Ansatz::ALL {
            assert_eq!(ansatz.name().parse::<Ansatz>().unwrap(), ansatz);
        }
    }
}
