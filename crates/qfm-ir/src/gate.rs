//! Quantum gate types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard gates with known semantics.
///
/// Rotation angles are bound at construction. Controlled gates take the
/// control as their first qubit operand and the target as the second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    /// Rotation around X axis.
    Rx(f64),
    /// Rotation around Y axis.
    Ry(f64),
    /// Rotation around Z axis.
    Rz(f64),
    /// General rotation `Rot(φ, θ, ω) = RZ(ω)·RY(θ)·RZ(φ)`.
    Rot(f64, f64, f64),

    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Z gate.
    CZ,
    /// Controlled rotation around X.
    CRx(f64),
    /// Controlled rotation around Y.
    CRy(f64),
    /// Controlled rotation around Z.
    CRz(f64),
}

impl StandardGate {
    /// Get the lowercase gate name.
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::Rot(..) => "rot",
            StandardGate::CX => "cx",
            StandardGate::CZ => "cz",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
        }
    }

    /// Get the number of qubits this gate acts on.
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::H
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::Rot(..) => 1,
            StandardGate::CX
            | StandardGate::CZ
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_) => 2,
        }
    }

    /// Rotation angles in operand order. Empty for fixed gates.
    pub fn angles(&self) -> Vec<f64> {
        match *self {
            StandardGate::Rx(t)
            | StandardGate::Ry(t)
            | StandardGate::Rz(t)
            | StandardGate::CRx(t)
            | StandardGate::CRy(t)
            | StandardGate::CRz(t) => vec![t],
            StandardGate::Rot(phi, theta, omega) => vec![phi, theta, omega],
            _ => vec![],
        }
    }

    /// Check if the gate carries at least one rotation angle.
    pub fn is_parameterized(&self) -> bool {
        !self.angles().is_empty()
    }

    /// Check if the gate is a controlled rotation.
    ///
    /// Controlled rotations have four distinct eigenvalue gaps and need the
    /// four-term parameter-shift rule.
    pub fn is_controlled_rotation(&self) -> bool {
        matches!(
            self,
            StandardGate::CRx(_) | StandardGate::CRy(_) | StandardGate::CRz(_)
        )
    }

    /// Return a copy with every angle passed through `f`.
    #[must_use]
    pub fn map_angles(&self, mut f: impl FnMut(f64) -> f64) -> Self {
        match *self {
            StandardGate::Rx(t) => StandardGate::Rx(f(t)),
            StandardGate::Ry(t) => StandardGate::Ry(f(t)),
            StandardGate::Rz(t) => StandardGate::Rz(f(t)),
            StandardGate::Rot(phi, theta, omega) => {
                let phi = f(phi);
                let theta = f(theta);
                StandardGate::Rot(phi, theta, f(omega))
            }
            StandardGate::CRx(t) => StandardGate::CRx(f(t)),
            StandardGate::CRy(t) => StandardGate::CRy(f(t)),
            StandardGate::CRz(t) => StandardGate::CRz(f(t)),
            other => other,
        }
    }

    /// Return a copy with the `slot`-th angle shifted by `delta`.
    ///
    /// Out-of-range slots return the gate unchanged.
    #[must_use]
    pub fn shift_angle(&self, slot: usize, delta: f64) -> Self {
        let mut idx = 0;
        self.map_angles(|t| {
            let shifted = if idx == slot { t + delta } else { t };
            idx += 1;
            shifted
        })
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let angles = self.angles();
        if angles.is_empty() {
            return write!(f, "{}", self.name());
        }
        let formatted: Vec<String> = angles.iter().map(|a| format!("{a:.4}")).collect();
        write!(f, "{}({})", self.name(), formatted.join(", "))
    }
}
