//! Single-qubit noise channels.
//!
//! Channels are inserted into the op list as ordinary instructions and
//! realized by the simulator as Kraus maps. Every channel acts on exactly
//! one qubit.

use serde::{Deserialize, Serialize};

/// A completely positive, trace-preserving single-qubit channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum NoiseChannel {
    /// Bit-flip channel: applies X with probability `p`.
    BitFlip {
        /// Flip probability (0.0 to 1.0).
        p: f64,
    },

    /// Phase-flip channel: applies Z with probability `p`.
    PhaseFlip {
        /// Flip probability (0.0 to 1.0).
        p: f64,
    },

    /// Amplitude damping: energy relaxation towards |0⟩.
    AmplitudeDamping {
        /// Damping parameter (0.0 to 1.0).
        gamma: f64,
    },

    /// Phase damping: dephasing without energy loss.
    PhaseDamping {
        /// Dephasing parameter (0.0 to 1.0).
        gamma: f64,
    },

    /// Depolarizing channel: X, Y or Z each with probability `p/3`.
    Depolarizing {
        /// Error probability (0.0 to 1.0).
        p: f64,
    },

    /// Thermal relaxation with T1 = 1.
    ///
    /// `t_factor` is the gate time in units of T1 and `f_factor` is T2 in
    /// units of T1 (physical range `(0, 2]`).
    ThermalRelaxation {
        /// Gate time over T1.
        t_factor: f64,
        /// T2 over T1.
        f_factor: f64,
    },
}

impl NoiseChannel {
    /// Get a human-readable name for this channel.
    pub fn name(&self) -> &'static str {
        match self {
            NoiseChannel::BitFlip { .. } => "bit_flip",
            NoiseChannel::PhaseFlip { .. } => "phase_flip",
            NoiseChannel::AmplitudeDamping { .. } => "amplitude_damping",
            NoiseChannel::PhaseDamping { .. } => "phase_damping",
            NoiseChannel::Depolarizing { .. } => "depolarizing",
            NoiseChannel::ThermalRelaxation { .. } => "thermal_relaxation",
        }
    }

    /// Get the primary error parameter of this channel.
    pub fn error_param(&self) -> f64 {
        match *self {
            NoiseChannel::BitFlip { p }
            | NoiseChannel::PhaseFlip { p }
            | NoiseChannel::Depolarizing { p } => p,
            NoiseChannel::AmplitudeDamping { gamma } | NoiseChannel::PhaseDamping { gamma } => {
                gamma
            }
            NoiseChannel::ThermalRelaxation { t_factor, .. } => t_factor,
        }
    }

    /// Check whether the channel is the identity map.
    pub fn is_identity(&self) -> bool {
        self.error_param() == 0.0
    }
}

impl std::fmt::Display for NoiseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoiseChannel::BitFlip { p } => write!(f, "bit_flip(p={p:.4})"),
            NoiseChannel::PhaseFlip { p } => write!(f, "phase_flip(p={p:.4})"),
            NoiseChannel::AmplitudeDamping { gamma } => {
                write!(f, "amplitude_damping(γ={gamma:.4})")
            }
            NoiseChannel::PhaseDamping { gamma } => write!(f, "phase_damping(γ={gamma:.4})"),
            NoiseChannel::Depolarizing { p } => write!(f, "depolarizing(p={p:.4})"),
            NoiseChannel::ThermalRelaxation { t_factor, f_factor } => {
                write!(f, "thermal_relaxation(t={t_factor:.4}, T2={f_factor:.4})")
            }
        }
    }
}
