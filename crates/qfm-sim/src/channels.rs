//! Kraus decompositions of the single-qubit noise channels.
//!
//! Thermal relaxation is realized as amplitude damping followed by phase
//! damping, so [`kraus_sequence`] returns a list of Kraus sets that are
//! applied one after the other.

use num_complex::Complex64;
use qfm_ir::NoiseChannel;

use crate::error::{SimError, SimResult};
use crate::gates::{IDENTITY, Matrix2, PAULI_X, PAULI_Y, PAULI_Z, scale};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn real(v: f64) -> Complex64 {
    Complex64::new(v, 0.0)
}

fn check_probability(channel: &'static str, value: f64) -> SimResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(SimError::InvalidChannel {
            channel,
            reason: format!("probability {value} not in [0, 1]"),
        });
    }
    Ok(())
}

/// Bit flip: `√(1-p) I`, `√p X`.
pub fn bit_flip(p: f64) -> Vec<Matrix2> {
    vec![scale(&IDENTITY, (1.0 - p).sqrt()), scale(&PAULI_X, p.sqrt())]
}

/// Phase flip: `√(1-p) I`, `√p Z`.
pub fn phase_flip(p: f64) -> Vec<Matrix2> {
    vec![scale(&IDENTITY, (1.0 - p).sqrt()), scale(&PAULI_Z, p.sqrt())]
}

/// Depolarizing: `√(1-p) I` and `√(p/3)` times each Pauli.
pub fn depolarizing(p: f64) -> Vec<Matrix2> {
    let k = (p / 3.0).sqrt();
    vec![
        scale(&IDENTITY, (1.0 - p).sqrt()),
        scale(&PAULI_X, k),
        scale(&PAULI_Y, k),
        scale(&PAULI_Z, k),
    ]
}

/// Amplitude damping with decay probability `gamma`.
pub fn amplitude_damping(gamma: f64) -> Vec<Matrix2> {
    vec![
        [[real(1.0), ZERO], [ZERO, real((1.0 - gamma).sqrt())]],
        [[ZERO, real(gamma.sqrt())], [ZERO, ZERO]],
    ]
}

/// Phase damping with dephasing probability `gamma`.
pub fn phase_damping(gamma: f64) -> Vec<Matrix2> {
    vec![
        [[real(1.0), ZERO], [ZERO, real((1.0 - gamma).sqrt())]],
        [[ZERO, ZERO], [ZERO, real(gamma.sqrt())]],
    ]
}

/// Damping rates `(γ, λ)` realizing thermal relaxation with T1 = 1.
///
/// Amplitude damping `γ = 1 - e^{-t}` decays populations with T1; the
/// extra phase damping `λ = 1 - e^{t - 2t/T2}` brings the coherence decay
/// to `e^{-t/T2}`. Requires `T2 ≤ 2·T1`.
pub fn thermal_relaxation_rates(t_factor: f64, f_factor: f64) -> (f64, f64) {
    let gamma = 1.0 - (-t_factor).exp();
    let lambda = 1.0 - (t_factor - 2.0 * t_factor / f_factor).exp();
    (gamma, lambda.max(0.0))
}

/// Validate a channel and return its Kraus sets in application order.
pub fn kraus_sequence(channel: &NoiseChannel) -> SimResult<Vec<Vec<Matrix2>>> {
    let name = channel.name();
    match *channel {
        NoiseChannel::BitFlip { p } => {
            check_probability(name, p)?;
            Ok(vec![bit_flip(p)])
        }
        NoiseChannel::PhaseFlip { p } => {
            check_probability(name, p)?;
            Ok(vec![phase_flip(p)])
        }
        NoiseChannel::Depolarizing { p } => {
            check_probability(name, p)?;
            Ok(vec![depolarizing(p)])
        }
        NoiseChannel::AmplitudeDamping { gamma } => {
            check_probability(name, gamma)?;
            Ok(vec![amplitude_damping(gamma)])
        }
        NoiseChannel::PhaseDamping { gamma } => {
            check_probability(name, gamma)?;
            Ok(vec![phase_damping(gamma)])
        }
        NoiseChannel::ThermalRelaxation { t_factor, f_factor } => {
            if t_factor < 0.0 || !t_factor.is_finite() {
                return Err(SimError::InvalidChannel {
                    channel: name,
                    reason: format!("t_factor {t_factor} must be non-negative"),
                });
            }
            if !(f_factor > 0.0 && f_factor <= 2.0) {
                return Err(SimError::InvalidChannel {
                    channel: name,
                    reason: format!("f_factor {f_factor} not in (0, 2]"),
                });
            }
            let (gamma, lambda) = thermal_relaxation_rates(t_factor, f_factor);
            Ok(vec![amplitude_damping(gamma), phase_damping(lambda)])
        }
        #[allow(unreachable_patterns)]
        _ => Err(SimError::InvalidChannel {
            channel: name,
            reason: "no Kraus decomposition".into(),
        }),
    }
}
