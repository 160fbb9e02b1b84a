//! Noise configuration.
//!
//! A [`NoiseConfig`] names a rate for every recognized noise kind. Rates
//! are linear in the sweep level: `config * (step / steps)` interpolates
//! from the noiseless model to the full target. Thermal relaxation is the
//! one structured entry; scaling acts on its gate time (`t_factor`) and
//! leaves the `T2/T1` ratio (`f_factor`) alone.
//!
//! # Example
//!
//! ```
//! use qfm::{NoiseConfig, NoiseKind};
//!
//! let config = NoiseConfig::default().with_rate(NoiseKind::BitFlip, 0.1).unwrap();
//! let half = config.clone() * 0.5;
//! assert_eq!(half.rate(NoiseKind::BitFlip), 0.05);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

use qfm_ir::NoiseChannel;
use serde::{Deserialize, Serialize};

use crate::error::{QfmError, QfmResult};

/// Recognized noise kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoiseKind {
    /// X with probability `p`.
    BitFlip,
    /// Z with probability `p`.
    PhaseFlip,
    /// Energy relaxation towards |0⟩.
    AmplitudeDamping,
    /// Dephasing without energy loss.
    PhaseDamping,
    /// Uniform Pauli error.
    Depolarizing,
    /// T1/T2 relaxation over one gate time.
    ThermalRelaxation,
    /// Gaussian over-/under-rotation of every parameterized gate.
    GateError,
    /// Bit flip on every qubit before the first gate.
    StatePreparation,
    /// Bit flip on every qubit before readout.
    Measurement,
}

impl NoiseKind {
    /// All kinds, in channel application order.
    pub const ALL: [NoiseKind; 9] = [
        NoiseKind::BitFlip,
        NoiseKind::PhaseFlip,
        NoiseKind::AmplitudeDamping,
        NoiseKind::PhaseDamping,
        NoiseKind::Depolarizing,
        NoiseKind::ThermalRelaxation,
        NoiseKind::GateError,
        NoiseKind::StatePreparation,
        NoiseKind::Measurement,
    ];

    /// Configuration key.
    pub fn name(&self) -> &'static str {
        match self {
            NoiseKind::BitFlip => "BitFlip",
            NoiseKind::PhaseFlip => "PhaseFlip",
            NoiseKind::AmplitudeDamping => "AmplitudeDamping",
            NoiseKind::PhaseDamping => "PhaseDamping",
            NoiseKind::Depolarizing => "Depolarizing",
            NoiseKind::ThermalRelaxation => "ThermalRelaxation",
            NoiseKind::GateError => "GateError",
            NoiseKind::StatePreparation => "StatePreparation",
            NoiseKind::Measurement => "Measurement",
        }
    }
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseKind {
    type Err = QfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DepolarizingChannel" => Ok(NoiseKind::Depolarizing),
            _ => NoiseKind::ALL
                .into_iter()
                .find(|k| k.name() == s)
                .ok_or_else(|| QfmError::UnknownNoiseKind(s.to_string())),
        }
    }
}

/// Thermal relaxation parameters with T1 = 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalRelaxation {
    /// Gate time over T1.
    pub t_factor: f64,
    /// T2 over T1.
    pub f_factor: f64,
}

/// Which sub-parts of the circuit receive noise.
///
/// Parsed from the `selective_noise` strings `"both"`, `"iec"` (input
/// encoding only) and `"pqc"` (ansatz only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoiseScope {
    /// Noise after the input-encoding gates.
    pub encoding: bool,
    /// Noise after the ansatz gates.
    pub ansatz: bool,
}

impl NoiseScope {
    /// Noise everywhere.
    pub const BOTH: NoiseScope = NoiseScope {
        encoding: true,
        ansatz: true,
    };
    /// Noise on the input encoding only.
    pub const ENCODING: NoiseScope = NoiseScope {
        encoding: true,
        ansatz: false,
    };
    /// Noise on the ansatz only.
    pub const ANSATZ: NoiseScope = NoiseScope {
        encoding: false,
        ansatz: true,
    };

    /// Mode string.
    pub fn as_str(&self) -> &'static str {
        match (self.encoding, self.ansatz) {
            (true, false) => "iec",
            (false, true) => "pqc",
            _ => "both",
        }
    }
}

impl Default for NoiseScope {
    fn default() -> Self {
        Self::BOTH
    }
}

impl FromStr for NoiseScope {
    type Err = QfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(Self::BOTH),
            "iec" => Ok(Self::ENCODING),
            "pqc" => Ok(Self::ANSATZ),
            other => Err(QfmError::InvalidSelectiveNoise(other.to_string())),
        }
    }
}

impl TryFrom<String> for NoiseScope {
    type Error = QfmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoiseScope> for String {
    fn from(value: NoiseScope) -> Self {
        value.as_str().to_string()
    }
}

/// A value in the serialized noise map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoiseValue {
    /// Plain rate.
    Rate(f64),
    /// Structured thermal relaxation entry.
    Thermal(ThermalRelaxation),
}

/// Rates for every noise kind. Missing kinds are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, NoiseValue>",
    into = "BTreeMap<String, NoiseValue>"
)]
pub struct NoiseConfig {
    /// Bit-flip probability.
    pub bit_flip: f64,
    /// Phase-flip probability.
    pub phase_flip: f64,
    /// Amplitude-damping probability.
    pub amplitude_damping: f64,
    /// Phase-damping probability.
    pub phase_damping: f64,
    /// Depolarizing probability.
    pub depolarizing: f64,
    /// Thermal relaxation, if enabled.
    pub thermal_relaxation: Option<ThermalRelaxation>,
    /// Standard deviation of the gate over-rotation (radians).
    pub gate_error: f64,
    /// State-preparation bit-flip probability.
    pub state_preparation: f64,
    /// Readout bit-flip probability.
    pub measurement: f64,
}

impl NoiseConfig {
    /// Noise config with a single kind set.
    pub fn single(kind: NoiseKind, rate: f64) -> QfmResult<Self> {
        Self::default().with_rate(kind, rate)
    }

    /// Set the scalar rate of `kind`.
    ///
    /// For [`NoiseKind::ThermalRelaxation`] the rate is the `t_factor`;
    /// the `f_factor` is kept, or defaults to 1.
    pub fn with_rate(mut self, kind: NoiseKind, rate: f64) -> QfmResult<Self> {
        *self.slot_mut(kind) = rate;
        self.validate()?;
        Ok(self)
    }

    /// Set thermal relaxation.
    pub fn with_thermal_relaxation(mut self, t_factor: f64, f_factor: f64) -> QfmResult<Self> {
        self.thermal_relaxation = Some(ThermalRelaxation { t_factor, f_factor });
        self.validate()?;
        Ok(self)
    }

    /// Scalar rate of `kind` (`t_factor` for thermal relaxation).
    pub fn rate(&self, kind: NoiseKind) -> f64 {
        match kind {
            NoiseKind::BitFlip => self.bit_flip,
            NoiseKind::PhaseFlip => self.phase_flip,
            NoiseKind::AmplitudeDamping => self.amplitude_damping,
            NoiseKind::PhaseDamping => self.phase_damping,
            NoiseKind::Depolarizing => self.depolarizing,
            NoiseKind::ThermalRelaxation => self.thermal_relaxation.map_or(0.0, |t| t.t_factor),
            NoiseKind::GateError => self.gate_error,
            NoiseKind::StatePreparation => self.state_preparation,
            NoiseKind::Measurement => self.measurement,
        }
    }

    fn slot_mut(&mut self, kind: NoiseKind) -> &mut f64 {
        match kind {
            NoiseKind::BitFlip => &mut self.bit_flip,
            NoiseKind::PhaseFlip => &mut self.phase_flip,
            NoiseKind::AmplitudeDamping => &mut self.amplitude_damping,
            NoiseKind::PhaseDamping => &mut self.phase_damping,
            NoiseKind::Depolarizing => &mut self.depolarizing,
            NoiseKind::ThermalRelaxation => {
                &mut self
                    .thermal_relaxation
                    .get_or_insert(ThermalRelaxation {
                        t_factor: 0.0,
                        f_factor: 1.0,
                    })
                    .t_factor
            }
            NoiseKind::GateError => &mut self.gate_error,
            NoiseKind::StatePreparation => &mut self.state_preparation,
            NoiseKind::Measurement => &mut self.measurement,
        }
    }

    /// Kinds with a non-zero rate, in channel order.
    pub fn active_kinds(&self) -> Vec<NoiseKind> {
        NoiseKind::ALL
            .into_iter()
            .filter(|&k| self.rate(k) != 0.0)
            .collect()
    }

    /// Whether every rate is zero.
    pub fn is_noiseless(&self) -> bool {
        self.active_kinds().is_empty()
    }

    /// Scale every rate by `factor`.
    ///
    /// Thermal relaxation scales its gate time only; the `T2/T1` ratio is
    /// a device property that does not vary along a sweep.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            bit_flip: self.bit_flip * factor,
            phase_flip: self.phase_flip * factor,
            amplitude_damping: self.amplitude_damping * factor,
            phase_damping: self.phase_damping * factor,
            depolarizing: self.depolarizing * factor,
            thermal_relaxation: self.thermal_relaxation.map(|t| ThermalRelaxation {
                t_factor: t.t_factor * factor,
                f_factor: t.f_factor,
            }),
            gate_error: self.gate_error * factor,
            state_preparation: self.state_preparation * factor,
            measurement: self.measurement * factor,
        }
    }

    /// Check every rate against its valid range.
    pub fn validate(&self) -> QfmResult<()> {
        for kind in NoiseKind::ALL {
            if kind == NoiseKind::ThermalRelaxation {
                continue;
            }
            let value = self.rate(kind);
            if !(0.0..=1.0).contains(&value) {
                return Err(QfmError::InvalidNoiseRate {
                    kind: kind.name().to_string(),
                    value,
                    reason: "must be in [0, 1]".into(),
                });
            }
        }
        if let Some(t) = self.thermal_relaxation {
            if !(t.t_factor >= 0.0 && t.t_factor.is_finite()) {
                return Err(QfmError::InvalidNoiseRate {
                    kind: "ThermalRelaxation.t_factor".into(),
                    value: t.t_factor,
                    reason: "must be non-negative".into(),
                });
            }
            if !(t.f_factor > 0.0 && t.f_factor <= 2.0) {
                return Err(QfmError::InvalidNoiseRate {
                    kind: "ThermalRelaxation.f_factor".into(),
                    value: t.f_factor,
                    reason: "must be in (0, 2]".into(),
                });
            }
        }
        Ok(())
    }

    /// Channels applied to every qubit once per layer, in fixed order.
    ///
    /// Zero-rate channels are skipped.
    pub fn layer_channels(&self) -> Vec<NoiseChannel> {
        let mut channels = Vec::with_capacity(6);
        if self.bit_flip > 0.0 {
            channels.push(NoiseChannel::BitFlip { p: self.bit_flip });
        }
        if self.phase_flip > 0.0 {
            channels.push(NoiseChannel::PhaseFlip { p: self.phase_flip });
        }
        if self.amplitude_damping > 0.0 {
            channels.push(NoiseChannel::AmplitudeDamping {
                gamma: self.amplitude_damping,
            });
        }
        if self.phase_damping > 0.0 {
            channels.push(NoiseChannel::PhaseDamping {
                gamma: self.phase_damping,
            });
        }
        if self.depolarizing > 0.0 {
            channels.push(NoiseChannel::Depolarizing {
                p: self.depolarizing,
            });
        }
        if let Some(t) = self.thermal_relaxation.filter(|t| t.t_factor > 0.0) {
            channels.push(NoiseChannel::ThermalRelaxation {
                t_factor: t.t_factor,
                f_factor: t.f_factor,
            });
        }
        channels
    }
}

impl Mul<f64> for NoiseConfig {
    type Output = NoiseConfig;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

/// Inverse of `*`. Scalar rates and the thermal `t_factor` are divided;
/// `f_factor` is a T2 ratio and stays fixed.
impl Div<f64> for NoiseConfig {
    type Output = NoiseConfig;

    fn div(self, rhs: f64) -> Self::Output {
        self.scale(1.0 / rhs)
    }
}

impl TryFrom<BTreeMap<String, NoiseValue>> for NoiseConfig {
    type Error = QfmError;

    fn try_from(map: BTreeMap<String, NoiseValue>) -> Result<Self, Self::Error> {
        let mut config = NoiseConfig::default();
        for (key, value) in map {
            let kind: NoiseKind = key.parse()?;
            match (kind, value) {
                (NoiseKind::ThermalRelaxation, NoiseValue::Thermal(t)) => {
                    config.thermal_relaxation = Some(t);
                }
                // A bare zero disables thermal relaxation.
                (NoiseKind::ThermalRelaxation, NoiseValue::Rate(r)) if r == 0.0 => {}
                (NoiseKind::ThermalRelaxation, NoiseValue::Rate(r)) => {
                    return Err(QfmError::InvalidNoiseRate {
                        kind: key,
                        value: r,
                        reason: "expects {t_factor, f_factor}".into(),
                    });
                }
                (_, NoiseValue::Rate(r)) => *config.slot_mut(kind) = r,
                (_, NoiseValue::Thermal(_)) => {
                    return Err(QfmError::InvalidNoiseRate {
                        kind: key,
                        value: f64::NAN,
                        reason: "expects a scalar rate".into(),
                    });
                }
            }
        }
        config.validate()?;
        Ok(config)
    }
}

impl From<NoiseConfig> for BTreeMap<String, NoiseValue> {
    fn from(config: NoiseConfig) -> Self {
        let mut map = BTreeMap::new();
        for kind in config.active_kinds() {
            let value = match (kind, config.thermal_relaxation) {
                (NoiseKind::ThermalRelaxation, Some(t)) => NoiseValue::Thermal(t),
                _ => NoiseValue::Rate(config.rate(kind)),
            };
            map.insert(kind.name().to_string(), value);
        }
        map
    }
}
