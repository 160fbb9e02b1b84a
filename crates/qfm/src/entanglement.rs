//! Entangling capability.
//!
//! The sampling driver ([`EntanglementEstimator`]) is shared; the scalar
//! reduction of one executed state is an [`EntanglementMeasure`].

use std::fmt;
use std::str::FromStr;

use qfm_sim::DensityMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{QfmError, QfmResult};
use crate::model::{Execution, Model, OutputMode};
use crate::noise::{NoiseConfig, NoiseScope};

/// Reduces one executed state to an entanglement value.
pub trait EntanglementMeasure {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Entanglement of `rho`.
    fn evaluate(&self, rho: &DensityMatrix) -> QfmResult<f64>;
}

/// Meyer-Wallach measure `2 (1 - mean_j Tr ρ_j²)`.
#[derive(Debug, Clone, Default)]
pub struct MeyerWallach {
    order: Option<Vec<usize>>,
}

impl MeyerWallach {
    /// Visit qubits in natural order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit qubits in the given order. Must be a permutation of the register.
    pub fn with_order(order: Vec<usize>) -> Self {
        Self { order: Some(order) }
    }

    fn mean_purity(&self, rho: &DensityMatrix) -> QfmResult<f64> {
        let n = rho.num_qubits();
        let order: Vec<usize> = match &self.order {
            Some(order) => {
                let mut sorted = order.clone();
                sorted.sort_unstable();
                if sorted != (0..n).collect::<Vec<_>>() {
                    return Err(QfmError::InvalidArgument(format!(
                        "qubit order {order:?} is not a permutation of 0..{n}"
                    )));
                }
                order.clone()
            }
            None => (0..n).collect(),
        };
        let mut total = 0.0;
        for q in order {
            total += rho.reduced(q)?.purity();
        }
        Ok(total / n as f64)
    }
}

impl EntanglementMeasure for MeyerWallach {
    fn name(&self) -> &'static str {
        "meyer_wallach"
    }

    fn evaluate(&self, rho: &DensityMatrix) -> QfmResult<f64> {
        Ok(2.0 * (1.0 - self.mean_purity(rho)?))
    }
}

/// Relative entropy of entanglement against the product of marginals:
/// `Σ_j S(ρ_j) - S(ρ)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeEntropy;

impl EntanglementMeasure for RelativeEntropy {
    fn name(&self) -> &'static str {
        "relative_entropy"
    }

    fn evaluate(&self, rho: &DensityMatrix) -> QfmResult<f64> {
        let mut marginals = 0.0;
        for q in 0..rho.num_qubits() {
            marginals += rho.reduced(q)?.von_neumann_entropy();
        }
        Ok(marginals - rho.von_neumann_entropy())
    }
}

/// Entanglement of formation, approximated by the eigen-decomposition
/// `Σ p_i MW(ψ_i)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntanglementOfFormation;

impl EntanglementMeasure for EntanglementOfFormation {
    fn name(&self) -> &'static str {
        "entanglement_of_formation"
    }

    fn evaluate(&self, rho: &DensityMatrix) -> QfmResult<f64> {
        let (values, vectors) = rho.eigen();
        let mw = MeyerWallach::new();
        let mut total = 0.0;
        for (i, &p) in values.iter().enumerate() {
            if p <= 1e-12 {
                continue;
            }
            let psi: Vec<_> = vectors.column(i).to_vec();
            let pure = DensityMatrix::from_statevector(&psi)?;
            total += p * mw.evaluate(&pure)?;
        }
        Ok(total)
    }
}

/// Named measure selection for configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntanglementKind {
    /// Meyer-Wallach.
    #[default]
    #[serde(rename = "MW")]
    MeyerWallach,
    /// Relative entropy.
    #[serde(rename = "RE")]
    RelativeEntropy,
    /// Entanglement of formation.
    #[serde(rename = "EF")]
    EntanglementOfFormation,
}

impl EntanglementKind {
    /// Boxed measure for this kind.
    pub fn measure(&self) -> Box<dyn EntanglementMeasure> {
        match self {
            EntanglementKind::MeyerWallach => Box::new(MeyerWallach::new()),
            EntanglementKind::RelativeEntropy => Box::new(RelativeEntropy),
            EntanglementKind::EntanglementOfFormation => Box::new(EntanglementOfFormation),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            EntanglementKind::MeyerWallach => "MW",
            EntanglementKind::RelativeEntropy => "RE",
            EntanglementKind::EntanglementOfFormation => "EF",
        }
    }
}

impl fmt::Display for EntanglementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for EntanglementKind {
    type Err = QfmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MW" => Ok(EntanglementKind::MeyerWallach),
            "RE" => Ok(EntanglementKind::RelativeEntropy),
            "EF" => Ok(EntanglementKind::EntanglementOfFormation),
            other => Err(QfmError::InvalidArgument(format!(
                "unknown entanglement measure '{other}' (available: MW, RE, EF)"
            ))),
        }
    }
}

/// Sampling options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntanglementOptions {
    /// Random parameter draws; 0 evaluates the model's own parameters once.
    pub n_samples: usize,
    /// Seed for the parameter draws.
    pub seed: u64,
    /// Multiply `n_samples` by `2^n`.
    pub scale: bool,
    /// Sub-parts of the circuit that receive noise; `None` uses the model's.
    pub scope: Option<NoiseScope>,
}

impl Default for EntanglementOptions {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            seed: 1000,
            scale: false,
            scope: None,
        }
    }
}

/// Sampling driver for entangling capability.
pub struct EntanglementEstimator {
    measure: Box<dyn EntanglementMeasure>,
}

impl fmt::Debug for EntanglementEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntanglementEstimator")
            .field("measure", &self.measure.name())
            .finish()
    }
}

impl Default for EntanglementEstimator {
    fn default() -> Self {
        Self::meyer_wallach()
    }
}

impl EntanglementEstimator {
    /// Estimator with a custom measure.
    pub fn new(measure: Box<dyn EntanglementMeasure>) -> Self {
        Self { measure }
    }

    /// Meyer-Wallach estimator.
    pub fn meyer_wallach() -> Self {
        Self::new(Box::new(MeyerWallach::new()))
    }

    /// Estimator for a named measure.
    pub fn from_kind(kind: EntanglementKind) -> Self {
        Self::new(kind.measure())
    }

    /// Average the measure over random parameter draws, clamped at zero.
    ///
    /// States are evaluated in density mode at input `0`. The model's own
    /// parameters are never modified.
    pub fn estimate(
        &self,
        model: &Model,
        options: &EntanglementOptions,
        noise: Option<&NoiseConfig>,
    ) -> QfmResult<f64> {
        let n_samples = if options.scale {
            options.n_samples * (1 << model.n_qubits())
        } else {
            options.n_samples
        };
        let zeros = ndarray::Array2::zeros((1, model.n_features()));
        let base = Execution::new(zeros.view())
            .maybe_noise(noise)
            .maybe_scope(options.scope)
            .mode(OutputMode::Density);

        let value = if n_samples == 0 {
            self.evaluate_one(model, &base)?
        } else {
            let mut rng = StdRng::seed_from_u64(options.seed);
            let mut total = 0.0;
            for _ in 0..n_samples {
                let params = model.random_params(&mut rng);
                total += self.evaluate_one(model, &base.with_params(params.view()))?;
            }
            total / n_samples as f64
        };

        if value < 0.0 {
            warn!(
                measure = self.measure.name(),
                value, "negative entanglement from rounding, clamping to zero"
            );
        }
        debug!(measure = self.measure.name(), n_samples, value, "entanglement estimated");
        Ok(value.max(0.0))
    }

    fn evaluate_one(&self, model: &Model, exec: &Execution<'_>) -> QfmResult<f64> {
        let states = model.execute(exec)?.into_densities()?;
        let rho = states.first().ok_or_else(|| {
            QfmError::DataUnavailable("density execution returned no state".into())
        })?;
        self.measure.evaluate(rho)
    }
}
