//! Expressibility against the Haar-random state distribution.
//!
//! The fidelity distribution of random state pairs produced by the model
//! is histogrammed and compared with the closed-form Haar distribution
//! `P(F) = (N - 1)(1 - F)^{N-2}`, `N = 2^n`, by KL divergence. Lower
//! divergence means a more expressive circuit.

use ndarray::{Array1, Array2, array};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QfmError, QfmResult};
use crate::model::{Execution, Model, OutputMode};
use crate::noise::{NoiseConfig, NoiseScope};

/// Sampling options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressibilityOptions {
    /// Random parameter pairs per input.
    pub n_samples: usize,
    /// Input points in `input_domain`; 0 evaluates at `x = 0` only.
    pub n_input_samples: usize,
    /// Closed input interval.
    pub input_domain: (f64, f64),
    /// Histogram bins over `[0, 1]`.
    pub n_bins: usize,
    /// Seed for the parameter draws.
    pub seed: u64,
    /// Multiply `n_samples` by `2^n` and `n_bins` by `n`.
    pub scale: bool,
    /// Sub-parts of the circuit that receive noise; `None` uses the model's.
    pub scope: Option<NoiseScope>,
}

impl Default for ExpressibilityOptions {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            n_input_samples: 0,
            input_domain: (0.0, std::f64::consts::TAU),
            n_bins: 75,
            seed: 1000,
            scale: false,
            scope: None,
        }
    }
}

impl ExpressibilityOptions {
    /// Sample and bin counts after scaling for an `n_qubits` model.
    pub fn effective(&self, n_qubits: usize) -> (usize, usize) {
        if self.scale {
            (self.n_samples * (1 << n_qubits), self.n_bins * n_qubits)
        } else {
            (self.n_samples, self.n_bins)
        }
    }
}

/// Histogrammed fidelities, one row per input point.
#[derive(Debug, Clone, PartialEq)]
pub struct FidelityDistribution {
    /// Input points.
    pub x: Array1<f64>,
    /// Bin centers.
    pub bins: Array1<f64>,
    /// Normalized bin frequencies, shape `(n_inputs, n_bins)`.
    pub histograms: Array2<f64>,
}

/// Sampling driver for expressibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressibilityEstimator;

impl ExpressibilityEstimator {
    /// Fidelity histograms of random parameter pairs.
    pub fn state_fidelities(
        model: &Model,
        options: &ExpressibilityOptions,
        noise: Option<&NoiseConfig>,
    ) -> QfmResult<FidelityDistribution> {
        if model.n_features() != 1 {
            return Err(QfmError::InvalidArgument(
                "expressibility is defined for single-feature models".into(),
            ));
        }
        let (n_samples, n_bins) = options.effective(model.n_qubits());
        if n_samples == 0 || n_bins == 0 {
            return Err(QfmError::InvalidArgument(
                "expressibility needs at least one sample and one bin".into(),
            ));
        }

        let x = if options.n_input_samples > 0 {
            let (lo, hi) = options.input_domain;
            Array1::linspace(lo, hi, options.n_input_samples)
        } else {
            array![0.0]
        };

        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut histograms = Array2::zeros((x.len(), n_bins));
        for _ in 0..n_samples {
            let p1 = model.random_params(&mut rng);
            let p2 = model.random_params(&mut rng);
            let a = model
                .execute(
                    &Execution::single_feature(x.view())
                        .params(p1.view())
                        .maybe_noise(noise)
                        .maybe_scope(options.scope)
                        .mode(OutputMode::Density),
                )?
                .into_densities()?;
            let b = model
                .execute(
                    &Execution::single_feature(x.view())
                        .params(p2.view())
                        .maybe_noise(noise)
                        .maybe_scope(options.scope)
                        .mode(OutputMode::Density),
                )?
                .into_densities()?;
            for (i, (rho, sigma)) in a.iter().zip(b.iter()).enumerate() {
                let f = rho.fidelity(sigma)?;
                histograms[[i, bin_index(f, n_bins)]] += 1.0;
            }
        }
        histograms /= n_samples as f64;

        debug!(n_samples, n_bins, n_inputs = x.len(), "fidelity histograms sampled");
        Ok(FidelityDistribution {
            x,
            bins: bin_centers(n_bins),
            histograms,
        })
    }

    /// KL divergence of every input's histogram from the Haar distribution.
    pub fn expressibility(
        model: &Model,
        options: &ExpressibilityOptions,
        noise: Option<&NoiseConfig>,
    ) -> QfmResult<Array1<f64>> {
        let dist = Self::state_fidelities(model, options, noise)?;
        let (_, n_bins) = options.effective(model.n_qubits());
        let haar = haar_integral(model.n_qubits(), n_bins).1.to_vec();
        dist.histograms
            .rows()
            .into_iter()
            .map(|row| kl_divergence(&row.to_vec(), &haar))
            .collect::<QfmResult<Vec<f64>>>()
            .map(Array1::from)
    }
}

/// Bin of a fidelity in `[0, 1]`; `1.0` lands in the last bin.
fn bin_index(f: f64, n_bins: usize) -> usize {
    ((f * n_bins as f64) as usize).min(n_bins - 1)
}

fn bin_centers(n_bins: usize) -> Array1<f64> {
    let width = 1.0 / n_bins as f64;
    Array1::from_shape_fn(n_bins, |i| (i as f64 + 0.5) * width)
}

/// Haar-random fidelity distribution binned over `[0, 1]`.
///
/// Returns bin centers and the probability mass of each bin,
/// `(1 - a)^{N-1} - (1 - b)^{N-1}` for bin `[a, b]`.
pub fn haar_integral(n_qubits: usize, n_bins: usize) -> (Array1<f64>, Array1<f64>) {
    let dim = (1u64 << n_qubits) as f64;
    let width = 1.0 / n_bins as f64;
    let mass = Array1::from_shape_fn(n_bins, |i| {
        let a = i as f64 * width;
        let b = (i + 1) as f64 * width;
        (1.0 - a).powf(dim - 1.0) - (1.0 - b).powf(dim - 1.0)
    });
    (bin_centers(n_bins), mass)
}

/// `Σ p ln(p / q)` over bins with `p > 0`.
///
/// Empty bins of `p` contribute nothing. A bin with `p > 0` and `q = 0`
/// makes the divergence infinite.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> QfmResult<f64> {
    if p.len() != q.len() {
        return Err(QfmError::InvalidShape {
            what: "histogram",
            expected: format!("{} bins", q.len()),
            got: format!("{} bins", p.len()),
        });
    }
    Ok(p.iter()
        .zip(q)
        .filter(|(pi, _)| **pi > 0.0)
        .map(|(&pi, &qi)| {
            if qi > 0.0 {
                pi * (pi / qi).ln()
            } else {
                f64::INFINITY
            }
        })
        .sum())
}
