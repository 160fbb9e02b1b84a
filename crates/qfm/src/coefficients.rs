//! Fourier spectrum extraction and coefficient statistics.
//!
//! The model output `f(x)` of a re-uploading circuit is a truncated Fourier
//! series `Σ c_ω e^{iωx}` with `|ω| ≤ D`. Sampling `f` on an equidistant
//! grid over one period and applying a discrete Fourier transform
//! recovers every `c_ω` exactly as long as the grid has at least `2D + 1`
//! points per axis.

use std::f64::consts::TAU;

use ndarray::{Array1, Array2, ArrayD, Axis, Dimension, IxDyn};
use num_complex::Complex64;
use rand::Rng;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QfmError, QfmResult};
use crate::model::{Execution, Model};
use crate::noise::{NoiseConfig, NoiseScope};

/// Options for [`Spectrum::extract`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumOptions {
    /// Grid points per axis as a multiple of `2D + 1`.
    pub oversampling: f64,
    /// Order coefficients by ascending frequency (zero in the middle).
    pub shift: bool,
    /// Drop frequencies above the model degree.
    pub trim: bool,
    /// Sub-parts of the circuit that receive noise; `None` uses the model's.
    pub scope: Option<NoiseScope>,
}

impl Default for SpectrumOptions {
    fn default() -> Self {
        Self {
            oversampling: 1.0,
            shift: true,
            trim: true,
            scope: None,
        }
    }
}

/// Fourier coefficients of a model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// One axis per input feature.
    pub coefficients: ArrayD<Complex64>,
    /// Frequency of each index along every axis.
    pub frequencies: Array1<i64>,
}

/// Frequency of DFT bin `m` for an `n`-point transform.
fn bin_frequency(m: usize, n: usize) -> i64 {
    if m < n.div_ceil(2) {
        m as i64
    } else {
        m as i64 - n as i64
    }
}

impl Spectrum {
    /// Sample the model over one period and transform.
    ///
    /// A zero-degree model yields the sample mean at frequency 0.
    pub fn extract(
        model: &Model,
        options: &SpectrumOptions,
        noise: Option<&NoiseConfig>,
    ) -> QfmResult<Spectrum> {
        if !(options.oversampling > 0.0) {
            return Err(QfmError::InvalidArgument(format!(
                "oversampling must be positive, got {}",
                options.oversampling
            )));
        }
        let degree = model.degree();
        let n_features = model.n_features();
        let n = ((options.oversampling * (2 * degree + 1) as f64).round() as usize).max(1);

        let axis: Vec<f64> = (0..n).map(|k| TAU * k as f64 / n as f64).collect();
        let total = n.pow(n_features as u32);
        let inputs = Array2::from_shape_fn((total, n_features), |(row, f)| {
            // Row-major multi-index: feature 0 varies slowest.
            let stride = n.pow((n_features - 1 - f) as u32);
            axis[(row / stride) % n]
        });

        let values = model
            .execute(
                &Execution::new(inputs.view())
                    .maybe_noise(noise)
                    .maybe_scope(options.scope),
            )?
            .into_expectation()?;

        if degree == 0 {
            let mean = values.mean().unwrap_or(0.0);
            let shape = vec![1; n_features];
            return Ok(Spectrum {
                coefficients: ArrayD::from_elem(IxDyn(&shape), Complex64::new(mean, 0.0)),
                frequencies: Array1::from(vec![0]),
            });
        }

        let shape = vec![n; n_features];
        let mut grid = ArrayD::from_shape_vec(
            IxDyn(&shape),
            values.iter().map(|&v| Complex64::new(v, 0.0)).collect(),
        )
        .map_err(|e| QfmError::InvalidShape {
            what: "sample grid",
            expected: format!("{shape:?}"),
            got: e.to_string(),
        })?;

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let norm = 1.0 / n as f64;
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        for ax in 0..n_features {
            for mut lane in grid.lanes_mut(Axis(ax)) {
                for (b, v) in buffer.iter_mut().zip(lane.iter()) {
                    *b = *v;
                }
                fft.process(&mut buffer);
                for (v, b) in lane.iter_mut().zip(buffer.iter()) {
                    *v = *b * norm;
                }
            }
        }

        let mut selection: Vec<usize> = (0..n).collect();
        if options.shift {
            selection.sort_by_key(|&m| bin_frequency(m, n));
        }
        if options.trim {
            selection.retain(|&m| bin_frequency(m, n).unsigned_abs() as usize <= degree);
        }
        let mut coefficients = grid;
        for ax in 0..n_features {
            coefficients = coefficients.select(Axis(ax), &selection);
        }
        let frequencies = selection.iter().map(|&m| bin_frequency(m, n)).collect();

        debug!(degree, grid_points = n, kept = selection.len(), "spectrum extracted");
        Ok(Spectrum {
            coefficients,
            frequencies,
        })
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.coefficients.ndim()
    }

    /// Reconstruct `f(x)` by inverse Fourier synthesis.
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.coefficients
            .indexed_iter()
            .map(|(idx, c)| {
                let phase: f64 = (0..idx.ndim())
                    .map(|ax| self.frequencies[idx[ax]] as f64 * x.get(ax).copied().unwrap_or(0.0))
                    .sum();
                (c * Complex64::from_polar(1.0, phase)).re
            })
            .sum()
    }

    /// Per-axis frequency meshgrid (matrix indexing).
    pub fn frequency_grid(&self) -> Vec<ArrayD<i64>> {
        let shape = self.coefficients.raw_dim();
        (0..self.n_features())
            .map(|ax| ArrayD::from_shape_fn(shape.clone(), |idx| self.frequencies[idx[ax]]))
            .collect()
    }
}

/// Draw `n_samples` random parameter sets and extract a spectrum for each.
///
/// Each sample re-initializes the model from `rng`; the model's previous
/// parameters are restored afterwards.
pub fn sample_spectra<R: Rng>(
    model: &mut Model,
    n_samples: usize,
    rng: &mut R,
    options: &SpectrumOptions,
    noise: Option<&NoiseConfig>,
) -> QfmResult<Vec<Spectrum>> {
    let saved = model.params().clone();
    let mut spectra = Vec::with_capacity(n_samples);
    let mut result = Ok(());
    for _ in 0..n_samples {
        model.initialize(rng);
        match Spectrum::extract(model, options, noise) {
            Ok(spectrum) => spectra.push(spectrum),
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    model.set_params(saved)?;
    result.map(|()| spectra)
}

/// Empirical moments of Fourier coefficients across samples.
///
/// Every field with a frequency axis has one row per kept coefficient.
/// Variances are population variances over the sample axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientStatistics {
    /// Kept frequencies, shape `(K, n_features)`.
    pub frequencies: Array2<i64>,
    /// Mean of `|c|`.
    pub abs_mean: Array1<f64>,
    /// Variance of `|c|`.
    pub abs_var: Array1<f64>,
    /// Mean of `Re c`.
    pub real_mean: Array1<f64>,
    /// Variance of `Re c`.
    pub real_var: Array1<f64>,
    /// Mean of `Im c`.
    pub imag_mean: Array1<f64>,
    /// Variance of `Im c`.
    pub imag_var: Array1<f64>,
    /// Complex variance `E|c - E c|²`.
    pub var: Array1<f64>,
    /// Covariance of `Re c` and `Im c`.
    pub co_var_real_imag: Array1<f64>,
    /// Raw real parts, shape `(K, n_samples)`.
    pub full_real: Array2<f64>,
    /// Raw imaginary parts, shape `(K, n_samples)`.
    pub full_imag: Array2<f64>,
}

impl CoefficientStatistics {
    /// Reduce a batch of spectra.
    ///
    /// Single-feature spectra are reduced to their non-negative half
    /// (`0..=D`, or `1..=D` without `zero_coefficient`); the negative half
    /// is its complex conjugate.
    pub fn from_spectra(spectra: &[Spectrum], zero_coefficient: bool) -> QfmResult<Self> {
        let Some(first) = spectra.first() else {
            return Err(QfmError::DataUnavailable(
                "no spectra to compute coefficient statistics from".into(),
            ));
        };
        let n_features = first.n_features();
        let shape = first.coefficients.shape().to_vec();

        // Flat indices into the coefficient tensor, with their frequencies.
        let mut kept: Vec<(usize, Vec<i64>)> = Vec::new();
        let grid = first.frequency_grid();
        for (flat, idx) in first.coefficients.indexed_iter().map(|(i, _)| i).enumerate() {
            let freqs: Vec<i64> = (0..n_features).map(|ax| grid[ax][idx.slice()]).collect();
            let keep = if n_features == 1 {
                freqs[0] > 0 || (zero_coefficient && freqs[0] == 0)
            } else {
                true
            };
            if keep {
                kept.push((flat, freqs));
            }
        }
        if n_features == 1 {
            kept.sort_by_key(|(_, f)| f[0]);
        }

        let k = kept.len();
        let s = spectra.len();
        let mut full_real = Array2::zeros((k, s));
        let mut full_imag = Array2::zeros((k, s));
        for (j, spectrum) in spectra.iter().enumerate() {
            if spectrum.coefficients.shape() != shape.as_slice() {
                return Err(QfmError::InvalidShape {
                    what: "spectrum",
                    expected: format!("{shape:?}"),
                    got: format!("{:?}", spectrum.coefficients.shape()),
                });
            }
            let flat: Vec<Complex64> = spectrum.coefficients.iter().copied().collect();
            for (i, (idx, _)) in kept.iter().enumerate() {
                full_real[[i, j]] = flat[*idx].re;
                full_imag[[i, j]] = flat[*idx].im;
            }
        }

        let abs = Array2::from_shape_fn((k, s), |(i, j)| {
            full_real[[i, j]].hypot(full_imag[[i, j]])
        });
        let real_mean = row_mean(&full_real);
        let imag_mean = row_mean(&full_imag);
        let real_var = row_var(&full_real, &real_mean);
        let imag_var = row_var(&full_imag, &imag_mean);
        let abs_mean = row_mean(&abs);
        let abs_var = row_var(&abs, &abs_mean);
        let co_var_real_imag = Array1::from_shape_fn(k, |i| {
            (0..s)
                .map(|j| (full_real[[i, j]] - real_mean[i]) * (full_imag[[i, j]] - imag_mean[i]))
                .sum::<f64>()
                / s as f64
        });

        let mut frequencies = Array2::zeros((k, n_features));
        for (i, (_, freqs)) in kept.iter().enumerate() {
            for (ax, &f) in freqs.iter().enumerate() {
                frequencies[[i, ax]] = f;
            }
        }

        Ok(Self {
            frequencies,
            abs_mean,
            abs_var,
            var: &real_var + &imag_var,
            real_mean,
            real_var,
            imag_mean,
            imag_var,
            co_var_real_imag,
            full_real,
            full_imag,
        })
    }

    /// Number of kept coefficients.
    pub fn len(&self) -> usize {
        self.abs_mean.len()
    }

    /// Whether no coefficient was kept.
    pub fn is_empty(&self) -> bool {
        self.abs_mean.is_empty()
    }
}

fn row_mean(data: &Array2<f64>) -> Array1<f64> {
    data.mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::zeros(data.nrows()))
}

fn row_var(data: &Array2<f64>, mean: &Array1<f64>) -> Array1<f64> {
    let s = data.ncols().max(1) as f64;
    Array1::from_shape_fn(data.nrows(), |i| {
        data.row(i).iter().map(|v| (v - mean[i]).powi(2)).sum::<f64>() / s
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Ix1;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::model::{EncodingGate, ModelConfig};

    fn model(n_qubits: usize, n_layers: usize) -> Model {
        Model::new(ModelConfig {
            n_qubits,
            n_layers,
            ansatz: "Circuit_19".into(),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_bin_frequency() {
        let freqs: Vec<i64> = (0..5).map(|m| bin_frequency(m, 5)).collect();
        assert_eq!(freqs, vec![0, 1, 2, -2, -1]);
        let freqs: Vec<i64> = (0..4).map(|m| bin_frequency(m, 4)).collect();
        assert_eq!(freqs, vec![0, 1, -2, -1]);
    }

    #[test]
    fn test_shifted_frequencies_are_symmetric() {
        let model = model(2, 1);
        let spectrum = Spectrum::extract(&model, &SpectrumOptions::default(), None).unwrap();
        assert_eq!(spectrum.frequencies.to_vec(), vec![-2, -1, 0, 1, 2]);
        // A real signal has a Hermitian spectrum.
        let c = spectrum.coefficients.clone().into_dimensionality::<Ix1>().unwrap();
        for i in 0..5 {
            let mirrored = c[[4 - i]].conj();
            assert_abs_diff_eq!(c[[i]].re, mirrored.re, epsilon = 1e-10);
            assert_abs_diff_eq!(c[[i]].im, mirrored.im, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_oversampled_spectrum_trims_to_degree() {
        let model = model(2, 1);
        let options = SpectrumOptions {
            oversampling: 3.0,
            ..SpectrumOptions::default()
        };
        let spectrum = Spectrum::extract(&model, &options, None).unwrap();
        assert_eq!(spectrum.frequencies.len(), 5);

        let untrimmed = Spectrum::extract(
            &model,
            &SpectrumOptions {
                trim: false,
                ..options
            },
            None,
        )
        .unwrap();
        assert_eq!(untrimmed.frequencies.len(), 15);
    }

    #[test]
    fn test_two_feature_spectrum() {
        let model = Model::new(ModelConfig {
            n_qubits: 1,
            n_layers: 1,
            ansatz: "Circuit_1".into(),
            encoding: vec![EncodingGate::RX, EncodingGate::RY],
            ..ModelConfig::default()
        })
        .unwrap();
        let spectrum = Spectrum::extract(&model, &SpectrumOptions::default(), None).unwrap();
        assert_eq!(spectrum.coefficients.shape(), &[3, 3]);
        let x = [0.37, 1.9];
        let direct = model
            .execute(&Execution::new(ndarray::array![[x[0], x[1]]].view()))
            .unwrap()
            .into_expectation()
            .unwrap();
        assert_abs_diff_eq!(spectrum.evaluate(&x), direct[0], epsilon = 1e-8);
        assert_eq!(spectrum.frequency_grid()[1][&[0, 2][..]], 1);
    }

    #[test]
    fn test_statistics_half_spectrum() {
        let mut model = model(2, 1);
        let mut rng = StdRng::seed_from_u64(7);
        let spectra =
            sample_spectra(&mut model, 4, &mut rng, &SpectrumOptions::default(), None).unwrap();
        let stats = CoefficientStatistics::from_spectra(&spectra, true).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats.frequencies.column(0).to_vec(), vec![0, 1, 2]);
        assert_eq!(stats.full_real.dim(), (3, 4));

        let no_zero = CoefficientStatistics::from_spectra(&spectra, false).unwrap();
        assert_eq!(no_zero.len(), 2);
        for i in 0..3 {
            assert_abs_diff_eq!(
                stats.var[i],
                stats.real_var[i] + stats.imag_var[i],
                epsilon = 1e-15
            );
            assert!(stats.abs_var[i] >= 0.0);
        }
    }

    #[test]
    fn test_sampling_restores_params() {
        let mut model = model(2, 1);
        let before = model.params().clone();
        let mut rng = StdRng::seed_from_u64(1);
        sample_spectra(&mut model, 2, &mut rng, &SpectrumOptions::default(), None).unwrap();
        assert_eq!(model.params(), &before);
    }

    #[test]
    fn test_empty_statistics_is_data_unavailable() {
        let err = CoefficientStatistics::from_spectra(&[], true).unwrap_err();
        assert!(err.is_data_unavailable());
    }
}
