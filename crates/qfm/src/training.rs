//! Fitting a model to a target series with Adam.
//!
//! Every step records the mean-squared error together with snapshots of
//! the model's entanglement, its Fourier coefficients and the mean
//! controlled-rotation angle, so the trajectory of these quantities can be
//! inspected alongside the loss.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coefficients::{CoefficientStatistics, Spectrum, SpectrumOptions};
use crate::entanglement::{EntanglementEstimator, EntanglementKind, EntanglementOptions};
use crate::error::{QfmError, QfmResult};
use crate::model::{Execution, Model};
use crate::noise::{NoiseConfig, NoiseScope};

/// Loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    /// Upper bound on optimizer steps.
    pub steps: usize,
    pub learning_rate: f64,
    /// Stop once the loss falls below this value.
    pub convergence_threshold: f64,
    /// Stop once the mean loss slope over the last `convergence_steps`
    /// steps is smaller than this in magnitude.
    pub convergence_gradient: f64,
    /// Window of the slope criterion; 0 disables it.
    pub convergence_steps: usize,
    /// Measure recorded at every step.
    pub entanglement: EntanglementKind,
    /// Sub-parts of the circuit that receive noise; `None` uses the model's.
    pub scope: Option<NoiseScope>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            steps: 1000,
            learning_rate: 0.01,
            convergence_threshold: 1e-6,
            convergence_gradient: 1e-6,
            convergence_steps: 10,
            entanglement: EntanglementKind::EntanglementOfFormation,
            scope: None,
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxSteps,
    Threshold,
    Plateau,
}

/// Snapshot taken at one optimizer step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingStep {
    pub step: usize,
    /// Loss before the update.
    pub mse: f64,
    /// Entanglement of the pre-update parameters.
    pub entanglement: f64,
    /// Kept frequencies, one row per coefficient.
    pub frequencies: Vec<Vec<i64>>,
    pub coeffs_real: Vec<f64>,
    pub coeffs_imag: Vec<f64>,
    /// Mean controlled-rotation angle after the update.
    pub control_rotation_mean: Option<f64>,
}

/// Complete optimization trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub steps: Vec<TrainingStep>,
    pub stop_reason: StopReason,
    pub final_mse: f64,
}

/// Adam with first- and second-moment bias correction.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    m: Array2<f64>,
    v: Array2<f64>,
    t: i32,
}

impl Adam {
    pub fn new(learning_rate: f64, shape: (usize, usize)) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.99,
            eps: 1e-8,
            m: Array2::zeros(shape),
            v: Array2::zeros(shape),
            t: 0,
        }
    }

    /// Apply one update to `params` in place.
    pub fn step(&mut self, params: &mut Array2<f64>, grad: &Array2<f64>) -> QfmResult<()> {
        if params.dim() != self.m.dim() || grad.dim() != self.m.dim() {
            return Err(QfmError::InvalidShape {
                what: "gradient",
                expected: format!("{:?}", self.m.dim()),
                got: format!("{:?}", grad.dim()),
            });
        }
        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        self.m.zip_mut_with(grad, |m, &g| *m = b1 * *m + (1.0 - b1) * g);
        self.v.zip_mut_with(grad, |v, &g| *v = b2 * *v + (1.0 - b2) * g * g);
        let lr = self.learning_rate * (1.0 - b2.powi(self.t)).sqrt() / (1.0 - b1.powi(self.t));
        ndarray::Zip::from(params)
            .and(&self.m)
            .and(&self.v)
            .for_each(|p, &m, &v| *p -= lr * m / (v.sqrt() + self.eps));
        Ok(())
    }
}

/// Compare the model's frequency reach with the target's and log the
/// outcome. Only single-layer or single-qubit models are checked.
pub fn validate_problem(model: &Model, target_omega: usize) {
    if model.n_layers() != 1 && model.n_qubits() != 1 {
        warn!(
            n_qubits = model.n_qubits(),
            n_layers = model.n_layers(),
            "degree check is only available for single-layer or single-qubit models"
        );
        return;
    }
    let degree = model.degree();
    if degree < target_omega {
        warn!(degree, target_omega, "model cannot represent the target frequencies");
    } else if degree > target_omega {
        warn!(degree, target_omega, "model degree exceeds the target frequencies");
    } else {
        info!(degree, "model degree matches the target");
    }
}

/// Mean-squared error and its parameter gradient.
pub fn mse_and_gradient(
    model: &Model,
    x: ArrayView1<'_, f64>,
    target: ArrayView1<'_, f64>,
    noise: Option<&NoiseConfig>,
    scope: Option<NoiseScope>,
) -> QfmResult<(f64, Array2<f64>)> {
    if x.len() != target.len() {
        return Err(QfmError::InvalidShape {
            what: "target",
            expected: format!("{} values", x.len()),
            got: format!("{} values", target.len()),
        });
    }
    if x.is_empty() {
        return Err(QfmError::DataUnavailable("no training samples".into()));
    }
    let exec = Execution::single_feature(x.view()).maybe_noise(noise).maybe_scope(scope);
    let residual = model.execute(&exec)?.into_expectation()? - &target;
    let n = x.len() as f64;
    let mse = residual.mapv(|r| r * r).sum() / n;

    let jac = model.gradient(&exec)?;
    let weighted = &jac * &residual.insert_axis(Axis(1)).insert_axis(Axis(2));
    let grad = weighted.sum_axis(Axis(0)) * (2.0 / n);
    Ok((mse, grad))
}

/// Mean of the central-difference slope of `costs` over `[start, end)`.
fn mean_slope(costs: &[f64], start: usize, end: usize) -> f64 {
    let last = costs.len() - 1;
    let slope = |i: usize| {
        if i == 0 {
            costs[1] - costs[0]
        } else if i == last {
            costs[last] - costs[last - 1]
        } else {
            (costs[i + 1] - costs[i - 1]) / 2.0
        }
    };
    (start..end).map(slope).sum::<f64>() / (end - start) as f64
}

/// Train `model` on a single-feature target. `on_step` sees each record as
/// it is produced.
pub fn train(
    model: &mut Model,
    x: ArrayView1<'_, f64>,
    target: ArrayView1<'_, f64>,
    noise: Option<&NoiseConfig>,
    options: &TrainingOptions,
    on_step: &mut dyn FnMut(&TrainingStep),
) -> QfmResult<TrainingReport> {
    if model.n_features() != 1 {
        return Err(QfmError::InvalidArgument(
            "training expects a single-feature model".into(),
        ));
    }
    let estimator = EntanglementEstimator::from_kind(options.entanglement);
    let ent_options = EntanglementOptions {
        n_samples: 0,
        scope: options.scope,
        ..EntanglementOptions::default()
    };
    let spectrum_options = SpectrumOptions {
        scope: options.scope,
        ..SpectrumOptions::default()
    };

    let mut adam = Adam::new(options.learning_rate, model.params().dim());
    let mut costs = Vec::with_capacity(options.steps);
    let mut records = Vec::with_capacity(options.steps);
    let mut stop_reason = StopReason::MaxSteps;

    info!(model = %model, steps = options.steps, "training started");
    for step in 0..options.steps {
        let entanglement = estimator.estimate(model, &ent_options, noise)?;
        let spectrum = Spectrum::extract(model, &spectrum_options, noise)?;
        let coeffs = CoefficientStatistics::from_spectra(std::slice::from_ref(&spectrum), true)?;

        let (mse, grad) = mse_and_gradient(model, x, target, noise, options.scope)?;
        let mut params = model.params().clone();
        adam.step(&mut params, &grad)?;
        model.set_params(params)?;
        costs.push(mse);

        let record = TrainingStep {
            step,
            mse,
            entanglement,
            frequencies: coeffs.frequencies.rows().into_iter().map(|r| r.to_vec()).collect(),
            coeffs_real: coeffs.real_mean.to_vec(),
            coeffs_imag: coeffs.imag_mean.to_vec(),
            control_rotation_mean: model.control_rotation_mean(),
        };
        debug!(step, mse, entanglement, "training step");
        on_step(&record);
        records.push(record);

        if mse < options.convergence_threshold {
            stop_reason = StopReason::Threshold;
            break;
        }
        let window = options.convergence_steps;
        if window > 0 && step >= window && costs.len() > 1 {
            let slope = mean_slope(&costs, step - window, step);
            if slope.abs() < options.convergence_gradient {
                stop_reason = StopReason::Plateau;
                break;
            }
        }
    }

    let (final_mse, _) = mse_and_gradient(model, x, target, noise, options.scope)?;
    info!(?stop_reason, final_mse, steps = records.len(), "training finished");
    Ok(TrainingReport {
        steps: records,
        stop_reason,
        final_mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use crate::model::ModelConfig;
    use crate::target::{Amplitude, generate_fourier_series, sample_domain};

    fn model(ansatz: &str, n_qubits: usize) -> Model {
        Model::new(ModelConfig {
            n_qubits,
            n_layers: 1,
            ansatz: ansatz.into(),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        let mut adam = Adam::new(0.1, (1, 2));
        let mut params = array![[1.0, 1.0]];
        adam.step(&mut params, &array![[2.0, -0.5]]).unwrap();
        // First bias-corrected step has magnitude lr.
        assert_abs_diff_eq!(params[[0, 0]], 0.9, epsilon = 1e-6);
        assert_abs_diff_eq!(params[[0, 1]], 1.1, epsilon = 1e-6);
        assert!(adam.step(&mut params, &array![[1.0]]).is_err());
    }

    #[test]
    fn test_mse_gradient_matches_finite_difference() {
        let m = model("Hardware_Efficient", 2);
        let x = array![0.1, 0.7, 1.9];
        let y = array![0.2, -0.3, 0.5];
        let (_, grad) = mse_and_gradient(&m, x.view(), y.view(), None, None).unwrap();

        let h = 1e-5;
        let mut plus = m.clone();
        let mut p = m.params().clone();
        p[[0, 1]] += h;
        plus.set_params(p.clone()).unwrap();
        let mut minus = m.clone();
        p[[0, 1]] -= 2.0 * h;
        minus.set_params(p).unwrap();
        let f = |mm: &Model| mse_and_gradient(mm, x.view(), y.view(), None, None).unwrap().0;
        let fd = (f(&plus) - f(&minus)) / (2.0 * h);
        assert_abs_diff_eq!(grad[[0, 1]], fd, epsilon = 1e-6);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut m = model("Hardware_Efficient", 1);
        let x = sample_domain((-std::f64::consts::PI, std::f64::consts::PI), 1);
        let target = generate_fourier_series(&x, 1, Amplitude::Constant(0.5), 0).unwrap();
        let options = TrainingOptions {
            steps: 30,
            learning_rate: 0.1,
            convergence_steps: 0,
            ..TrainingOptions::default()
        };
        let mut seen = 0;
        let report = train(
            &mut m,
            x.view(),
            target.values.view(),
            None,
            &options,
            &mut |_| seen += 1,
        )
        .unwrap();
        assert_eq!(seen, report.steps.len());
        let first = report.steps[0].mse;
        assert!(report.final_mse < first);
        assert_eq!(report.steps[0].frequencies, vec![vec![0], vec![1]]);
        // Single qubit has no entanglement.
        assert!(report.steps.iter().all(|s| s.entanglement.abs() < 1e-9));
    }

    #[test]
    fn test_threshold_stops_early() {
        let mut m = model("Hardware_Efficient", 1);
        let x = array![0.0, 1.0];
        let y = array![0.0, 0.0];
        let options = TrainingOptions {
            steps: 5,
            convergence_threshold: f64::INFINITY,
            ..TrainingOptions::default()
        };
        let report = train(&mut m, x.view(), y.view(), None, &options, &mut |_| {}).unwrap();
        assert_eq!(report.stop_reason, StopReason::Threshold);
        assert_eq!(report.steps.len(), 1);
    }

    #[test]
    fn test_mean_slope_central_differences() {
        let costs = [4.0, 3.0, 2.0, 1.0];
        assert_abs_diff_eq!(mean_slope(&costs, 0, 3), -1.0);
        let flat = [1.0; 5];
        assert_eq!(mean_slope(&flat, 1, 4), 0.0);
    }
}
