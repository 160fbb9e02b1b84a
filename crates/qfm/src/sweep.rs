//! Linear noise sweeps.
//!
//! A sweep scales a target [`NoiseConfig`] by `step / steps` for
//! `step = 0..=steps` and records one [`SweepRow`] per level. Rows are
//! appended once and never modified. Any failing evaluation aborts the
//! whole sweep.

use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::info;

use crate::coefficients::{CoefficientStatistics, SpectrumOptions, sample_spectra};
use crate::entanglement::{EntanglementEstimator, EntanglementOptions};
use crate::error::{QfmError, QfmResult};
use crate::expressibility::{ExpressibilityEstimator, ExpressibilityOptions};
use crate::model::Model;
use crate::noise::NoiseConfig;

/// Noise levels from zero to `target` in `steps` equal increments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoiseSweep {
    target: NoiseConfig,
    steps: usize,
}

/// One level of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseLevel {
    /// Step index, `0..=steps`.
    pub step: usize,
    /// `step / steps`.
    pub level: f64,
    /// Target scaled by `level`.
    pub noise: NoiseConfig,
}

impl NoiseSweep {
    /// Sweep towards `target` in `steps ≥ 1` increments.
    pub fn new(target: NoiseConfig, steps: usize) -> QfmResult<Self> {
        if steps == 0 {
            return Err(QfmError::InvalidArgument(
                "a noise sweep needs at least one step".into(),
            ));
        }
        target.validate()?;
        Ok(Self { target, steps })
    }

    /// Full-strength noise.
    pub fn target(&self) -> &NoiseConfig {
        &self.target
    }

    /// Number of increments; the sweep has `steps + 1` levels.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// All levels, both ends included.
    pub fn levels(&self) -> impl Iterator<Item = NoiseLevel> + '_ {
        (0..=self.steps).map(move |step| {
            let level = step as f64 / self.steps as f64;
            NoiseLevel {
                step,
                level,
                noise: self.target.scale(level),
            }
        })
    }

    fn base_row(&self, level: &NoiseLevel) -> SweepRow {
        let mut row = SweepRow::new();
        row.insert("noise_level", SweepValue::Float(level.level));
        for kind in self.target.active_kinds() {
            row.insert(kind.name(), SweepValue::Float(level.noise.rate(kind)));
        }
        row
    }
}

/// A cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SweepValue {
    /// Scalar.
    Float(f64),
    /// Vector.
    Floats(Vec<f64>),
    /// Row-major matrix.
    Matrix(Vec<Vec<f64>>),
    /// Integer vector.
    Ints(Vec<i64>),
    /// Integer matrix.
    IntMatrix(Vec<Vec<i64>>),
}

impl SweepValue {
    /// The scalar, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SweepValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// The vector, if this is one.
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            SweepValue::Floats(v) => Some(v),
            _ => None,
        }
    }

    fn matrix(data: &Array2<f64>) -> Self {
        SweepValue::Matrix(data.rows().into_iter().map(|r| r.to_vec()).collect())
    }
}

/// Ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepRow {
    cells: Vec<(String, SweepValue)>,
}

impl SweepRow {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: SweepValue) {
        let name = name.into();
        match self.cells.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((name, value)),
        }
    }

    /// Look up a column.
    pub fn get(&self, name: &str) -> Option<&SweepValue> {
        self.cells.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for SweepRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Append-only table of sweep rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NoiseSweepResult {
    rows: Vec<SweepRow>,
}

impl NoiseSweepResult {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished row.
    pub fn push(&mut self, row: SweepRow) {
        self.rows.push(row);
    }

    /// All rows in step order.
    pub fn rows(&self) -> &[SweepRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row was written.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column across rows; rows without it are skipped.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SweepValue> + 'a {
        self.rows.iter().filter_map(move |r| r.get(name))
    }

    /// Pretty-printed JSON array of rows.
    pub fn to_json(&self) -> QfmResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Progress hook called after each finished row.
pub trait SweepObserver {
    /// Row `step` of `total` is done.
    fn on_step(&mut self, step: usize, total: usize, row: &SweepRow) {
        let _ = (step, total, row);
    }
}

impl SweepObserver for () {}

/// Options for [`coefficient_sweep`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoefficientSweepOptions {
    /// Random parameter draws per level.
    pub n_samples: usize,
    /// Seed of the parameter stream (shared by all levels).
    pub seed: u64,
    /// Keep the zero-frequency coefficient.
    pub zero_coefficient: bool,
    /// Spectrum extraction.
    pub spectrum: SpectrumOptions,
}

impl Default for CoefficientSweepOptions {
    fn default() -> Self {
        Self {
            n_samples: 100,
            seed: 1000,
            zero_coefficient: true,
            spectrum: SpectrumOptions::default(),
        }
    }
}

/// Coefficient statistics at every noise level.
pub fn coefficient_sweep(
    model: &mut Model,
    sweep: &NoiseSweep,
    options: &CoefficientSweepOptions,
    observer: &mut dyn SweepObserver,
) -> QfmResult<NoiseSweepResult> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut result = NoiseSweepResult::new();
    for level in sweep.levels() {
        let spectra = sample_spectra(
            model,
            options.n_samples,
            &mut rng,
            &options.spectrum,
            Some(&level.noise),
        )?;
        let stats = CoefficientStatistics::from_spectra(&spectra, options.zero_coefficient)?;

        let mut row = sweep.base_row(&level);
        row.insert("coeffs_abs_var", SweepValue::Floats(stats.abs_var.to_vec()));
        row.insert("coeffs_var", SweepValue::Floats(stats.var.to_vec()));
        row.insert(
            "coeffs_co_var_real_imag",
            SweepValue::Floats(stats.co_var_real_imag.to_vec()),
        );
        row.insert("coeffs_real_var", SweepValue::Floats(stats.real_var.to_vec()));
        row.insert("coeffs_imag_var", SweepValue::Floats(stats.imag_var.to_vec()));
        row.insert("coeffs_abs_mean", SweepValue::Floats(stats.abs_mean.to_vec()));
        row.insert("coeffs_real_mean", SweepValue::Floats(stats.real_mean.to_vec()));
        row.insert("coeffs_imag_mean", SweepValue::Floats(stats.imag_mean.to_vec()));
        row.insert("coeffs_full_real", SweepValue::matrix(&stats.full_real));
        row.insert("coeffs_full_imag", SweepValue::matrix(&stats.full_imag));
        let frequencies = if stats.frequencies.ncols() == 1 {
            SweepValue::Ints(stats.frequencies.column(0).to_vec())
        } else {
            SweepValue::IntMatrix(
                stats
                    .frequencies
                    .rows()
                    .into_iter()
                    .map(|r| r.to_vec())
                    .collect(),
            )
        };
        row.insert("frequencies", frequencies);

        info!(step = level.step, level = level.level, "coefficient sweep step done");
        observer.on_step(level.step, sweep.steps + 1, &row);
        result.push(row);
    }
    Ok(result)
}

/// Entangling capability at every noise level.
///
/// Every level reuses the same seed, so levels differ in noise only.
pub fn entanglement_sweep(
    model: &Model,
    sweep: &NoiseSweep,
    estimator: &EntanglementEstimator,
    options: &EntanglementOptions,
    observer: &mut dyn SweepObserver,
) -> QfmResult<NoiseSweepResult> {
    let mut result = NoiseSweepResult::new();
    for level in sweep.levels() {
        let value = estimator.estimate(model, options, Some(&level.noise))?;
        let mut row = sweep.base_row(&level);
        row.insert("entangling_capability", SweepValue::Float(value));

        info!(step = level.step, level = level.level, value, "entanglement sweep step done");
        observer.on_step(level.step, sweep.steps + 1, &row);
        result.push(row);
    }
    Ok(result)
}

/// KL expressibility at every noise level.
///
/// Every level reuses the same seed. With several input points the cell
/// holds one value per input.
pub fn expressibility_sweep(
    model: &Model,
    sweep: &NoiseSweep,
    options: &ExpressibilityOptions,
    observer: &mut dyn SweepObserver,
) -> QfmResult<NoiseSweepResult> {
    let mut result = NoiseSweepResult::new();
    for level in sweep.levels() {
        let values = ExpressibilityEstimator::expressibility(model, options, Some(&level.noise))?;
        let mut row = sweep.base_row(&level);
        let cell = match values.as_slice() {
            Some([single]) => SweepValue::Float(*single),
            _ => SweepValue::Floats(values.to_vec()),
        };
        row.insert("expressibility", cell);

        info!(step = level.step, level = level.level, "expressibility sweep step done");
        observer.on_step(level.step, sweep.steps + 1, &row);
        result.push(row);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use crate::noise::NoiseKind;

    #[derive(Default)]
    struct Recorder {
        steps: Vec<(usize, usize)>,
    }

    impl SweepObserver for Recorder {
        fn on_step(&mut self, step: usize, total: usize, _row: &SweepRow) {
            self.steps.push((step, total));
        }
    }

    fn model() -> Model {
        Model::new(ModelConfig {
            n_qubits: 2,
            n_layers: 1,
            ansatz: "Circuit_19".into(),
            ..ModelConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_levels_include_both_ends() {
        let target = NoiseConfig::single(NoiseKind::BitFlip, 0.1).unwrap();
        let sweep = NoiseSweep::new(target, 4).unwrap();
        let levels: Vec<f64> = sweep.levels().map(|l| l.level).collect();
        assert_eq!(levels, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let last = sweep.levels().last().unwrap();
        assert_eq!(last.noise.bit_flip, 0.1);
        assert!(NoiseSweep::new(NoiseConfig::default(), 0).is_err());
    }

    #[test]
    fn test_row_order_and_json() {
        let mut row = SweepRow::new();
        row.insert("b", SweepValue::Float(1.0));
        row.insert("a", SweepValue::Ints(vec![1, 2]));
        row.insert("b", SweepValue::Float(2.0));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"b":2.0,"a":[1,2]}"#);
    }

    #[test]
    fn test_entanglement_sweep_rows() {
        let model = model();
        let target = NoiseConfig::single(NoiseKind::Depolarizing, 0.2).unwrap();
        let sweep = NoiseSweep::new(target, 2).unwrap();
        let options = EntanglementOptions {
            n_samples: 4,
            ..EntanglementOptions::default()
        };
        let mut recorder = Recorder::default();
        let result = entanglement_sweep(
            &model,
            &sweep,
            &EntanglementEstimator::default(),
            &options,
            &mut recorder,
        )
        .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(recorder.steps, vec![(0, 3), (1, 3), (2, 3)]);
        let first = result.rows()[0].columns().collect::<Vec<_>>();
        assert_eq!(first, vec!["noise_level", "Depolarizing", "entangling_capability"]);
        assert!(
            result
                .column("entangling_capability")
                .all(|v| v.as_float().is_some_and(|x| x >= 0.0))
        );
    }

    #[test]
    fn test_coefficient_sweep_columns() {
        let mut model = model();
        let target = NoiseConfig::single(NoiseKind::PhaseFlip, 0.1).unwrap();
        let sweep = NoiseSweep::new(target, 1).unwrap();
        let options = CoefficientSweepOptions {
            n_samples: 3,
            ..CoefficientSweepOptions::default()
        };
        let result = coefficient_sweep(&mut model, &sweep, &options, &mut ()).unwrap();
        assert_eq!(result.len(), 2);
        let row = &result.rows()[1];
        assert_eq!(row.get("PhaseFlip").and_then(SweepValue::as_float), Some(0.1));
        assert_eq!(
            row.get("frequencies"),
            Some(&SweepValue::Ints(vec![0, 1, 2]))
        );
        match row.get("coeffs_full_real") {
            Some(SweepValue::Matrix(m)) => assert_eq!((m.len(), m[0].len()), (3, 3)),
            other => panic!("unexpected cell {other:?}"),
        }
    }

    #[test]
    fn test_expressibility_sweep_single_value() {
        let model = model();
        let target = NoiseConfig::single(NoiseKind::AmplitudeDamping, 0.2).unwrap();
        let sweep = NoiseSweep::new(target, 1).unwrap();
        let options = ExpressibilityOptions {
            n_samples: 10,
            n_bins: 5,
            ..ExpressibilityOptions::default()
        };
        let result = expressibility_sweep(&model, &sweep, &options, &mut ()).unwrap();
        assert!(result.column("expressibility").all(|v| v.as_float().is_some()));
    }
}
