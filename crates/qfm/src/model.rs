//! The layered Fourier model.
//!
//! A [`Model`] stacks `n_layers` blocks of *ansatz, then input encoding*
//! and, with data re-uploading, closes with one extra ansatz block. Each
//! execution builds a fresh [`qfm_ir::Circuit`] for every input row and
//! runs it on the density-matrix simulator.
//!
//! Noise is only applied when an [`Execution`] carries a
//! [`NoiseConfig`]; `None` takes the noiseless path, which never inserts
//! any channel. [`NoiseScope`] restricts noise to the encoding or the
//! ansatz blocks.

use std::f64::consts::{FRAC_PI_2, PI, SQRT_2, TAU};
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use qfm_ir::{Circuit, InstructionKind, NoiseChannel, QubitId, StandardGate};
use qfm_sim::{DensityMatrix, MAX_QUBITS, Simulator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::ansatz::{Ansatz, ShiftRule};
use crate::cache::{CacheKey, ModelFingerprint, ResultCache, float_bits, noise_bits};
use crate::error::{QfmError, QfmResult};
use crate::noise::{NoiseConfig, NoiseScope};

/// Suffix of an ansatz name that requests a Hadamard on every qubit first.
const PLUS_SUFFIX: &str = "_Plus";

// =============================================================================
// Configuration
// =============================================================================

/// Rotation gate used to encode one input feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingGate {
    /// X rotation.
    RX,
    /// Y rotation.
    RY,
    /// Z rotation.
    RZ,
}

impl EncodingGate {
    fn gate(self, x: f64) -> StandardGate {
        match self {
            EncodingGate::RX => StandardGate::Rx(x),
            EncodingGate::RY => StandardGate::Ry(x),
            EncodingGate::RZ => StandardGate::Rz(x),
        }
    }
}

/// How parameters are drawn on (re-)initialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Initialization {
    /// Uniform in `[0, 2π)`.
    #[default]
    Random,
    /// All zero.
    Zeros,
    /// Uniform, with controlled-rotation angles set to zero.
    ZeroControlled,
    /// Uniform, with controlled-rotation angles set to π.
    PiControlled,
}

/// Qubits read out by expectation and probability outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "OutputQubitRepr", into = "OutputQubitRepr")]
pub enum OutputQubit {
    /// A single qubit.
    Single(usize),
    /// An explicit list; expectations are averaged over it.
    List(Vec<usize>),
    /// Every qubit.
    All,
}

impl Default for OutputQubit {
    fn default() -> Self {
        OutputQubit::Single(0)
    }
}

impl OutputQubit {
    /// Resolve to concrete qubit indices for an `n_qubits` register.
    pub fn resolve(&self, n_qubits: usize) -> QfmResult<Vec<usize>> {
        let qubits = match self {
            OutputQubit::Single(q) => vec![*q],
            OutputQubit::List(list) => list.clone(),
            OutputQubit::All => (0..n_qubits).collect(),
        };
        if qubits.is_empty() {
            return Err(QfmError::InvalidOutputQubit("empty qubit list".into()));
        }
        for (i, &q) in qubits.iter().enumerate() {
            if q >= n_qubits {
                return Err(QfmError::InvalidOutputQubit(format!(
                    "qubit {q} out of range for {n_qubits} qubits"
                )));
            }
            if qubits[..i].contains(&q) {
                return Err(QfmError::InvalidOutputQubit(format!("duplicate qubit {q}")));
            }
        }
        Ok(qubits)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OutputQubitRepr {
    Index(usize),
    List(Vec<usize>),
    Name(String),
}

impl TryFrom<OutputQubitRepr> for OutputQubit {
    type Error = QfmError;

    fn try_from(value: OutputQubitRepr) -> Result<Self, Self::Error> {
        match value {
            OutputQubitRepr::Index(q) => Ok(OutputQubit::Single(q)),
            OutputQubitRepr::List(list) => Ok(OutputQubit::List(list)),
            OutputQubitRepr::Name(name) if name == "all" => Ok(OutputQubit::All),
            OutputQubitRepr::Name(name) => Err(QfmError::InvalidOutputQubit(format!(
                "expected an index, a list or \"all\", got '{name}'"
            ))),
        }
    }
}

impl From<OutputQubit> for OutputQubitRepr {
    fn from(value: OutputQubit) -> Self {
        match value {
            OutputQubit::Single(q) => OutputQubitRepr::Index(q),
            OutputQubit::List(list) => OutputQubitRepr::List(list),
            OutputQubit::All => OutputQubitRepr::Name("all".into()),
        }
    }
}

/// Model construction parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Register width.
    pub n_qubits: usize,
    /// Number of encoding layers.
    pub n_layers: usize,
    /// Ansatz name, optionally suffixed with `_Plus`.
    pub ansatz: String,
    /// Re-encode the input in every layer.
    pub data_reupload: bool,
    /// One rotation axis per input feature.
    pub encoding: Vec<EncodingGate>,
    /// Parameter initialization scheme.
    pub initialization: Initialization,
    /// Readout qubits.
    pub output_qubit: OutputQubit,
    /// Seed for parameter initialization and gate-error draws.
    pub seed: u64,
    /// Target noise for sweeps. Never applied implicitly.
    pub noise: Option<NoiseConfig>,
    /// Noise scope of executions that do not set their own.
    pub selective_noise: NoiseScope,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_qubits: 2,
            n_layers: 1,
            ansatz: Ansatz::HardwareEfficient.name().to_string(),
            data_reupload: true,
            encoding: vec![EncodingGate::RX],
            initialization: Initialization::Random,
            output_qubit: OutputQubit::default(),
            seed: 1000,
            noise: None,
            selective_noise: NoiseScope::BOTH,
        }
    }
}

// =============================================================================
// Execution request and result
// =============================================================================

/// Which quantity an execution returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// `⟨Z⟩` on the output qubit, averaged over a qubit list.
    #[default]
    Expectation,
    /// Computational-basis distribution over the output qubits.
    Probabilities,
    /// Full density matrix.
    Density,
}

/// One execution request.
///
/// ```
/// use ndarray::array;
/// use qfm::{Execution, Model, ModelConfig, OutputMode};
///
/// let model = Model::new(ModelConfig::default()).unwrap();
/// let inputs = array![[0.0], [0.5]];
/// let out = model
///     .execute(&Execution::new(inputs.view()).mode(OutputMode::Probabilities))
///     .unwrap();
/// assert_eq!(out.probabilities().unwrap().dim(), (2, 2));
/// ```
#[derive(Debug, Clone)]
pub struct Execution<'a> {
    inputs: ArrayView2<'a, f64>,
    params: Option<ArrayView2<'a, f64>>,
    noise: Option<&'a NoiseConfig>,
    scope: Option<NoiseScope>,
    mode: OutputMode,
    noise_seed: Option<u64>,
}

impl<'a> Execution<'a> {
    /// Evaluate at each row of `inputs` (`n_samples × n_features`).
    pub fn new(inputs: ArrayView2<'a, f64>) -> Self {
        Self {
            inputs,
            params: None,
            noise: None,
            scope: None,
            mode: OutputMode::Expectation,
            noise_seed: None,
        }
    }

    /// Evaluate a single-feature model at each value of `x`.
    pub fn single_feature(x: ArrayView1<'a, f64>) -> Self {
        Self::new(x.insert_axis(Axis(1)))
    }

    /// Use these parameters instead of the model's own.
    #[must_use]
    pub fn params(mut self, params: ArrayView2<'a, f64>) -> Self {
        self.params = Some(params);
        self
    }

    /// Reborrow this execution with other parameters.
    #[must_use]
    pub fn with_params<'b>(&'b self, params: ArrayView2<'b, f64>) -> Execution<'b> {
        Execution {
            inputs: self.inputs.view(),
            params: Some(params),
            noise: self.noise,
            scope: self.scope,
            mode: self.mode,
            noise_seed: self.noise_seed,
        }
    }

    /// Run with this noise. Without a call the execution is noiseless.
    #[must_use]
    pub fn noise(mut self, noise: &'a NoiseConfig) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Set or clear the noise.
    #[must_use]
    pub fn maybe_noise(mut self, noise: Option<&'a NoiseConfig>) -> Self {
        self.noise = noise;
        self
    }

    /// Restrict noise to a sub-part of the circuit. Without a call the
    /// model's configured scope applies.
    #[must_use]
    pub fn scope(mut self, scope: NoiseScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set or clear the scope override.
    #[must_use]
    pub fn maybe_scope(mut self, scope: Option<NoiseScope>) -> Self {
        self.scope = scope;
        self
    }

    /// Select the output.
    #[must_use]
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Seed for gate-error draws (defaults to the model seed).
    #[must_use]
    pub fn noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }
}

/// Result of an execution, one entry per input row.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Expectation values, shape `(n_samples,)`.
    Expectation(Array1<f64>),
    /// Probabilities, shape `(n_samples, 2^k)`.
    Probabilities(Array2<f64>),
    /// Density matrices.
    Density(Vec<DensityMatrix>),
}

impl Output {
    /// Expectation values, if this is an expectation output.
    pub fn expectation(&self) -> Option<&Array1<f64>> {
        match self {
            Output::Expectation(v) => Some(v),
            _ => None,
        }
    }

    /// Probabilities, if this is a probability output.
    pub fn probabilities(&self) -> Option<&Array2<f64>> {
        match self {
            Output::Probabilities(p) => Some(p),
            _ => None,
        }
    }

    /// Density matrices, if this is a density output.
    pub fn densities(&self) -> Option<&[DensityMatrix]> {
        match self {
            Output::Density(d) => Some(d),
            _ => None,
        }
    }

    /// Take the expectation values or fail.
    pub fn into_expectation(self) -> QfmResult<Array1<f64>> {
        match self {
            Output::Expectation(v) => Ok(v),
            other => Err(QfmError::InvalidArgument(format!(
                "expected an expectation output, got {}",
                other.kind()
            ))),
        }
    }

    /// Take the density matrices or fail.
    pub fn into_densities(self) -> QfmResult<Vec<DensityMatrix>> {
        match self {
            Output::Density(d) => Ok(d),
            other => Err(QfmError::InvalidArgument(format!(
                "expected a density output, got {}",
                other.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Output::Expectation(_) => "expectation",
            Output::Probabilities(_) => "probabilities",
            Output::Density(_) => "density",
        }
    }
}

// =============================================================================
// Model
// =============================================================================

/// A layered, data-encoding variational circuit with owned parameters.
#[derive(Debug, Clone)]
pub struct Model {
    n_qubits: usize,
    n_layers: usize,
    ansatz: Ansatz,
    hadamard_prep: bool,
    data_reupload: bool,
    encoding: Vec<EncodingGate>,
    initialization: Initialization,
    output_qubit: OutputQubit,
    output_qubits: Vec<usize>,
    seed: u64,
    noise: Option<NoiseConfig>,
    scope: NoiseScope,
    params: Array2<f64>,
    simulator: Simulator,
}

impl Model {
    /// Build a model and draw its initial parameters from `config.seed`.
    pub fn new(config: ModelConfig) -> QfmResult<Self> {
        let n_qubits = config.n_qubits;
        if n_qubits == 0 {
            return Err(QfmError::InvalidQubitCount {
                n_qubits,
                reason: "at least one qubit is required".into(),
            });
        }
        if n_qubits > MAX_QUBITS {
            return Err(QfmError::InvalidQubitCount {
                n_qubits,
                reason: format!("dense simulation supports at most {MAX_QUBITS} qubits"),
            });
        }

        let (name, hadamard_prep) = match config.ansatz.strip_suffix(PLUS_SUFFIX) {
            Some(base) => (base, true),
            None => (config.ansatz.as_str(), false),
        };
        let ansatz = Ansatz::from_str(name)?;

        if config.encoding.is_empty() {
            return Err(QfmError::InvalidArgument(
                "encoding needs at least one gate".into(),
            ));
        }
        let output_qubits = config.output_qubit.resolve(n_qubits)?;
        if let Some(noise) = &config.noise {
            noise.validate()?;
        }

        if n_qubits == 1 && ansatz.is_entangling() {
            warn!(
                ansatz = %ansatz,
                "single-qubit model: no entangling gates possible, using a local-only layer"
            );
        }

        let rows = if config.data_reupload {
            config.n_layers + 1
        } else {
            config.n_layers
        };
        let mut model = Self {
            n_qubits,
            n_layers: config.n_layers,
            ansatz,
            hadamard_prep,
            data_reupload: config.data_reupload,
            encoding: config.encoding,
            initialization: config.initialization,
            output_qubit: config.output_qubit,
            output_qubits,
            seed: config.seed,
            noise: config.noise,
            scope: config.selective_noise,
            params: Array2::zeros((rows, ansatz.params_per_layer(n_qubits))),
            simulator: Simulator::new(),
        };
        let mut rng = StdRng::seed_from_u64(config.seed);
        model.initialize(&mut rng);

        debug!(
            n_qubits,
            n_layers = model.n_layers,
            ansatz = %model.ansatz,
            data_reupload = model.data_reupload,
            degree = model.degree(),
            "model built"
        );
        Ok(model)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Register width.
    pub fn n_qubits(&self) -> usize {
        self.n_qubits
    }

    /// Number of encoding layers.
    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// Ansatz topology.
    pub fn ansatz(&self) -> Ansatz {
        self.ansatz
    }

    /// Whether the input is re-encoded in every layer.
    pub fn data_reupload(&self) -> bool {
        self.data_reupload
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.encoding.len()
    }

    /// Encoding gates, one per feature.
    pub fn encoding(&self) -> &[EncodingGate] {
        &self.encoding
    }

    /// Highest frequency per feature: `n_layers × n_qubits` with
    /// re-uploading, else 0.
    pub fn degree(&self) -> usize {
        if self.data_reupload {
            self.n_layers * self.n_qubits
        } else {
            0
        }
    }

    /// Parameter tensor, shape `(rows, params_per_layer)`.
    pub fn params(&self) -> &Array2<f64> {
        &self.params
    }

    /// Replace the parameters; the shape must not change.
    pub fn set_params(&mut self, params: Array2<f64>) -> QfmResult<()> {
        self.check_params_shape(params.view())?;
        self.params = params;
        Ok(())
    }

    /// Readout qubit selection.
    pub fn output_qubit(&self) -> &OutputQubit {
        &self.output_qubit
    }

    /// Model seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Configured sweep target noise.
    pub fn noise(&self) -> Option<&NoiseConfig> {
        self.noise.as_ref()
    }

    /// Configured noise scope.
    pub fn scope(&self) -> NoiseScope {
        self.scope
    }

    /// Mean control-rotation magnitude of the current parameters.
    pub fn control_rotation_mean(&self) -> Option<f64> {
        let rows: Vec<Vec<f64>> = self.params.rows().into_iter().map(|r| r.to_vec()).collect();
        self.ansatz
            .control_rotation_mean(rows.iter().map(Vec::as_slice), self.n_qubits)
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    /// Redraw the parameters in place with the configured scheme.
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) {
        self.params = self.draw_params(rng, self.initialization);
    }

    /// Draw a uniform `[0, 2π)` tensor of the parameter shape.
    pub fn random_params<R: Rng>(&self, rng: &mut R) -> Array2<f64> {
        self.draw_params(rng, Initialization::Random)
    }

    fn draw_params<R: Rng>(&self, rng: &mut R, scheme: Initialization) -> Array2<f64> {
        let shape = self.params.raw_dim();
        if scheme == Initialization::Zeros {
            return Array2::zeros(shape);
        }
        let mut params = Array2::from_shape_simple_fn(shape, || rng.gen_range(0.0..TAU));
        let fill = match scheme {
            Initialization::ZeroControlled => Some(0.0),
            Initialization::PiControlled => Some(PI),
            _ => None,
        };
        if let (Some(value), Some(idx)) = (fill, self.ansatz.control_indices(self.n_qubits)) {
            for mut row in params.rows_mut() {
                for i in idx.iter() {
                    row[i] = value;
                }
            }
        }
        params
    }

    fn check_params_shape(&self, params: ArrayView2<'_, f64>) -> QfmResult<()> {
        if params.dim() != self.params.dim() {
            return Err(QfmError::InvalidShape {
                what: "params",
                expected: format!("{:?}", self.params.dim()),
                got: format!("{:?}", params.dim()),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Circuit assembly
    // -------------------------------------------------------------------------

    /// Build the op list for one input row.
    ///
    /// `gate_rng` drives gate-error draws; it is only consulted when the
    /// noise has a non-zero gate error.
    pub fn build_circuit(
        &self,
        x: ArrayView1<'_, f64>,
        params: ArrayView2<'_, f64>,
        noise: Option<&NoiseConfig>,
        scope: NoiseScope,
        gate_rng: &mut StdRng,
    ) -> QfmResult<Circuit> {
        let n = self.n_qubits;
        let mut circuit = Circuit::new(n as u32);
        let channels = noise.map(NoiseConfig::layer_channels).unwrap_or_default();
        let gate_error = match noise {
            Some(cfg) if cfg.gate_error > 0.0 => Some(Normal::new(0.0, cfg.gate_error).map_err(
                |e| QfmError::InvalidNoiseRate {
                    kind: "GateError".into(),
                    value: cfg.gate_error,
                    reason: e.to_string(),
                },
            )?),
            _ => None,
        };

        if let Some(cfg) = noise.filter(|c| c.state_preparation > 0.0) {
            for q in 0..n {
                circuit.noise(
                    NoiseChannel::BitFlip {
                        p: cfg.state_preparation,
                    },
                    QubitId::from(q),
                )?;
            }
        }
        if self.hadamard_prep {
            for q in 0..n {
                circuit.h(QubitId::from(q))?;
            }
        }

        for (l, layer) in params.rows().into_iter().enumerate() {
            let start = circuit.len();
            match layer.as_slice() {
                Some(w) => self.ansatz.build(w, n, &mut circuit)?,
                None => self.ansatz.build(&layer.to_vec(), n, &mut circuit)?,
            }
            if scope.ansatz {
                perturb(&mut circuit, start, gate_error.as_ref(), gate_rng);
                if !scope.encoding {
                    apply_channels(&mut circuit, &channels, n)?;
                }
            }

            let encodes = l < self.n_layers && (self.data_reupload || l == 0);
            if encodes {
                let start = circuit.len();
                self.encode(x, &mut circuit)?;
                if scope.encoding {
                    perturb(&mut circuit, start, gate_error.as_ref(), gate_rng);
                }
            }
            if scope.encoding && (encodes || scope.ansatz) {
                apply_channels(&mut circuit, &channels, n)?;
            }
        }
        Ok(circuit)
    }

    fn encode(&self, x: ArrayView1<'_, f64>, circuit: &mut Circuit) -> QfmResult<()> {
        let targets = if self.data_reupload { self.n_qubits } else { 1 };
        for (gate, &value) in self.encoding.iter().zip(x.iter()) {
            for q in 0..targets {
                circuit.gate(gate.gate(value), [QubitId::from(q)])?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Execute the model for every input row.
    pub fn execute(&self, exec: &Execution<'_>) -> QfmResult<Output> {
        let params = match &exec.params {
            Some(p) => p.view(),
            None => self.params.view(),
        };
        self.check_params_shape(params)?;
        if exec.inputs.ncols() != self.n_features() {
            return Err(QfmError::InvalidShape {
                what: "inputs",
                expected: format!("(_, {})", self.n_features()),
                got: format!("{:?}", exec.inputs.dim()),
            });
        }
        if let Some(noise) = exec.noise {
            noise.validate()?;
        }
        let noise_seed = exec.noise_seed.unwrap_or(self.seed);
        let scope = exec.scope.unwrap_or(self.scope);
        let readout_flip = exec
            .noise
            .filter(|n| n.measurement > 0.0 && exec.mode != OutputMode::Density)
            .map(|n| NoiseChannel::BitFlip { p: n.measurement });

        trace!(
            rows = exec.inputs.nrows(),
            noisy = exec.noise.is_some(),
            mode = ?exec.mode,
            "executing model"
        );

        let mut expectations = Vec::new();
        let mut probabilities = Vec::new();
        let mut densities = Vec::new();
        for x in exec.inputs.rows() {
            let mut gate_rng = StdRng::seed_from_u64(noise_seed);
            let mut circuit = self.build_circuit(x, params, exec.noise, scope, &mut gate_rng)?;
            if let Some(flip) = readout_flip {
                apply_channels(&mut circuit, &[flip], self.n_qubits)?;
            }
            let rho = self.simulator.run(&circuit)?;
            match exec.mode {
                OutputMode::Expectation => {
                    let mut sum = 0.0;
                    for &q in &self.output_qubits {
                        sum += rho.expectation_z(q)?;
                    }
                    expectations.push(sum / self.output_qubits.len() as f64);
                }
                OutputMode::Probabilities => {
                    probabilities.push(rho.probabilities(&self.output_qubits)?);
                }
                OutputMode::Density => densities.push(rho),
            }
        }

        Ok(match exec.mode {
            OutputMode::Expectation => Output::Expectation(Array1::from(expectations)),
            OutputMode::Probabilities => {
                let width = 1 << self.output_qubits.len();
                let rows = probabilities.len();
                let flat: Vec<f64> = probabilities.into_iter().flatten().collect();
                Output::Probabilities(Array2::from_shape_vec((rows, width), flat).map_err(
                    |e| QfmError::InvalidShape {
                        what: "probabilities",
                        expected: format!("({rows}, {width})"),
                        got: e.to_string(),
                    },
                )?)
            }
            OutputMode::Density => Output::Density(densities),
        })
    }

    /// Execute through a cache. A hit skips simulation entirely.
    pub fn execute_cached(
        &self,
        exec: &Execution<'_>,
        cache: &mut dyn ResultCache,
    ) -> QfmResult<Output> {
        let key = self.cache_key(exec);
        if let Some(hit) = cache.get(&key) {
            trace!("cache hit");
            return Ok(hit);
        }
        let output = self.execute(exec)?;
        cache.put(key, output.clone());
        Ok(output)
    }

    fn cache_key(&self, exec: &Execution<'_>) -> CacheKey {
        let params = match &exec.params {
            Some(p) => p.view(),
            None => self.params.view(),
        };
        CacheKey {
            model: ModelFingerprint {
                n_qubits: self.n_qubits,
                n_layers: self.n_layers,
                ansatz: self.ansatz.name(),
                hadamard_prep: self.hadamard_prep,
                data_reupload: self.data_reupload,
                encoding: self.encoding.clone(),
                output_qubits: self.output_qubits.clone(),
            },
            params: float_bits(params.iter()),
            inputs_shape: exec.inputs.dim(),
            inputs: float_bits(exec.inputs.iter()),
            noise: exec.noise.map(noise_bits),
            scope: exec.scope.unwrap_or(self.scope),
            mode: exec.mode,
            noise_seed: exec.noise_seed.unwrap_or(self.seed),
        }
    }

    // -------------------------------------------------------------------------
    // Gradient
    // -------------------------------------------------------------------------

    /// Parameter-shift gradient of the expectation output.
    ///
    /// Returns `∂f(xᵢ)/∂θ` with shape `(n_samples, rows, params_per_layer)`.
    /// Every parameter feeds exactly one gate slot, so shifting the
    /// parameter shifts that gate. Controlled rotations use the four-term
    /// rule.
    pub fn gradient(&self, exec: &Execution<'_>) -> QfmResult<Array3<f64>> {
        if exec.mode != OutputMode::Expectation {
            return Err(QfmError::InvalidArgument(
                "gradients are only defined for expectation outputs".into(),
            ));
        }
        let base = match &exec.params {
            Some(p) => p.to_owned(),
            None => self.params.clone(),
        };
        self.check_params_shape(base.view())?;
        let (rows, ppl) = base.dim();
        let mut grad = Array3::zeros((exec.inputs.nrows(), rows, ppl));

        let shifted = |l: usize, i: usize, delta: f64| -> QfmResult<Array1<f64>> {
            let mut p = base.clone();
            p[[l, i]] += delta;
            self.execute(&exec.with_params(p.view()))?.into_expectation()
        };

        let d_plus = (SQRT_2 + 1.0) / (4.0 * SQRT_2);
        let d_minus = (SQRT_2 - 1.0) / (4.0 * SQRT_2);
        for l in 0..rows {
            for i in 0..ppl {
                let g = match self.ansatz.shift_rule(i, self.n_qubits) {
                    ShiftRule::TwoTerm => {
                        (shifted(l, i, FRAC_PI_2)? - shifted(l, i, -FRAC_PI_2)?) / 2.0
                    }
                    ShiftRule::FourTerm => {
                        let near = shifted(l, i, FRAC_PI_2)? - shifted(l, i, -FRAC_PI_2)?;
                        let far = shifted(l, i, 3.0 * FRAC_PI_2)? - shifted(l, i, -3.0 * FRAC_PI_2)?;
                        near * d_plus - far * d_minus
                    }
                };
                grad.slice_mut(ndarray::s![.., l, i]).assign(&g);
            }
        }
        Ok(grad)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} ({} qubits, {} layers{})",
            self.ansatz,
            if self.hadamard_prep { PLUS_SUFFIX } else { "" },
            self.n_qubits,
            self.n_layers,
            if self.data_reupload { ", reupload" } else { "" }
        )
    }
}

fn apply_channels(circuit: &mut Circuit, channels: &[NoiseChannel], n: usize) -> QfmResult<()> {
    for q in 0..n {
        for &channel in channels {
            circuit.noise(channel, QubitId::from(q))?;
        }
    }
    Ok(())
}

/// Add a Gaussian over-rotation to every parameterized gate from `start` on.
fn perturb(circuit: &mut Circuit, start: usize, dist: Option<&Normal<f64>>, rng: &mut StdRng) {
    let Some(dist) = dist else {
        return;
    };
    for inst in &mut circuit.instructions_mut()[start..] {
        if let InstructionKind::Gate(gate) = &mut inst.kind {
            if gate.is_parameterized() {
                *gate = gate.map_angles(|t| t + dist.sample(rng));
            }
        }
    }
}
