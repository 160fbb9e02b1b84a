//! Shared helpers for CLI commands.

use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use qfm::{
    Amplitude, CoefficientSweepOptions, EntanglementKind, EntanglementOptions,
    ExpressibilityOptions, Model, ModelConfig, NoiseConfig, NoiseSweep, NoiseSweepResult,
    SweepObserver, SweepRow, TrainingOptions,
};

/// Noise sweep target and resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSection {
    /// Full-strength noise reached at the last step.
    pub target: NoiseConfig,
    /// Number of increments from zero to `target`.
    pub steps: usize,
}

impl Default for NoiseSection {
    fn default() -> Self {
        Self {
            target: NoiseConfig::default(),
            steps: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntanglementSection {
    pub measure: EntanglementKind,
    #[serde(flatten)]
    pub options: EntanglementOptions,
}

/// Target series and optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    pub domain: (f64, f64),
    /// Highest target frequency.
    pub omega: usize,
    pub amplitude: Amplitude,
    /// Seed of random target coefficients.
    pub target_seed: u64,
    #[serde(flatten)]
    pub options: TrainingOptions,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            domain: (-PI, PI),
            omega: 1,
            amplitude: Amplitude::default(),
            target_seed: 1000,
            options: TrainingOptions::default(),
        }
    }
}

/// Experiment file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub model: ModelConfig,
    pub noise: NoiseSection,
    pub coefficients: CoefficientSweepOptions,
    pub entanglement: EntanglementSection,
    pub expressibility: ExpressibilityOptions,
    pub training: TrainingSection,
}

/// Flags that override the experiment file.
#[derive(Debug, Clone, Default, Args)]
pub struct ExperimentArgs {
    /// Experiment file (YAML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Ansatz name, optionally with the `_Plus` suffix
    #[arg(short, long)]
    pub ansatz: Option<String>,

    /// Number of qubits
    #[arg(short, long)]
    pub qubits: Option<usize>,

    /// Number of encoding layers
    #[arg(short, long)]
    pub layers: Option<usize>,

    /// Sweep increments, or optimizer steps for `train`
    #[arg(long)]
    pub steps: Option<usize>,

    /// Random parameter draws per sweep level
    #[arg(long)]
    pub samples: Option<usize>,

    /// Seed for the model and every sampler
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ExperimentArgs {
    /// Load the configured file (or defaults) and apply the overrides.
    pub fn load(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => load_experiment(path)?,
            None => ExperimentConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut ExperimentConfig) {
        if let Some(ansatz) = &self.ansatz {
            config.model.ansatz.clone_from(ansatz);
        }
        if let Some(qubits) = self.qubits {
            config.model.n_qubits = qubits;
        }
        if let Some(layers) = self.layers {
            config.model.n_layers = layers;
        }
        if let Some(steps) = self.steps {
            config.noise.steps = steps;
            config.training.options.steps = steps;
        }
        if let Some(samples) = self.samples {
            config.coefficients.n_samples = samples;
            config.entanglement.options.n_samples = samples;
            config.expressibility.n_samples = samples;
        }
        if let Some(seed) = self.seed {
            config.model.seed = seed;
            config.coefficients.seed = seed;
            config.entanglement.options.seed = seed;
            config.expressibility.seed = seed;
        }
    }
}

/// Parse an experiment file.
pub fn load_experiment(path: &str) -> Result<ExperimentConfig> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    let config: ExperimentConfig = serde_yaml_ng::from_str(&source)
        .with_context(|| format!("Invalid experiment file: {path}"))?;
    debug!(path, ansatz = %config.model.ansatz, "Loaded experiment");
    Ok(config)
}

impl ExperimentConfig {
    /// Build the model described by the `model` section.
    pub fn build_model(&self) -> Result<Model> {
        Model::new(self.model.clone()).context("Failed to build model")
    }

    /// Sweep from zero to the `noise` target.
    pub fn sweep(&self) -> Result<NoiseSweep> {
        if self.noise.target.is_noiseless() {
            anyhow::bail!("The noise target is empty; set at least one rate under `noise.target`");
        }
        NoiseSweep::new(self.noise.target.clone(), self.noise.steps)
            .context("Invalid noise sweep")
    }
}

/// Print a one-line summary of what is about to run.
pub fn print_header(command: &str, model: &Model, sweep: Option<&NoiseSweep>) {
    eprintln!(
        "{} {} for {}",
        style("→").cyan().bold(),
        style(command).green(),
        style(model).yellow()
    );
    if let Some(sweep) = sweep {
        let kinds: Vec<&str> = sweep.target().active_kinds().iter().map(|k| k.name()).collect();
        eprintln!("  Noise: {} in {} steps", kinds.join(", "), sweep.steps());
    }
}

/// Progress bar over sweep levels.
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new(total: usize) -> Result<Self> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} {msg}")?,
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SweepObserver for ProgressObserver {
    fn on_step(&mut self, step: usize, _total: usize, row: &SweepRow) {
        if let Some(level) = row.get("noise_level").and_then(|v| v.as_float()) {
            self.bar.set_message(format!("level {level:.3}"));
        }
        self.bar.set_position(step as u64 + 1);
    }
}

/// Print a sweep table as JSON on stdout.
pub fn print_rows(result: &NoiseSweepResult) -> Result<()> {
    println!("{}", result.to_json()?);
    Ok(())
}
