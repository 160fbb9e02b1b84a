//! `qfm`: noise-parameterized quantum Fourier models.
//!
//! A quantum Fourier model encodes inputs by rotations interleaved with
//! trainable ansatz blocks; its expectation output is a finite Fourier
//! series in the inputs. This crate builds such models on top of
//! [`qfm_sim`] and measures how noise changes them:
//!
//! - [`Spectrum`] and [`CoefficientStatistics`]: Fourier coefficients and
//!   their moments across random parameter draws
//! - [`EntanglementEstimator`]: Meyer-Wallach, relative entropy and
//!   entanglement of formation
//! - [`ExpressibilityEstimator`]: KL divergence of the state-fidelity
//!   distribution from the Haar distribution
//! - [`coefficient_sweep`], [`entanglement_sweep`] and
//!   [`expressibility_sweep`]: the above evaluated at evenly spaced
//!   fractions of a target [`NoiseConfig`]
//!
//! # Quick start
//!
//! ```rust
//! use ndarray::array;
//! use qfm::{Execution, Model, ModelConfig, OutputMode};
//!
//! let model = Model::new(ModelConfig {
//!     n_qubits: 2,
//!     n_layers: 1,
//!     ansatz: "Circuit_19".into(),
//!     ..ModelConfig::default()
//! })
//! .unwrap();
//!
//! let x = array![0.0, 0.5, 1.0];
//! let out = model
//!     .execute(&Execution::single_feature(x.view()).mode(OutputMode::Expectation))
//!     .unwrap();
//! assert_eq!(out.expectation().unwrap().len(), 3);
//! ```
//!
//! Noise is opt-in per call:
//!
//! ```rust
//! use qfm::{NoiseConfig, NoiseKind};
//!
//! let noise = NoiseConfig::single(NoiseKind::Depolarizing, 0.02).unwrap();
//! assert_eq!(noise.scale(0.5).rate(NoiseKind::Depolarizing), 0.01);
//! ```

pub mod ansatz;
pub mod cache;
pub mod coefficients;
pub mod entanglement;
pub mod error;
pub mod expressibility;
pub mod model;
pub mod noise;
pub mod sweep;
pub mod target;
pub mod training;

pub use ansatz::{Ansatz, ControlIndices, ShiftRule};
pub use cache::{CacheKey, MemoryCache, ResultCache};
pub use coefficients::{CoefficientStatistics, Spectrum, SpectrumOptions, sample_spectra};
pub use entanglement::{
    EntanglementEstimator, EntanglementKind, EntanglementMeasure, EntanglementOfFormation,
    EntanglementOptions, MeyerWallach, RelativeEntropy,
};
pub use error::{QfmError, QfmResult};
pub use expressibility::{
    ExpressibilityEstimator, ExpressibilityOptions, FidelityDistribution, haar_integral,
    kl_divergence,
};
pub use model::{
    EncodingGate, Execution, Initialization, Model, ModelConfig, Output, OutputMode, OutputQubit,
};
pub use noise::{NoiseConfig, NoiseKind, NoiseScope, NoiseValue, ThermalRelaxation};
pub use sweep::{
    CoefficientSweepOptions, NoiseLevel, NoiseSweep, NoiseSweepResult, SweepObserver, SweepRow,
    SweepValue, coefficient_sweep, entanglement_sweep, expressibility_sweep,
};
pub use target::{Amplitude, FourierTarget, generate_fourier_series, sample_domain};
pub use training::{
    Adam, StopReason, TrainingOptions, TrainingReport, TrainingStep, mse_and_gradient, train,
    validate_problem,
};
