//! Opt-in memoization of model executions.
//!
//! Caching is never implicit: callers pass a [`ResultCache`] to
//! [`Model::execute_cached`](crate::Model::execute_cached). Keys are
//! structural and always include the parameter tensor, so a parameter
//! update can never return a stale result.

use rustc_hash::FxHashMap;

use crate::model::{EncodingGate, Output, OutputMode};
use crate::noise::{NoiseConfig, NoiseKind, NoiseScope};

/// Storage for execution results.
pub trait ResultCache {
    /// Look up a stored result.
    fn get(&self, key: &CacheKey) -> Option<Output>;

    /// Store a result.
    fn put(&mut self, key: CacheKey, output: Output);
}

/// Everything that determines an execution's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub(crate) model: ModelFingerprint,
    pub(crate) params: Vec<u64>,
    pub(crate) inputs_shape: (usize, usize),
    pub(crate) inputs: Vec<u64>,
    pub(crate) noise: Option<Vec<u64>>,
    pub(crate) scope: NoiseScope,
    pub(crate) mode: OutputMode,
    pub(crate) noise_seed: u64,
}

/// Structural identity of a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct ModelFingerprint {
    pub n_qubits: usize,
    pub n_layers: usize,
    pub ansatz: &'static str,
    pub hadamard_prep: bool,
    pub data_reupload: bool,
    pub encoding: Vec<EncodingGate>,
    pub output_qubits: Vec<usize>,
}

pub(crate) fn float_bits<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<u64> {
    values.into_iter().map(|v| v.to_bits()).collect()
}

pub(crate) fn noise_bits(noise: &NoiseConfig) -> Vec<u64> {
    let mut bits: Vec<u64> = NoiseKind::ALL
        .iter()
        .map(|&k| noise.rate(k).to_bits())
        .collect();
    bits.push(noise.thermal_relaxation.map_or(0, |t| t.f_factor.to_bits()));
    bits
}

/// In-process cache backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: FxHashMap<CacheKey, Output>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every stored result.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Output> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, output: Output) {
        self.entries.insert(key, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    use crate::model::{Execution, Model, ModelConfig};

    fn model() -> Model {
        Model::new(ModelConfig {
            n_qubits: 2,
            n_layers: 1,
            ..ModelConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_cache_hit_returns_same_output() {
        let model = model();
        let inputs = array![[0.1], [0.7]];
        let mut cache = MemoryCache::new();

        let first = model
            .execute_cached(&Execution::new(inputs.view()), &mut cache)
            .unwrap();
        assert_eq!(cache.len(), 1);
        let second = model
            .execute_cached(&Execution::new(inputs.view()), &mut cache)
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_params_are_part_of_the_key() {
        let model = model();
        let inputs = array![[0.3]];
        let mut cache = MemoryCache::new();
        let other = Array2::<f64>::zeros(model.params().raw_dim());

        let a = model
            .execute_cached(&Execution::new(inputs.view()), &mut cache)
            .unwrap();
        let b = model
            .execute_cached(
                &Execution::new(inputs.view()).params(other.view()),
                &mut cache,
            )
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_noise_is_part_of_the_key() {
        let model = model();
        let inputs = array![[0.3]];
        let noise = NoiseConfig::single(NoiseKind::Depolarizing, 0.1).unwrap();
        let mut cache = MemoryCache::new();

        model
            .execute_cached(&Execution::new(inputs.view()), &mut cache)
            .unwrap();
        model
            .execute_cached(&Execution::new(inputs.view()).noise(&noise), &mut cache)
            .unwrap();
        assert_eq!(cache.len(), 2);
    }
}
