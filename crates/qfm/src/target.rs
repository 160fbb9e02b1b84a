//! Target Fourier series for training.

use std::fmt;

use ndarray::Array1;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::error::{QfmError, QfmResult};

/// Coefficient amplitudes of a generated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amplitude {
    /// The same real amplitude for every frequency.
    Constant(f64),
    /// Seeded uniform `[0, 1)` real and imaginary parts, Hermitian-symmetric.
    Random,
}

impl Default for Amplitude {
    fn default() -> Self {
        Amplitude::Constant(0.5)
    }
}

impl Serialize for Amplitude {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amplitude::Constant(a) => serializer.serialize_f64(*a),
            Amplitude::Random => serializer.serialize_str("random"),
        }
    }
}

impl<'de> Deserialize<'de> for Amplitude {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmplitudeVisitor;

        impl Visitor<'_> for AmplitudeVisitor {
            type Value = Amplitude;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or \"random\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amplitude, E> {
                Ok(Amplitude::Constant(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amplitude, E> {
                Ok(Amplitude::Constant(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amplitude, E> {
                Ok(Amplitude::Constant(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amplitude, E> {
                match v {
                    "random" => Ok(Amplitude::Random),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(AmplitudeVisitor)
    }
}

/// A sampled, normalized Fourier series.
#[derive(Debug, Clone, PartialEq)]
pub struct FourierTarget {
    /// Sample points.
    pub x: Array1<f64>,
    /// Series values, scaled to `max |value| = 1`.
    pub values: Array1<f64>,
    /// Coefficients for frequencies `-ω..=ω`, scaled like `values`.
    pub coefficients: Array1<Complex64>,
    /// Frequencies `-ω..=ω`.
    pub frequencies: Array1<i64>,
}

/// Sample points on `domain` dense enough for frequency `max_omega`:
/// `⌈2 · max|domain| · max_omega⌉` equidistant points.
pub fn sample_domain(domain: (f64, f64), max_omega: usize) -> Array1<f64> {
    let extent = domain.0.abs().max(domain.1.abs());
    let n_d = (2.0 * extent * max_omega as f64).ceil() as usize;
    info!(n_d, "sampling target domain");
    Array1::linspace(domain.0, domain.1, n_d)
}

/// Evaluate `Σ c_k e^{i ω_k x}` at every `x` and normalize.
pub fn generate_fourier_series(
    x: &Array1<f64>,
    omega: usize,
    amplitude: Amplitude,
    seed: u64,
) -> QfmResult<FourierTarget> {
    let frequencies: Array1<i64> = (-(omega as i64)..=omega as i64).collect();
    let mut coefficients: Array1<Complex64> = match amplitude {
        Amplitude::Constant(a) => Array1::from_elem(frequencies.len(), Complex64::new(a, 0.0)),
        Amplitude::Random => {
            let mut rng = StdRng::seed_from_u64(seed);
            let positive: Vec<Complex64> = (0..omega)
                .map(|_| Complex64::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)))
                .collect();
            let c0 = Complex64::new(rng.gen_range(0.0..1.0), 0.0);
            positive
                .iter()
                .rev()
                .map(Complex64::conj)
                .chain(std::iter::once(c0))
                .chain(positive.iter().copied())
                .collect()
        }
    };

    let mut values = x.mapv(|xi| {
        coefficients
            .iter()
            .zip(frequencies.iter())
            .map(|(c, &w)| (c * Complex64::from_polar(1.0, w as f64 * xi)).re)
            .sum::<f64>()
    });
    let norm = values.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if norm == 0.0 || !norm.is_finite() {
        return Err(QfmError::InvalidArgument(
            "target series is identically zero".into(),
        ));
    }
    values /= norm;
    coefficients.mapv_inplace(|c| c / norm);

    Ok(FourierTarget {
        x: x.clone(),
        values,
        coefficients,
        frequencies,
    })
}
