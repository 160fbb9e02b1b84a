//! End-to-end properties of models, spectra and the metric estimators.

use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};
use rand::SeedableRng;
use rand::rngs::StdRng;

use qfm::{
    Ansatz, CoefficientStatistics, CoefficientSweepOptions, EncodingGate, EntanglementEstimator,
    EntanglementMeasure, EntanglementOptions, Execution, MeyerWallach, Model, ModelConfig,
    NoiseConfig, NoiseKind, NoiseSweep, OutputMode, Spectrum, SpectrumOptions,
    coefficient_sweep, kl_divergence, sample_spectra,
};

fn model(ansatz: &str, n_qubits: usize, n_layers: usize) -> Model {
    Model::new(ModelConfig {
        n_qubits,
        n_layers,
        ansatz: ansatz.into(),
        ..ModelConfig::default()
    })
    .unwrap()
}

// ---------------------------------------------------------------------------
// Parameter layout
// ---------------------------------------------------------------------------

#[test]
fn params_shape_follows_topology_table() {
    let cases = [
        ("Circuit_1", 3, 6),
        ("Circuit_5", 3, 18),
        ("Circuit_9", 3, 3),
        ("Circuit_15", 3, 6),
        ("Circuit_18", 3, 9),
        ("Circuit_19", 3, 9),
        ("No_Entangling", 3, 9),
        ("Strongly_Entangling", 2, 12),
        ("Hardware_Efficient", 4, 12),
    ];
    for (name, n, ppl) in cases {
        let m = model(name, n, 2);
        assert_eq!(m.params().dim(), (3, ppl), "{name} at {n} qubits");
    }
}

#[test]
fn every_topology_runs_at_every_width() {
    for ansatz in Ansatz::ALL {
        for n in 1..=3 {
            let m = model(ansatz.name(), n, 1);
            let out = m
                .execute(&Execution::single_feature(array![0.3, 1.2].view()))
                .unwrap()
                .into_expectation()
                .unwrap();
            assert!(out.iter().all(|v| v.abs() <= 1.0 + 1e-12), "{ansatz} at {n}");
        }
    }
}

// ---------------------------------------------------------------------------
// Spectra
// ---------------------------------------------------------------------------

#[test]
fn zero_degree_models_have_a_single_dc_coefficient() {
    let constant = model("Circuit_19", 2, 0);
    let spectrum = Spectrum::extract(&constant, &SpectrumOptions::default(), None).unwrap();
    assert_eq!(spectrum.coefficients.shape(), &[1]);
    assert_eq!(spectrum.frequencies.to_vec(), vec![0]);
    let value = constant
        .execute(&Execution::single_feature(array![1.7].view()))
        .unwrap()
        .into_expectation()
        .unwrap()[0];
    assert_abs_diff_eq!(spectrum.coefficients.first().unwrap().re, value, epsilon = 1e-12);

    let no_reupload = Model::new(ModelConfig {
        n_layers: 2,
        data_reupload: false,
        ..ModelConfig::default()
    })
    .unwrap();
    assert_eq!(no_reupload.degree(), 0);
    let spectrum = Spectrum::extract(&no_reupload, &SpectrumOptions::default(), None).unwrap();
    assert_eq!(spectrum.coefficients.len(), 1);
}

#[test]
fn spectrum_reconstructs_model_output() {
    let m = model("Hardware_Efficient", 2, 2);
    let spectrum = Spectrum::extract(&m, &SpectrumOptions::default(), None).unwrap();
    assert_eq!(spectrum.frequencies.to_vec(), vec![-4, -3, -2, -1, 0, 1, 2, 3, 4]);

    let x = array![-2.1, -0.4, 0.0, 0.9, 2.6, 5.5];
    let direct = m
        .execute(&Execution::single_feature(x.view()))
        .unwrap()
        .into_expectation()
        .unwrap();
    for (xi, fi) in x.iter().zip(direct.iter()) {
        assert_abs_diff_eq!(spectrum.evaluate(&[*xi]), *fi, epsilon = 1e-6);
    }
}

#[test]
fn two_feature_spectrum_reconstructs_model_output() {
    let m = Model::new(ModelConfig {
        n_qubits: 2,
        n_layers: 1,
        ansatz: "Circuit_19".into(),
        encoding: vec![EncodingGate::RX, EncodingGate::RY],
        ..ModelConfig::default()
    })
    .unwrap();
    let spectrum = Spectrum::extract(&m, &SpectrumOptions::default(), None).unwrap();
    assert_eq!(spectrum.coefficients.shape(), &[5, 5]);

    let inputs = array![[0.2, -1.1], [3.0, 0.4], [-0.7, 2.2]];
    let direct = m
        .execute(&Execution::new(inputs.view()))
        .unwrap()
        .into_expectation()
        .unwrap();
    for (row, fi) in inputs.rows().into_iter().zip(direct.iter()) {
        assert_abs_diff_eq!(spectrum.evaluate(&row.to_vec()), *fi, epsilon = 1e-6);
    }
}

#[test]
fn single_feature_spectrum_is_hermitian() {
    let m = model("Strongly_Entangling", 2, 1);
    let noise = NoiseConfig::single(NoiseKind::AmplitudeDamping, 0.05).unwrap();
    let spectrum = Spectrum::extract(&m, &SpectrumOptions::default(), Some(&noise)).unwrap();
    let c = spectrum.coefficients.view().into_dimensionality::<ndarray::Ix1>().unwrap();
    let k = c.len();
    for i in 0..k {
        let mirrored = c[k - 1 - i].conj();
        assert_abs_diff_eq!(c[i].re, mirrored.re, epsilon = 1e-12);
        assert_abs_diff_eq!(c[i].im, mirrored.im, epsilon = 1e-12);
    }
}

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

#[test]
fn zero_scaled_noise_matches_noiseless_execution() {
    let m = model("Circuit_15", 3, 2);
    let noise = NoiseConfig::default()
        .with_rate(NoiseKind::BitFlip, 0.1)
        .unwrap()
        .with_rate(NoiseKind::Depolarizing, 0.05)
        .unwrap()
        .with_rate(NoiseKind::GateError, 0.1)
        .unwrap()
        .with_rate(NoiseKind::Measurement, 0.02)
        .unwrap()
        .with_thermal_relaxation(0.1, 0.5)
        .unwrap();
    let zero = noise * 0.0;
    let x = array![0.0, 0.8, 2.4];

    for mode in [OutputMode::Expectation, OutputMode::Density] {
        let clean = m
            .execute(&Execution::single_feature(x.view()).mode(mode))
            .unwrap();
        let scaled = m
            .execute(&Execution::single_feature(x.view()).noise(&zero).mode(mode))
            .unwrap();
        assert_eq!(clean, scaled);
    }
}

#[test]
fn depolarizing_noise_damps_the_spectrum() {
    // Single-qubit depolarizing commutes with every unitary, so it scales the output.
    let m = model("Hardware_Efficient", 1, 2);
    let clean = Spectrum::extract(&m, &SpectrumOptions::default(), None).unwrap();
    let noise = NoiseConfig::single(NoiseKind::Depolarizing, 0.2).unwrap();
    let noisy = Spectrum::extract(&m, &SpectrumOptions::default(), Some(&noise)).unwrap();
    let power = |s: &Spectrum| s.coefficients.iter().map(|c| c.norm_sqr()).sum::<f64>();
    assert!(power(&noisy) < power(&clean));
}

// ---------------------------------------------------------------------------
// Entanglement
// ---------------------------------------------------------------------------

#[test]
fn meyer_wallach_ignores_qubit_order() {
    let m = model("Circuit_19", 3, 2);
    let states = m
        .execute(
            &Execution::single_feature(array![0.6].view()).mode(OutputMode::Density),
        )
        .unwrap()
        .into_densities()
        .unwrap();
    let rho = &states[0];
    let natural = MeyerWallach::new().evaluate(rho).unwrap();
    let permuted = MeyerWallach::with_order(vec![2, 0, 1]).evaluate(rho).unwrap();
    assert_abs_diff_eq!(natural, permuted, epsilon = 1e-12);
    assert!(natural > 0.0);
}

#[test]
fn product_circuits_have_no_entanglement() {
    let m = model("No_Entangling", 3, 1);
    let options = EntanglementOptions {
        n_samples: 25,
        ..EntanglementOptions::default()
    };
    let value = EntanglementEstimator::meyer_wallach()
        .estimate(&m, &options, None)
        .unwrap();
    assert_abs_diff_eq!(value, 0.0, epsilon = 1e-10);
}

// ---------------------------------------------------------------------------
// Expressibility
// ---------------------------------------------------------------------------

#[test]
fn kl_divergence_conventions() {
    let p = [0.2, 0.3, 0.5];
    assert_eq!(kl_divergence(&p, &p).unwrap(), 0.0);
    let with_empty_bin = kl_divergence(&[0.0, 0.5, 0.5], &[0.2, 0.4, 0.4]).unwrap();
    assert!(with_empty_bin.is_finite());
    assert_abs_diff_eq!(with_empty_bin, (0.5f64 / 0.4).ln(), epsilon = 1e-12);
}

// ---------------------------------------------------------------------------
// Noise sweeps
// ---------------------------------------------------------------------------

#[test]
fn coefficient_sweep_starts_at_the_noiseless_statistics() {
    let mut m = model("Hardware_Efficient", 2, 1);
    let sweep = NoiseSweep::new(NoiseConfig::single(NoiseKind::BitFlip, 0.1).unwrap(), 3).unwrap();
    let options = CoefficientSweepOptions {
        n_samples: 8,
        seed: 77,
        ..CoefficientSweepOptions::default()
    };
    let result = coefficient_sweep(&mut m, &sweep, &options, &mut ()).unwrap();
    assert_eq!(result.len(), 4);

    let levels: Vec<f64> = result
        .column("BitFlip")
        .map(|v| v.as_float().unwrap())
        .collect();
    assert_eq!(levels.len(), 4);
    for (got, want) in levels.iter().zip([0.0, 0.1 / 3.0, 0.2 / 3.0, 0.1]) {
        assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
    }

    let mut rng = StdRng::seed_from_u64(77);
    let spectra = sample_spectra(&mut m, 8, &mut rng, &SpectrumOptions::default(), None).unwrap();
    let direct = CoefficientStatistics::from_spectra(&spectra, true).unwrap();
    let swept = result.rows()[0]
        .get("coeffs_abs_mean")
        .and_then(|v| v.as_floats())
        .unwrap();
    assert_eq!(swept.len(), direct.abs_mean.len());
    for (a, b) in swept.iter().zip(direct.abs_mean.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }

    let columns: Vec<&str> = result.rows()[3].columns().collect();
    assert_eq!(&columns[..2], &["noise_level", "BitFlip"]);
    assert!(columns.contains(&"coeffs_full_imag"));
    assert!(columns.contains(&"frequencies"));
}

#[test]
fn sampling_leaves_model_parameters_untouched() {
    let mut m = model("Circuit_18", 2, 1);
    let before: Array2<f64> = m.params().clone();
    let mut rng = StdRng::seed_from_u64(3);
    sample_spectra(&mut m, 3, &mut rng, &SpectrumOptions::default(), None).unwrap();
    assert_eq!(m.params(), &before);
}
