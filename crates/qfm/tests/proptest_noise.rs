//! Property-based tests for noise configurations and noisy model outputs.

use proptest::prelude::*;
use qfm::{Execution, Model, ModelConfig, NoiseConfig, NoiseKind, OutputMode};

fn arb_noise() -> impl Strategy<Value = NoiseConfig> {
    (
        0.0..=0.3f64,
        0.0..=0.3f64,
        0.0..=0.3f64,
        0.0..=0.3f64,
        0.0..=0.2f64,
        0.0..=0.2f64,
    )
        .prop_map(|(bf, pf, ad, dp, ge, meas)| NoiseConfig {
            bit_flip: bf,
            phase_flip: pf,
            amplitude_damping: ad,
            depolarizing: dp,
            gate_error: ge,
            measurement: meas,
            ..NoiseConfig::default()
        })
}

fn arb_ansatz() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Circuit_1",
        "Circuit_9",
        "Circuit_19",
        "Strongly_Entangling",
        "Hardware_Efficient",
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn scaling_is_linear_in_every_rate(noise in arb_noise(), f in 0.0..=1.0f64) {
        let scaled = noise.scale(f);
        for kind in NoiseKind::ALL {
            prop_assert!((scaled.rate(kind) - noise.rate(kind) * f).abs() < 1e-15);
        }
        prop_assert!(scaled.validate().is_ok());
    }

    #[test]
    fn config_serde_preserves_active_rates(noise in arb_noise()) {
        let json = serde_json::to_string(&noise).unwrap();
        let back: NoiseConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.active_kinds(), noise.active_kinds());
        for kind in NoiseKind::ALL {
            prop_assert!((back.rate(kind) - noise.rate(kind)).abs() < 1e-15);
        }
    }

    #[test]
    fn noisy_outputs_stay_physical(
        ansatz in arb_ansatz(),
        n_qubits in 1usize..=3,
        noise in arb_noise(),
        x in -4.0..4.0f64,
    ) {
        let model = Model::new(ModelConfig {
            n_qubits,
            n_layers: 1,
            ansatz: ansatz.into(),
            ..ModelConfig::default()
        })
        .unwrap();
        let inputs = ndarray::array![x];

        let expectation = model
            .execute(&Execution::single_feature(inputs.view()).noise(&noise))
            .unwrap()
            .into_expectation()
            .unwrap();
        prop_assert!(expectation[0].abs() <= 1.0 + 1e-9);

        let probs = model
            .execute(
                &Execution::single_feature(inputs.view())
                    .noise(&noise)
                    .mode(OutputMode::Probabilities),
            )
            .unwrap();
        let probs = probs.probabilities().unwrap();
        prop_assert!((probs.sum() - 1.0).abs() < 1e-9);
        prop_assert!(probs.iter().all(|&p| p >= -1e-12));

        let states = model
            .execute(
                &Execution::single_feature(inputs.view())
                    .noise(&noise)
                    .mode(OutputMode::Density),
            )
            .unwrap()
            .into_densities()
            .unwrap();
        prop_assert!((states[0].trace() - 1.0).abs() < 1e-9);
        prop_assert!(states[0].purity() <= 1.0 + 1e-9);
    }
}
