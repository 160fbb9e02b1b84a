//! Property-based tests for density-matrix invariants under noisy evolution.

use proptest::prelude::*;
use qfm_ir::{Circuit, NoiseChannel, QubitId};
use qfm_sim::Simulator;

#[derive(Debug, Clone)]
enum Op {
    Rot(u32, f64, f64, f64),
    Crx(u32, u32, f64),
    Cz(u32, u32),
    Depolarizing(u32, f64),
    AmplitudeDamping(u32, f64),
}

fn arb_op(n: u32) -> impl Strategy<Value = Op> {
    let q = 0..n;
    let angle = -7.0..7.0f64;
    prop_oneof![
        (q.clone(), angle.clone(), angle.clone(), angle.clone())
            .prop_map(|(q, a, b, c)| Op::Rot(q, a, b, c)),
        (q.clone(), q.clone(), angle).prop_map(|(c, t, a)| Op::Crx(c, t, a)),
        (q.clone(), q.clone()).prop_map(|(c, t)| Op::Cz(c, t)),
        (q.clone(), 0.0..=1.0f64).prop_map(|(q, p)| Op::Depolarizing(q, p)),
        (q, 0.0..=1.0f64).prop_map(|(q, g)| Op::AmplitudeDamping(q, g)),
    ]
}

fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=4).prop_flat_map(|n| {
        prop::collection::vec(arb_op(n), 0..=16).prop_map(move |ops| {
            let mut circuit = Circuit::new(n);
            for op in ops {
                // Duplicate-qubit draws for two-qubit ops are rejected by the builder.
                let _ = match op {
                    Op::Rot(q, a, b, c) => circuit.rot(a, b, c, QubitId(q)).map(|_| ()),
                    Op::Crx(c, t, a) => circuit.crx(a, QubitId(c), QubitId(t)).map(|_| ()),
                    Op::Cz(c, t) => circuit.cz(QubitId(c), QubitId(t)).map(|_| ()),
                    Op::Depolarizing(q, p) => circuit
                        .noise(NoiseChannel::Depolarizing { p }, QubitId(q))
                        .map(|_| ()),
                    Op::AmplitudeDamping(q, gamma) => circuit
                        .noise(NoiseChannel::AmplitudeDamping { gamma }, QubitId(q))
                        .map(|_| ()),
                };
            }
            circuit
        })
    })
}

proptest! {
    #[test]
    fn trace_is_preserved(circuit in arb_circuit()) {
        let rho = Simulator::new().run(&circuit).unwrap();
        prop_assert!((rho.trace() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn state_stays_hermitian(circuit in arb_circuit()) {
        let rho = Simulator::new().run(&circuit).unwrap();
        let m = rho.as_array();
        for r in 0..rho.dim() {
            for c in 0..rho.dim() {
                prop_assert!((m[[r, c]] - m[[c, r]].conj()).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn purity_is_bounded(circuit in arb_circuit()) {
        let rho = Simulator::new().run(&circuit).unwrap();
        let dim = rho.dim() as f64;
        prop_assert!(rho.purity() <= 1.0 + 1e-9);
        prop_assert!(rho.purity() >= 1.0 / dim - 1e-9);

        for q in 0..rho.num_qubits() {
            let red = rho.reduced(q).unwrap();
            prop_assert!((red.trace() - 1.0).abs() < 1e-9);
            prop_assert!(red.purity() >= 0.5 - 1e-9);
            prop_assert!(red.purity() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn probabilities_sum_to_one(circuit in arb_circuit()) {
        let rho = Simulator::new().run(&circuit).unwrap();
        let all: Vec<usize> = (0..rho.num_qubits()).collect();
        let total: f64 = rho.probabilities(&all).unwrap().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn self_fidelity_is_one(circuit in arb_circuit()) {
        let rho = Simulator::new().run(&circuit).unwrap();
        let f = rho.fidelity(&rho).unwrap();
        prop_assert!((f - 1.0).abs() < 1e-6);
    }
}
