//! Ansatz listing command.

use console::style;

use qfm::Ansatz;

/// Execute the ansaetze command.
pub fn execute(n_qubits: usize) {
    println!(
        "{} Available ansaetze at {} qubits:",
        style("→").cyan().bold(),
        n_qubits
    );
    println!();
    println!("  {:<22} {:>12}  {}", "Name", "Params/layer", "Entangling");
    for ansatz in Ansatz::ALL {
        let entangling = ansatz.is_entangling() && n_qubits > 1;
        println!(
            "  {} {:>12}  {}",
            style(format!("{:<22}", ansatz.name())).green(),
            ansatz.params_per_layer(n_qubits),
            if entangling {
                style("yes").yellow()
            } else {
                style("no").dim()
            }
        );
    }
    println!();
    println!(
        "Append {} to any name to prepare every qubit with a Hadamard.",
        style("_Plus").cyan()
    );
}
