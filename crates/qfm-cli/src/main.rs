//! QFM Command-Line Interface
//!
//! Runs noise sweeps over quantum Fourier models and trains them on
//! target series. Every sweep prints its row table as JSON on stdout;
//! progress and logs go to stderr.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::ExperimentArgs;
use commands::{ansaetze, coefficients, entanglement, expressibility, train};

/// qfm - noise sweeps for quantum Fourier models
#[derive(Parser)]
#[command(name = "qfm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep Fourier coefficient statistics over noise levels
    Coefficients(ExperimentArgs),

    /// Sweep entangling capability over noise levels
    Entanglement(ExperimentArgs),

    /// Sweep expressibility over noise levels
    Expressibility(ExperimentArgs),

    /// Fit a model to a target Fourier series
    Train(ExperimentArgs),

    /// List the available ansaetze
    Ansaetze {
        /// Register width used for the parameter counts
        #[arg(short, long, default_value = "4")]
        qubits: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Coefficients(args) => coefficients::execute(&args),
        Commands::Entanglement(args) => entanglement::execute(&args),
        Commands::Expressibility(args) => expressibility::execute(&args),
        Commands::Train(args) => train::execute(&args),
        Commands::Ansaetze { qubits } => {
            ansaetze::execute(qubits);
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sweep_overrides() {
        let cli = Cli::try_parse_from([
            "qfm",
            "-vv",
            "coefficients",
            "--ansatz",
            "Circuit_19_Plus",
            "--qubits",
            "3",
            "--steps",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Coefficients(args) = cli.command else {
            panic!("expected the coefficients command");
        };
        assert_eq!(args.ansatz.as_deref(), Some("Circuit_19_Plus"));
        assert_eq!(args.qubits, Some(3));
        assert_eq!(args.steps, Some(5));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_ansaetze_default_width() {
        let cli = Cli::try_parse_from(["qfm", "ansaetze"]).unwrap();
        assert!(matches!(cli.command, Commands::Ansaetze { qubits: 4 }));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["qfm", "compile"]).is_err());
    }
}
