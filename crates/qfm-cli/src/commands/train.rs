//! Training command.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qfm::{TrainingStep, generate_fourier_series, sample_domain, train, validate_problem};

use super::common::{ExperimentArgs, print_header};

/// Execute the train command.
///
/// The model is trained under the full `noise.target`; an empty target
/// trains noiselessly.
pub fn execute(args: &ExperimentArgs) -> Result<()> {
    let config = args.load()?;
    let mut model = config.build_model()?;
    let section = &config.training;
    print_header("Training", &model, None);

    let x = sample_domain(section.domain, section.omega);
    let target = generate_fourier_series(&x, section.omega, section.amplitude, section.target_seed)
        .context("Failed to generate the target series")?;
    validate_problem(&model, section.omega);
    eprintln!(
        "  Target: {} points, max frequency {}",
        x.len(),
        section.omega
    );

    let noise = (!config.noise.target.is_noiseless()).then_some(&config.noise.target);

    let bar = ProgressBar::new(section.options.steps as u64);
    bar.set_style(ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} {msg}")?);
    let report = train(
        &mut model,
        x.view(),
        target.values.view(),
        noise,
        &section.options,
        &mut |step: &TrainingStep| {
            bar.set_message(format!("mse {:.2e}", step.mse));
            bar.inc(1);
        },
    );
    bar.finish_and_clear();
    let report = report?;

    eprintln!(
        "{} Stopped after {} steps ({:?}), final mse {:.3e}",
        style("✓").green().bold(),
        report.steps.len(),
        report.stop_reason,
        report.final_mse
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
