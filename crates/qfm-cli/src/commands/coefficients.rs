//! Coefficient sweep command.

use anyhow::Result;

use qfm::coefficient_sweep;

use super::common::{ExperimentArgs, ProgressObserver, print_header, print_rows};

/// Execute the coefficients command.
pub fn execute(args: &ExperimentArgs) -> Result<()> {
    let config = args.load()?;
    let mut model = config.build_model()?;
    let sweep = config.sweep()?;
    print_header("Coefficient sweep", &model, Some(&sweep));

    let mut progress = ProgressObserver::new(sweep.steps() + 1)?;
    let result = coefficient_sweep(&mut model, &sweep, &config.coefficients, &mut progress);
    progress.finish();

    print_rows(&result?)
}
