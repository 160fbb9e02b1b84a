//! Expressibility sweep command.

use anyhow::Result;

use qfm::expressibility_sweep;

use super::common::{ExperimentArgs, ProgressObserver, print_header, print_rows};

/// Execute the expressibility command.
pub fn execute(args: &ExperimentArgs) -> Result<()> {
    let config = args.load()?;
    let model = config.build_model()?;
    let sweep = config.sweep()?;
    print_header("Expressibility sweep", &model, Some(&sweep));

    let mut progress = ProgressObserver::new(sweep.steps() + 1)?;
    let result = expressibility_sweep(&model, &sweep, &config.expressibility, &mut progress);
    progress.finish();

    print_rows(&result?)
}
