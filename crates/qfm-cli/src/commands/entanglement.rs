//! Entanglement sweep command.

use anyhow::Result;

use qfm::{EntanglementEstimator, entanglement_sweep};

use super::common::{ExperimentArgs, ProgressObserver, print_header, print_rows};

/// Execute the entanglement command.
pub fn execute(args: &ExperimentArgs) -> Result<()> {
    let config = args.load()?;
    let model = config.build_model()?;
    let sweep = config.sweep()?;
    let estimator = EntanglementEstimator::from_kind(config.entanglement.measure);
    print_header(
        &format!("Entanglement sweep ({})", config.entanglement.measure),
        &model,
        Some(&sweep),
    );

    let mut progress = ProgressObserver::new(sweep.steps() + 1)?;
    let result = entanglement_sweep(
        &model,
        &sweep,
        &estimator,
        &config.entanglement.options,
        &mut progress,
    );
    progress.finish();

    print_rows(&result?)
}
