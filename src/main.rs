mod cli;

use log::{info, warn};

use stage_maf::export::export_all;
use stage_maf::run_cohort;

fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = cli::config_from_matches(&matches)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!("sampling seed {seed} (pass --seed {seed} to reproduce this selection)");

    // Configuration errors surface here, before anything is written.
    let report = run_cohort(&config, seed)?;

    if report.total_records() == 0 {
        warn!("No coding mutation data collected! Ensure MAF files exist.");
    }
    if !report.issues.is_empty() {
        warn!("{} cases or stages were skipped or flagged; see log above", report.issues.len());
    }

    export_all(&report, &config)?;
    Ok(())
}
