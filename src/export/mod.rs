/// Output sinks fed by the aggregated cohort.
///
/// * `workbook` – one sheet per stage plus a combined sheet (xlsx)
/// * `chart`    – stage vs. mutation count scatter (svg)
/// * `summary`  – seed, selections, counts and skipped cases (json)
pub mod chart;
pub mod summary;
pub mod workbook;

use anyhow::Result;
use log::info;

use crate::config::Config;
use crate::pipeline::CohortReport;

/// Write every configured output for `report`.
pub fn export_all(report: &CohortReport, config: &Config) -> Result<()> {
    let sheets = workbook::cohort_sheets(&report.tables);
    workbook::write_workbook(&config.workbook, &sheets)?;
    for sheet in &sheets {
        info!("Saved {} records to sheet: {}", sheet.rows.len(), sheet.name);
    }

    chart::write_chart(&config.chart, &report.summaries(), &chart::ChartConfig::default())?;
    info!("Wrote chart to {}", config.chart.display());

    if let Some(path) = &config.summary {
        summary::write_summary(path, report)?;
        info!("Wrote run summary to {}", path.display());
    }
    Ok(())
}
