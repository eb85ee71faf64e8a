use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::FilterStats;
use crate::data::model::Stage;
use crate::error::{CaseIssue, CohortError};
use crate::pipeline::CohortReport;

/// Machine-readable record of a run, for reproducing it and auditing skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub total_records: usize,
    pub stages: Vec<StageEntry>,
    pub issues: Vec<IssueEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub stage: Stage,
    pub count: usize,
    pub sampled_cases: Vec<String>,
    pub cases_used: Vec<String>,
    pub filter: FilterStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEntry {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub kind: String,
    pub message: String,
}

impl From<&CaseIssue> for IssueEntry {
    fn from(issue: &CaseIssue) -> Self {
        let kind = match issue.error {
            CohortError::Configuration(_) => "configuration",
            CohortError::MalformedInput { .. } => "malformed_input",
            CohortError::AmbiguousCase { .. } => "ambiguous_case",
            CohortError::EmptyStage { .. } => "empty_stage",
        };
        IssueEntry {
            stage: issue.stage,
            case_id: issue.case_id.clone(),
            kind: kind.to_string(),
            message: issue.error.to_string(),
        }
    }
}

impl RunSummary {
    pub fn from_report(report: &CohortReport) -> Self {
        let stages = report
            .tables
            .iter()
            .map(|(stage, table)| StageEntry {
                stage: *stage,
                count: table.len(),
                sampled_cases: report
                    .sampled
                    .get(stage)
                    .map(|cases| cases.iter().map(|c| c.id.clone()).collect())
                    .unwrap_or_default(),
                cases_used: table.cases_used().to_vec(),
                filter: report.filter_stats.get(stage).cloned().unwrap_or_default(),
            })
            .collect();
        RunSummary {
            seed: report.seed,
            total_records: report.total_records(),
            stages,
            issues: report.issues.iter().map(IssueEntry::from).collect(),
        }
    }
}

pub fn write_summary(path: &Path, report: &CohortReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&RunSummary::from_report(report))
        .context("serialising run summary")?;
    std::fs::write(path, json).with_context(|| format!("writing summary {}", path.display()))
}
