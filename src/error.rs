use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::Stage;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors raised while locating, parsing and aggregating a cohort.
///
/// Only [`CohortError::Configuration`] stops a run. The other variants are
/// recovered inside the pipeline and surfaced as [`CaseIssue`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CohortError {
    /// Bad options, missing root, or no recognised stage directories.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mutation file is unreadable or lacks a required column.
    #[error("malformed mutation file {}: {reason}", path.display())]
    MalformedInput { path: PathBuf, reason: String },

    /// A case directory holds zero or several mutation files.
    #[error("case {case_id} in {} has {found} mutation files, expected exactly one", dir.display())]
    AmbiguousCase {
        case_id: String,
        dir: PathBuf,
        found: usize,
    },

    /// A stage produced no usable rows.
    #[error("{stage} has no usable cases")]
    EmptyStage { stage: Stage },
}

impl CohortError {
    pub fn config(msg: impl Into<String>) -> Self {
        CohortError::Configuration(msg.into())
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CohortError::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A recovered error attributed to one stage (and usually one case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseIssue {
    pub stage: Stage,
    pub case_id: Option<String>,
    pub error: CohortError,
}

impl CaseIssue {
    pub fn new(stage: Stage, case_id: Option<String>, error: CohortError) -> Self {
        Self {
            stage,
            case_id,
            error,
        }
    }
}

pub type CohortResult<T> = std::result::Result<T, CohortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stage_message_names_the_stage() {
        let msg = CohortError::EmptyStage { stage: Stage::II }.to_string();
        assert_eq!(msg, "StageII has no usable cases");
    }

    #[test]
    fn messages_name_the_offending_path() {
        let err = CohortError::malformed("/data/StageI/A/a.maf", "missing column 'Hugo_Symbol'");
        let msg = err.to_string();
        assert!(msg.contains("/data/StageI/A/a.maf"));
        assert!(msg.contains("Hugo_Symbol"));
    }
}
