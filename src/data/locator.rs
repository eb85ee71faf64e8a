use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use super::model::{Case, Stage};
use crate::error::{CaseIssue, CohortError, CohortResult};

pub const MAF_SUFFIX: &str = ".maf";

/// Depth limit for the mutation-file search below a case directory.
pub const MAX_CASE_DEPTH: usize = 4;

/// Cases discovered under the cohort root.
#[derive(Debug, Clone, Default)]
pub struct CaseIndex {
    /// Usable cases per stage, sorted by case id.
    pub stages: BTreeMap<Stage, Vec<Case>>,
    /// Cases skipped because their mutation file was missing or ambiguous.
    pub issues: Vec<CaseIssue>,
}

/// Walk `root/<stage>/<case>/…/*.maf`.
///
/// Fails only when `root` is missing or holds no recognised stage
/// directory; per-case problems are recorded in [`CaseIndex::issues`].
pub fn locate_cases(root: &Path) -> CohortResult<CaseIndex> {
    if !root.is_dir() {
        return Err(CohortError::config(format!(
            "cohort root {} does not exist or is not a directory",
            root.display()
        )));
    }

    let mut index = CaseIndex::default();
    for (stage, stage_dir) in stage_dirs(root)? {
        collect_stage(&mut index, stage, &stage_dir);
    }

    for cases in index.stages.values_mut() {
        cases.sort_by(|a, b| a.id.cmp(&b.id));
    }

    if index.stages.is_empty() {
        return Err(CohortError::config(format!(
            "no stage directories (e.g. StageI, StageII) found under {}",
            root.display()
        )));
    }
    Ok(index)
}

/// Add the cases of one stage directory to `index`. A stage directory that
/// cannot be listed still registers the stage, with no cases.
fn collect_stage(index: &mut CaseIndex, stage: Stage, stage_dir: &Path) {
    let case_dirs = match subdirs(stage_dir) {
        Ok(dirs) => dirs,
        Err(err) => {
            warn!("{stage}: {err}; exporting it with no cases");
            Vec::new()
        }
    };
    let mut cases = Vec::new();
    for (case_id, case_dir) in case_dirs {
        let mut found = find_maf_files(&case_dir);
        if found.len() == 1 {
            cases.push(Case {
                id: case_id,
                maf_path: found.remove(0),
            });
        } else {
            let err = CohortError::AmbiguousCase {
                case_id: case_id.clone(),
                dir: case_dir,
                found: found.len(),
            };
            warn!("{stage}: skipping case: {err}");
            index.issues.push(CaseIssue::new(stage, Some(case_id), err));
        }
    }
    debug!("{stage}: {} usable cases in {}", cases.len(), stage_dir.display());
    // Two directories may normalise to the same stage ("StageI", "Stage I").
    index.stages.entry(stage).or_default().extend(cases);
}

fn stage_dirs(root: &Path) -> CohortResult<Vec<(Stage, PathBuf)>> {
    let mut out = Vec::new();
    for (name, path) in subdirs(root)? {
        match Stage::from_dir_name(&name) {
            Some(stage) => out.push((stage, path)),
            None => debug!("ignoring non-stage directory {}", path.display()),
        }
    }
    Ok(out)
}

/// Immediate subdirectories, sorted by name.
fn subdirs(dir: &Path) -> CohortResult<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CohortError::config(format!("cannot list {}: {e}", dir.display())))?;
    let mut out: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    out.sort();
    Ok(out)
}

/// Every `*.maf` file within [`MAX_CASE_DEPTH`] levels of `case_dir`.
/// Symlinked files and directories are followed.
pub fn find_maf_files(case_dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(case_dir)
        .max_depth(MAX_CASE_DEPTH)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(MAF_SUFFIX))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}
