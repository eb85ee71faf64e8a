use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::{CodingFilter, VariantClass};
use crate::data::loader::MafOptions;
use crate::data::sampler::SamplingPolicy;
use crate::error::{CohortError, CohortResult};

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything a run needs. Loaded from an optional JSON file, then
/// overridden field-by-field from the command line.
///
/// ```json
/// {
///   "root": "./grade_generalised",
///   "sampling": { "mode": "random", "size": 4 },
///   "seed": 17,
///   "coding_classes": ["Missense_Mutation", "Nonsense_Mutation"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: PathBuf,
    pub sampling: SamplingPolicy,
    /// Drawn at startup when absent.
    pub seed: Option<u64>,
    pub workbook: PathBuf,
    pub chart: PathBuf,
    pub summary: Option<PathBuf>,
    /// MAF spellings of the classes to keep.
    pub coding_classes: Vec<String>,
    pub comment_char: char,
    /// Worker threads for case parsing; rayon's global pool when absent.
    pub threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./grade_generalised"),
            sampling: SamplingPolicy::default(),
            seed: None,
            workbook: PathBuf::from("mutation_cnv_filtered.xlsx"),
            chart: PathBuf::from("mutation_frequency_scatter_filtered.svg"),
            summary: None,
            coding_classes: VariantClass::CODING
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            comment_char: '#',
            threads: None,
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Check every option that can be checked without touching the cohort.
    pub fn validate(&self) -> CohortResult<()> {
        if let SamplingPolicy::Random { size: 0 } = self.sampling {
            return Err(CohortError::config("sample size must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(CohortError::config("thread count must be at least 1"));
        }
        self.maf_options()?;
        self.coding_filter()?;
        Ok(())
    }

    pub fn coding_filter(&self) -> CohortResult<CodingFilter> {
        if self.coding_classes.is_empty() {
            return Err(CohortError::config("coding class set is empty"));
        }
        let classes = self
            .coding_classes
            .iter()
            .map(|name| name.parse::<VariantClass>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CohortError::config(e.to_string()))?;
        Ok(CodingFilter::new(classes))
    }

    pub fn maf_options(&self) -> CohortResult<MafOptions> {
        if !self.comment_char.is_ascii_graphic() {
            return Err(CohortError::config(format!(
                "comment character {:?} must be a printable ASCII character",
                self.comment_char
            )));
        }
        Ok(MafOptions {
            comment: self.comment_char as u8,
        })
    }
}
