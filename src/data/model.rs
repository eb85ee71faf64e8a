use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Stage – the cohort partitioning key
// ---------------------------------------------------------------------------

/// AJCC stage, in canonical order. The derived `Ord` is the order used for
/// every per-stage output (sheets, chart points, summaries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Stage0")]
    Zero,
    #[serde(rename = "StageI")]
    I,
    #[serde(rename = "StageIA")]
    IA,
    #[serde(rename = "StageIB")]
    IB,
    #[serde(rename = "StageIC")]
    IC,
    #[serde(rename = "StageII")]
    II,
    #[serde(rename = "StageIIA")]
    IIA,
    #[serde(rename = "StageIIB")]
    IIB,
    #[serde(rename = "StageIIC")]
    IIC,
    #[serde(rename = "StageIII")]
    III,
    #[serde(rename = "StageIIIA")]
    IIIA,
    #[serde(rename = "StageIIIB")]
    IIIB,
    #[serde(rename = "StageIIIC")]
    IIIC,
    #[serde(rename = "StageIV")]
    IV,
    #[serde(rename = "StageIVA")]
    IVA,
    #[serde(rename = "StageIVB")]
    IVB,
    #[serde(rename = "StageIVC")]
    IVC,
}

impl Stage {
    pub const ALL: [Stage; 17] = [
        Stage::Zero,
        Stage::I,
        Stage::IA,
        Stage::IB,
        Stage::IC,
        Stage::II,
        Stage::IIA,
        Stage::IIB,
        Stage::IIC,
        Stage::III,
        Stage::IIIA,
        Stage::IIIB,
        Stage::IIIC,
        Stage::IV,
        Stage::IVA,
        Stage::IVB,
        Stage::IVC,
    ];

    /// Canonical identifier, also used as the sheet name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Zero => "Stage0",
            Stage::I => "StageI",
            Stage::IA => "StageIA",
            Stage::IB => "StageIB",
            Stage::IC => "StageIC",
            Stage::II => "StageII",
            Stage::IIA => "StageIIA",
            Stage::IIB => "StageIIB",
            Stage::IIC => "StageIIC",
            Stage::III => "StageIII",
            Stage::IIIA => "StageIIIA",
            Stage::IIIB => "StageIIIB",
            Stage::IIIC => "StageIIIC",
            Stage::IV => "StageIV",
            Stage::IVA => "StageIVA",
            Stage::IVB => "StageIVB",
            Stage::IVC => "StageIVC",
        }
    }

    /// Match a directory name against the stage vocabulary.
    ///
    /// Case-insensitive; spaces, underscores and hyphens are ignored, so
    /// `"Stage IIA"`, `"stage_iia"` and `"StageIIA"` all resolve to
    /// [`Stage::IIA`].
    pub fn from_dir_name(name: &str) -> Option<Stage> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Stage::ALL
            .into_iter()
            .find(|s| s.name().to_ascii_uppercase() == normalized)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Case – one sample directory with its mutation file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub id: String,
    pub maf_path: PathBuf,
}

// ---------------------------------------------------------------------------
// MutationRecord – one row of a MAF file
// ---------------------------------------------------------------------------

/// Column layout of one parsed MAF file, shared by all of its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MafHeader {
    pub columns: Arc<[String]>,
    pub gene_idx: usize,
    pub class_idx: usize,
}

/// A single mutation call. Every source column is kept verbatim; gene and
/// classification are just indexed views into `values`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub stage: Stage,
    pub case_id: Arc<str>,
    header: Arc<MafHeader>,
    values: Vec<String>,
}

impl MutationRecord {
    /// `values` must have exactly one entry per header column.
    pub fn new(stage: Stage, case_id: Arc<str>, header: Arc<MafHeader>, values: Vec<String>) -> Self {
        debug_assert_eq!(values.len(), header.columns.len());
        Self {
            stage,
            case_id,
            header,
            values,
        }
    }

    pub fn gene(&self) -> &str {
        &self.values[self.header.gene_idx]
    }

    pub fn classification(&self) -> &str {
        &self.values[self.header.class_idx]
    }

    /// Value of a named column, `None` if this record's file lacks it.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.header
            .columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }
}

// ---------------------------------------------------------------------------
// StageTable – the finalized per-stage accumulation
// ---------------------------------------------------------------------------

/// Append-only accumulator for one stage. Consumed by [`finish`] to produce
/// the read-only [`StageTable`].
///
/// [`finish`]: StageTableBuilder::finish
#[derive(Debug)]
pub struct StageTableBuilder {
    stage: Stage,
    columns: Vec<String>,
    records: Vec<MutationRecord>,
    cases_used: Vec<String>,
}

impl StageTableBuilder {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            columns: Vec::new(),
            records: Vec::new(),
            cases_used: Vec::new(),
        }
    }

    /// Append one case's filtered rows. The header is merged even when no
    /// row survived filtering, so a stage of all-silent cases still carries
    /// its original columns.
    pub fn append_case(&mut self, case_id: &str, header: &MafHeader, records: Vec<MutationRecord>) {
        for col in header.columns.iter() {
            if !self.columns.contains(col) {
                self.columns.push(col.clone());
            }
        }
        self.cases_used.push(case_id.to_string());
        self.records.extend(records);
    }

    pub fn finish(self) -> StageTable {
        StageTable {
            stage: self.stage,
            columns: self.columns,
            records: self.records,
            cases_used: self.cases_used,
        }
    }
}

/// All retained rows of one stage, in sampler case order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTable {
    stage: Stage,
    columns: Vec<String>,
    records: Vec<MutationRecord>,
    cases_used: Vec<String>,
}

impl StageTable {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Union of source headers in first-seen order; empty if no case parsed.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    /// Cases whose file parsed successfully, in processing order.
    pub fn cases_used(&self) -> &[String] {
        &self.cases_used
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            stage: self.stage,
            count: self.records.len(),
        }
    }
}

/// Retained mutation count for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub count: usize,
}
