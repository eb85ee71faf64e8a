use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::model::{MafHeader, MutationRecord, Stage};
use crate::error::{CohortError, CohortResult};

pub const GENE_COLUMN: &str = "Hugo_Symbol";
pub const CLASS_COLUMN: &str = "Variant_Classification";

// ---------------------------------------------------------------------------
// Parse options and output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MafOptions {
    /// Lines starting with this byte are ignored.
    pub comment: u8,
}

impl Default for MafOptions {
    fn default() -> Self {
        Self { comment: b'#' }
    }
}

/// One parsed MAF file.
#[derive(Debug, Clone)]
pub struct MafFile {
    pub header: Arc<MafHeader>,
    pub records: Vec<MutationRecord>,
    /// Rows with more fields than the header, skipped.
    pub skipped_rows: usize,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse a MAF file from disk. The file handle lives only for this call.
pub fn load_maf(path: &Path, stage: Stage, case_id: &str, opts: &MafOptions) -> CohortResult<MafFile> {
    let file = std::fs::File::open(path)
        .map_err(|e| CohortError::malformed(path, format!("cannot open: {e}")))?;
    read_maf(file, stage, case_id, opts).map_err(|reason| CohortError::malformed(path, reason))
}

/// Tab-separated layout:
///
/// ```text
/// #version 2.4
/// Hugo_Symbol  Chromosome  Start_Position  Variant_Classification  ...
/// TP53         chr17       7675088         Missense_Mutation       ...
/// ```
///
/// Only `Hugo_Symbol` and `Variant_Classification` are required; every other
/// column is carried through untouched.
pub fn read_maf<R: Read>(
    reader: R,
    stage: Stage,
    case_id: &str,
    opts: &MafOptions,
) -> Result<MafFile, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(opts.comment))
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let columns: Arc<[String]> = reader
        .headers()
        .map_err(|e| format!("reading header: {e}"))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let gene_idx = column_index(&columns, GENE_COLUMN)?;
    let class_idx = column_index(&columns, CLASS_COLUMN)?;
    let header = Arc::new(MafHeader {
        columns,
        gene_idx,
        class_idx,
    });
    let width = header.columns.len();
    let case_id: Arc<str> = Arc::from(case_id);

    let mut records = Vec::new();
    let mut skipped_rows = 0;

    for (row_no, result) in reader.records().enumerate() {
        let row = result.map_err(|e| format!("row {}: {e}", row_no + 1))?;
        if row.len() > width {
            debug!(
                "{case_id}: row {} has {} fields but header has {width}, skipping",
                row_no + 1,
                row.len()
            );
            skipped_rows += 1;
            continue;
        }
        let mut values: Vec<String> = row.iter().map(str::to_string).collect();
        values.resize(width, String::new());
        records.push(MutationRecord::new(stage, case_id.clone(), header.clone(), values));
    }

    Ok(MafFile {
        header,
        records,
        skipped_rows,
    })
}

fn column_index(columns: &[String], name: &str) -> Result<usize, String> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| format!("missing required column '{name}'"))
}
