use std::collections::BTreeMap;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::Config;
use crate::data::filter::{CodingFilter, FilterStats};
use crate::data::loader::{load_maf, MafOptions};
use crate::data::locator::{locate_cases, CaseIndex};
use crate::data::model::{Case, MafHeader, MutationRecord, Stage, StageSummary, StageTable, StageTableBuilder};
use crate::data::sampler::Sampler;
use crate::error::{CaseIssue, CohortError, CohortResult};

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

/// Everything derived from one run, keyed in canonical stage order.
#[derive(Debug, Clone)]
pub struct CohortReport {
    pub seed: u64,
    pub sampled: BTreeMap<Stage, Vec<Case>>,
    pub tables: BTreeMap<Stage, StageTable>,
    pub filter_stats: BTreeMap<Stage, FilterStats>,
    /// Recovered errors, discovery issues first, then per-stage ones.
    pub issues: Vec<CaseIssue>,
}

impl CohortReport {
    pub fn summaries(&self) -> BTreeMap<Stage, StageSummary> {
        self.tables
            .iter()
            .map(|(stage, table)| (*stage, table.summary()))
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.tables.values().map(StageTable::len).sum()
    }
}

/// Result of parsing and filtering one case.
struct CaseRows {
    header: std::sync::Arc<MafHeader>,
    records: Vec<MutationRecord>,
    stats: FilterStats,
}

// ---------------------------------------------------------------------------
// Stage aggregator
// ---------------------------------------------------------------------------

pub struct Aggregator {
    maf: MafOptions,
    filter: CodingFilter,
    pool: Option<rayon::ThreadPool>,
}

impl Aggregator {
    pub fn new(maf: MafOptions, filter: CodingFilter) -> Self {
        Self {
            maf,
            filter,
            pool: None,
        }
    }

    /// Parse cases on a dedicated pool of `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> CohortResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| CohortError::config(format!("building thread pool: {e}")))?;
        self.pool = Some(pool);
        Ok(self)
    }

    fn process_case(&self, stage: Stage, case: &Case) -> CohortResult<CaseRows> {
        let maf = load_maf(&case.maf_path, stage, &case.id, &self.maf)?;
        if maf.skipped_rows > 0 {
            debug!("{stage}/{}: skipped {} over-long rows", case.id, maf.skipped_rows);
        }
        let (records, stats) = self.filter.apply(maf.records);
        if !stats.unrecognized.is_empty() {
            debug!(
                "{stage}/{}: unrecognised classifications {:?}",
                case.id, stats.unrecognized
            );
        }
        Ok(CaseRows {
            header: maf.header,
            records,
            stats,
        })
    }

    /// Parse, filter and concatenate the sampled cases of one stage.
    ///
    /// Cases may be parsed in parallel; rows are appended in `cases` order.
    /// A case that fails to parse is reported and left out.
    pub fn aggregate_stage(&self, stage: Stage, cases: &[Case]) -> (StageTable, FilterStats, Vec<CaseIssue>) {
        let parse_all = || {
            cases
                .par_iter()
                .map(|case| self.process_case(stage, case))
                .collect::<Vec<_>>()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(parse_all),
            None => parse_all(),
        };

        let mut builder = StageTableBuilder::new(stage);
        let mut stats = FilterStats::default();
        let mut issues = Vec::new();
        for (case, result) in cases.iter().zip(results) {
            match result {
                Ok(rows) => {
                    stats.merge(&rows.stats);
                    builder.append_case(&case.id, &rows.header, rows.records);
                }
                Err(err) => {
                    warn!("{stage}: skipping case {}: {err}", case.id);
                    issues.push(CaseIssue::new(stage, Some(case.id.clone()), err));
                }
            }
        }

        let table = builder.finish();
        if table.cases_used().is_empty() || table.is_empty() {
            let err = CohortError::EmptyStage { stage };
            warn!("{err}; it will be exported with an empty table");
            issues.push(CaseIssue::new(stage, None, err));
        }
        info!(
            "{stage}: {} coding mutations from {} of {} sampled cases ({} rows dropped)",
            table.len(),
            table.cases_used().len(),
            cases.len(),
            stats.dropped_total()
        );
        (table, stats, issues)
    }

    /// Sample every stage of `index` and aggregate it.
    pub fn run(&self, index: CaseIndex, sampler: &mut Sampler, seed: u64) -> CohortReport {
        let sampled = sampler.sample(&index.stages);
        let mut report = CohortReport {
            seed,
            sampled: BTreeMap::new(),
            tables: BTreeMap::new(),
            filter_stats: BTreeMap::new(),
            issues: index.issues,
        };
        for (stage, cases) in sampled {
            let (table, stats, issues) = self.aggregate_stage(stage, &cases);
            report.tables.insert(stage, table);
            report.filter_stats.insert(stage, stats);
            report.issues.extend(issues);
            report.sampled.insert(stage, cases);
        }
        report
    }
}

/// Validate `config`, discover cases, sample and aggregate.
///
/// Returns an error only for configuration-level problems; nothing is
/// written to disk here.
pub fn run_cohort(config: &Config, seed: u64) -> CohortResult<CohortReport> {
    config.validate()?;
    let mut aggregator = Aggregator::new(config.maf_options()?, config.coding_filter()?);
    if let Some(threads) = config.threads {
        aggregator = aggregator.with_threads(threads)?;
    }
    let index = locate_cases(&config.root)?;
    info!(
        "found {} stages with {} usable cases under {}",
        index.stages.len(),
        index.stages.values().map(Vec::len).sum::<usize>(),
        config.root.display()
    );
    let mut sampler = Sampler::new(config.sampling, seed);
    Ok(aggregator.run(index, &mut sampler, seed))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    const HEADER: &str = "Hugo_Symbol\tChromosome\tVariant_Classification\n";

    fn write_case(dir: &Path, rows: &[(&str, &str)]) -> Case {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join("calls.maf");
        let mut text = String::from("#version 2.4\n");
        text.push_str(HEADER);
        for (gene, class) in rows {
            text.push_str(&format!("{gene}\tchr1\t{class}\n"));
        }
        fs::write(&path, text).unwrap();
        Case {
            id: dir.file_name().unwrap().to_string_lossy().into_owned(),
            maf_path: path,
        }
    }

    #[test]
    fn rows_follow_case_order_and_bad_cases_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write_case(&tmp.path().join("A"), &[("TP53", "Missense_Mutation"), ("X", "Silent")]);
        let bad_dir = tmp.path().join("BAD");
        fs::create_dir_all(&bad_dir).unwrap();
        fs::write(bad_dir.join("calls.maf"), "Gene\tClass\nTP53\tSilent\n").unwrap();
        let bad = Case {
            id: "BAD".into(),
            maf_path: bad_dir.join("calls.maf"),
        };
        let c = write_case(
            &tmp.path().join("C"),
            &[("KRAS", "Missense_Mutation"), ("EGFR", "In_Frame_Del")],
        );

        let aggregator = Aggregator::new(MafOptions::default(), CodingFilter::default())
            .with_threads(3)
            .unwrap();
        let (table, stats, issues) = aggregator.aggregate_stage(Stage::I, &[a, bad, c]);

        let genes: Vec<&str> = table.records().iter().map(|r| r.gene()).collect();
        assert_eq!(genes, vec!["TP53", "KRAS", "EGFR"]);
        let cases: Vec<&str> = table.records().iter().map(|r| &*r.case_id).collect();
        assert_eq!(cases, vec!["A", "C", "C"]);
        assert_eq!(table.cases_used(), &["A", "C"]);
        assert_eq!(stats.kept, 3);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].case_id.as_deref(), Some("BAD"));
        assert!(matches!(issues[0].error, CohortError::MalformedInput { .. }));
    }

    #[test]
    fn stage_without_cases_is_flagged_but_kept() {
        let aggregator = Aggregator::new(MafOptions::default(), CodingFilter::default());
        let (table, _, issues) = aggregator.aggregate_stage(Stage::III, &[]);
        assert!(table.is_empty());
        assert_eq!(table.summary().count, 0);
        assert_eq!(issues, vec![CaseIssue::new(Stage::III, None, CohortError::EmptyStage { stage: Stage::III })]);
    }

    #[test]
    fn run_cohort_rejects_missing_root() {
        let config = Config {
            root: "/no/such/cohort".into(),
            ..Config::default()
        };
        assert!(matches!(
            run_cohort(&config, 1),
            Err(CohortError::Configuration(_))
        ));
    }
}
