use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use stage_maf::data::filter::{CodingFilter, VariantClass};
use stage_maf::data::model::Stage;
use stage_maf::data::sampler::SamplingPolicy;
use stage_maf::export::chart::{render_scatter_svg, ChartConfig};
use stage_maf::export::export_all;
use stage_maf::export::workbook::{cohort_sheets, COMBINED_SHEET};
use stage_maf::export::summary::RunSummary;
use stage_maf::{run_cohort, CohortError, Config};

const HEADER: &str = "Hugo_Symbol\tChromosome\tStart_Position\tVariant_Classification\tTumor_Sample_Barcode\n";

/// Write a MAF with `coding` missense rows interleaved with `noncoding`
/// silent/intron rows.
fn write_maf(path: &Path, case_id: &str, coding: usize, noncoding: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = String::from("#version 2.4\n");
    text.push_str(HEADER);
    let total = coding + noncoding;
    let (mut c, mut n) = (0, 0);
    for i in 0..total {
        let class = if (i % 2 == 0 && c < coding) || n >= noncoding {
            c += 1;
            "Missense_Mutation"
        } else {
            n += 1;
            if n % 2 == 0 { "Intron" } else { "Silent" }
        };
        text.push_str(&format!("GENE{i}\tchr1\t{}\t{class}\t{case_id}\n", 1000 + i));
    }
    fs::write(path, text).unwrap();
}

/// StageI: A (10 rows, 3 coding), B (0 rows), C (5 rows, 2 coding).
/// StageII: D (8 rows, 4 coding).
fn scenario_cohort(root: &Path) {
    write_maf(&root.join("StageI/A/a.maf"), "A", 3, 7);
    write_maf(&root.join("StageI/B/nested/b.maf"), "B", 0, 0);
    write_maf(&root.join("StageI/C/c.maf"), "C", 2, 3);
    write_maf(&root.join("StageII/D/d.maf"), "D", 4, 4);
}

fn config(root: &Path, out: &Path) -> Config {
    Config {
        root: root.to_path_buf(),
        sampling: SamplingPolicy::Random { size: 4 },
        seed: Some(7),
        workbook: out.join("cohort.xlsx"),
        chart: out.join("cohort.svg"),
        summary: Some(out.join("summary.json")),
        ..Config::default()
    }
}

fn counts(report: &stage_maf::CohortReport) -> BTreeMap<Stage, usize> {
    report
        .summaries()
        .into_iter()
        .map(|(stage, s)| (stage, s.count))
        .collect()
}

#[test]
fn scenario_counts_per_stage() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    scenario_cohort(cohort.path());

    let report = run_cohort(&config(cohort.path(), out.path()), 7).expect("run");

    let stage1: Vec<&str> = report.sampled[&Stage::I].iter().map(|c| c.id.as_str()).collect();
    assert_eq!(stage1, vec!["A", "B", "C"]);
    assert_eq!(report.sampled[&Stage::II].len(), 1);

    let table = &report.tables[&Stage::I];
    let per_case: Vec<&str> = table.records().iter().map(|r| &*r.case_id).collect();
    assert_eq!(per_case, vec!["A", "A", "A", "C", "C"]);

    assert_eq!(counts(&report), BTreeMap::from([(Stage::I, 5), (Stage::II, 4)]));
    assert_eq!(report.total_records(), 9);
    assert!(report.issues.is_empty(), "{:?}", report.issues);

    let sheets = cohort_sheets(&report.tables);
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["StageI", "StageII", COMBINED_SHEET]);
    assert_eq!(sheets[0].rows.len(), 5);
    assert_eq!(sheets[1].rows.len(), 4);
    let combined = &sheets[2];
    assert_eq!(combined.rows.len(), 9);
    let stage_col: Vec<&str> = combined.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(stage_col.iter().filter(|s| **s == "StageI").count(), 5);
    assert_eq!(stage_col.iter().filter(|s| **s == "StageII").count(), 4);

    let svg = render_scatter_svg(&report.summaries(), &ChartConfig::default());
    let points: Vec<&str> = svg
        .match_indices("<title>")
        .map(|(i, _)| {
            let rest = &svg[i + "<title>".len()..];
            &rest[..rest.find("</title>").unwrap()]
        })
        .collect();
    assert_eq!(points, vec!["StageI: 5", "StageII: 4"]);
}

#[test]
fn filtered_rows_are_coding_and_in_file_order() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    scenario_cohort(cohort.path());

    let report = run_cohort(&config(cohort.path(), out.path()), 3).expect("run");
    let filter = CodingFilter::default();
    for table in report.tables.values() {
        for rec in table.records() {
            assert!(filter.accepts(rec.classification()));
            assert!(VariantClass::CODING
                .iter()
                .any(|c| c.as_str() == rec.classification()));
        }
    }
    let positions: Vec<u64> = report.tables[&Stage::I]
        .records()
        .iter()
        .filter(|r| &*r.case_id == "A")
        .map(|r| r.get("Start_Position").unwrap().parse().unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
}

#[test]
fn ambiguous_case_is_skipped_and_stage_continues() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    write_maf(&cohort.path().join("StageIII/E/one.maf"), "E", 2, 1);
    write_maf(&cohort.path().join("StageIII/E/two.maf"), "E", 2, 1);
    write_maf(&cohort.path().join("StageIII/F/f.maf"), "F", 3, 0);

    let report = run_cohort(&config(cohort.path(), out.path()), 1).expect("run");
    assert_eq!(report.tables[&Stage::III].len(), 3);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].case_id.as_deref(), Some("E"));
    assert!(matches!(
        report.issues[0].error,
        CohortError::AmbiguousCase { found: 2, .. }
    ));
}

#[test]
fn malformed_file_does_not_drop_stage() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    let bad = cohort.path().join("StageII/BAD/bad.maf");
    fs::create_dir_all(bad.parent().unwrap()).unwrap();
    fs::write(&bad, "Hugo_Symbol\tChromosome\nTP53\tchr17\n").unwrap();
    write_maf(&cohort.path().join("StageII/GOOD/good.maf"), "GOOD", 2, 2);

    let report = run_cohort(&config(cohort.path(), out.path()), 1).expect("run");
    assert_eq!(report.tables[&Stage::II].len(), 2);
    assert!(report
        .issues
        .iter()
        .any(|i| matches!(&i.error, CohortError::MalformedInput { path, .. } if path == &bad)));
}

#[test]
fn empty_stage_is_exported_with_zero_count() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    scenario_cohort(cohort.path());
    fs::create_dir_all(cohort.path().join("StageIV")).unwrap();

    let cfg = config(cohort.path(), out.path());
    let report = run_cohort(&cfg, 7).expect("run");
    assert_eq!(report.summaries()[&Stage::IV].count, 0);
    assert!(report
        .issues
        .iter()
        .any(|i| i.error == CohortError::EmptyStage { stage: Stage::IV }));

    export_all(&report, &cfg).expect("export");

    let file = fs::File::open(&cfg.workbook).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .unwrap()
        .read_to_string(&mut workbook)
        .unwrap();
    for name in ["StageI", "StageII", "StageIV", "All_Stages"] {
        assert!(workbook.contains(&format!("name=\"{name}\"")), "missing sheet {name}");
    }

    let mut stage4 = String::new();
    archive
        .by_name("xl/worksheets/sheet3.xml")
        .unwrap()
        .read_to_string(&mut stage4)
        .unwrap();
    assert!(stage4.contains("Hugo_Symbol"));
    assert!(!stage4.contains("<row r=\"2\">"));

    let svg = fs::read_to_string(&cfg.chart).unwrap();
    assert_eq!(svg.matches("<circle").count(), 3);
    assert!(svg.contains("<title>StageIV: 0</title>"));
}

#[test]
fn same_seed_gives_identical_outputs() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    for stage in ["StageI", "StageIIB"] {
        for i in 0..9 {
            let id = format!("CASE{i}");
            write_maf(&cohort.path().join(stage).join(&id).join("x.maf"), &id, i % 4, 3);
        }
    }
    let run = |out: &Path| {
        let cfg = config(cohort.path(), out);
        let report = run_cohort(&cfg, 2024).expect("run");
        export_all(&report, &cfg).expect("export");
        (report, fs::read(&cfg.workbook).unwrap(), fs::read(&cfg.chart).unwrap())
    };
    let out_a = tempfile::tempdir().expect("tmp dir");
    let out_b = tempfile::tempdir().expect("tmp dir");
    let (first, wb_a, chart_a) = run(out_a.path());
    let (second, wb_b, chart_b) = run(out_b.path());

    assert_eq!(first.tables, second.tables);
    assert_eq!(first.sampled, second.sampled);
    assert_eq!(wb_a, wb_b);
    assert_eq!(chart_a, chart_b);
    for cases in first.sampled.values() {
        assert_eq!(cases.len(), 4);
    }
}

#[test]
fn summary_totals_match_coding_rows() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    scenario_cohort(cohort.path());
    let cfg = config(cohort.path(), out.path());
    let report = run_cohort(&cfg, 9).expect("run");
    export_all(&report, &cfg).expect("export");

    let text = fs::read_to_string(cfg.summary.as_ref().unwrap()).unwrap();
    let summary: RunSummary = serde_json::from_str(&text).unwrap();
    assert_eq!(summary.seed, 9);
    assert_eq!(summary.total_records, 9);
    let per_stage: usize = summary.stages.iter().map(|s| s.count).sum();
    assert_eq!(per_stage, summary.total_records);
    let stage1 = &summary.stages[0];
    assert_eq!(stage1.stage, Stage::I);
    assert_eq!(stage1.filter.kept, 5);
    assert_eq!(stage1.filter.dropped_total(), 10);
}

#[test]
fn custom_class_set_and_exhaustive_sampling() {
    let cohort = tempfile::tempdir().expect("tmp dir");
    let out = tempfile::tempdir().expect("tmp dir");
    for i in 0..6 {
        let id = format!("S{i}");
        write_maf(&cohort.path().join("Stage I").join(&id).join("s.maf"), &id, 1, 2);
    }
    let cfg = Config {
        sampling: SamplingPolicy::All,
        coding_classes: vec!["Silent".into(), "Intron".into()],
        ..config(cohort.path(), out.path())
    };
    let report = run_cohort(&cfg, 0).expect("run");
    assert_eq!(report.sampled[&Stage::I].len(), 6);
    assert_eq!(report.tables[&Stage::I].len(), 12);
}

#[test]
fn missing_root_aborts_before_output() {
    let out = tempfile::tempdir().expect("tmp dir");
    let cfg = config(&PathBuf::from("/no/such/cohort"), out.path());
    let err = run_cohort(&cfg, 1).unwrap_err();
    assert!(matches!(err, CohortError::Configuration(_)));
    assert!(!cfg.workbook.exists());
    assert!(!cfg.chart.exists());
}
