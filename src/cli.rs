use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};

use stage_maf::data::sampler::SamplingPolicy;
use stage_maf::Config;

pub fn build_cli() -> Command {
    Command::new("stage-maf")
        .about("Extract coding mutations per AJCC stage from a MAF cohort")
        .long_about(
            "Walks ROOT/<Stage>/<Case>/*.maf, samples up to K cases per stage, keeps \
             protein-altering variant classes and writes a workbook (one sheet per stage \
             plus a combined sheet) and a stage-wise mutation frequency chart.",
        )
        .version(env!("CARGO_PKG_VERSION"))
        .arg(Arg::new("root")
            .value_name("ROOT")
            .help("Cohort root containing one directory per stage")
            .value_parser(clap::value_parser!(PathBuf))
            .index(1))
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("JSON configuration file; command line options take precedence")
            .value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("sample_size")
            .short('k')
            .long("sample-size")
            .value_name("K")
            .help("Cases sampled per stage (default: 4)")
            .value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("all_cases")
            .long("all-cases")
            .help("Use every case of every stage instead of a random sample")
            .action(ArgAction::SetTrue)
            .conflicts_with("sample_size"))
        .arg(Arg::new("seed")
            .short('s')
            .long("seed")
            .value_name("SEED")
            .help("Sampling seed; a random one is drawn and logged when omitted")
            .value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("workbook")
            .short('o')
            .long("workbook")
            .value_name("FILE")
            .help("Output workbook (.xlsx)")
            .value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("chart")
            .long("chart")
            .value_name("FILE")
            .help("Output chart (.svg)")
            .value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("summary")
            .long("summary")
            .value_name("FILE")
            .help("Optional JSON run summary")
            .value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("classes")
            .long("classes")
            .value_name("LIST")
            .help("Comma-separated Variant_Classification values to keep")
            .value_delimiter(',')
            .action(ArgAction::Append))
        .arg(Arg::new("comment_char")
            .long("comment-char")
            .value_name("CHAR")
            .help("Comment line prefix in MAF files (default: #)")
            .value_parser(clap::value_parser!(char)))
        .arg(Arg::new("threads")
            .short('t')
            .long("threads")
            .value_name("NUMBER")
            .help("Worker threads for case parsing")
            .value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Log per-file details")
            .action(ArgAction::SetTrue))
}

/// Merge command line options over the config file (or defaults).
pub fn config_from_matches(matches: &ArgMatches) -> Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(root) = matches.get_one::<PathBuf>("root") {
        config.root = root.clone();
    }
    if matches.get_flag("all_cases") {
        config.sampling = SamplingPolicy::All;
    } else if let Some(size) = matches.get_one::<usize>("sample_size") {
        config.sampling = SamplingPolicy::Random { size: *size };
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = Some(*seed);
    }
    if let Some(path) = matches.get_one::<PathBuf>("workbook") {
        config.workbook = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("chart") {
        config.chart = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("summary") {
        config.summary = Some(path.clone());
    }
    if let Some(classes) = matches.get_many::<String>("classes") {
        config.coding_classes = classes.map(|c| c.trim().to_string()).collect();
    }
    if let Some(c) = matches.get_one::<char>("comment_char") {
        config.comment_char = *c;
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = Some(*threads);
    }
    Ok(config)
}
