use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const GENES: [(&str, &str, u64); 8] = [
    ("TP53", "chr17", 7_668_402),
    ("KRAS", "chr12", 25_205_246),
    ("PIK3CA", "chr3", 179_148_114),
    ("EGFR", "chr7", 55_019_017),
    ("APC", "chr5", 112_707_498),
    ("PTEN", "chr10", 87_863_113),
    ("BRAF", "chr7", 140_719_327),
    ("CDKN2A", "chr9", 21_967_752),
];

/// Weighted towards non-coding calls, as in real WXS output.
const CLASSES: [(&str, u32); 12] = [
    ("Missense_Mutation", 30),
    ("Nonsense_Mutation", 5),
    ("Frame_Shift_Del", 4),
    ("Frame_Shift_Ins", 2),
    ("In_Frame_Del", 2),
    ("Splice_Site", 3),
    ("Silent", 20),
    ("Intron", 15),
    ("3'UTR", 8),
    ("5'Flank", 5),
    ("IGR", 5),
    ("RNA", 1),
];

const STAGES: [(&str, usize); 4] = [("StageI", 6), ("StageII", 5), ("StageIII", 3), ("StageIV", 2)];

fn pick_class(rng: &mut StdRng) -> &'static str {
    let total: u32 = CLASSES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (name, weight) in CLASSES {
        if roll < weight {
            return name;
        }
        roll -= weight;
    }
    CLASSES[0].0
}

fn barcode(rng: &mut StdRng) -> String {
    const SITES: [&str; 4] = ["A1", "B6", "E2", "GM"];
    let site = SITES.choose(rng).copied().unwrap_or("A1");
    format!("TCGA-{site}-{:04X}", rng.gen_range(0..0xFFFFu32))
}

fn maf_text(rng: &mut StdRng, case_id: &str, n_rows: usize) -> String {
    let mut text = String::from("#version 2.4\n#synthetic cohort, not real patient data\n");
    text.push_str(
        "Hugo_Symbol\tChromosome\tStart_Position\tEnd_Position\tVariant_Classification\t\
         Reference_Allele\tTumor_Seq_Allele2\tTumor_Sample_Barcode\tt_depth\tt_alt_count\n",
    );
    for _ in 0..n_rows {
        let (gene, chrom, base) = GENES.choose(rng).copied().unwrap_or(GENES[0]);
        let pos = base + rng.gen_range(0..20_000);
        let bases = ["A", "C", "G", "T"];
        let reference = bases.choose(rng).copied().unwrap_or("A");
        let alt = bases.choose(rng).copied().unwrap_or("T");
        let depth: u32 = rng.gen_range(20..400);
        let alt_count = rng.gen_range(3..=depth / 2);
        let _ = writeln!(
            text,
            "{gene}\t{chrom}\t{pos}\t{pos}\t{}\t{reference}\t{alt}\t{case_id}\t{depth}\t{alt_count}",
            pick_class(rng)
        );
    }
    text
}

fn main() -> Result<()> {
    let matches = Command::new("generate_sample")
        .about("Write a synthetic stage-partitioned MAF cohort")
        .arg(Arg::new("out")
            .short('o')
            .long("out")
            .value_name("DIR")
            .default_value("grade_generalised")
            .value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("seed")
            .short('s')
            .long("seed")
            .value_name("SEED")
            .default_value("42")
            .value_parser(clap::value_parser!(u64)))
        .get_matches();

    let out = matches
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("grade_generalised"));
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(42);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut used = HashSet::new();
    for (stage, cases) in STAGES {
        for _ in 0..cases {
            let case_id = loop {
                let id = barcode(&mut rng);
                if used.insert(id.clone()) {
                    break id;
                }
            };
            // GDC downloads nest the MAF one level below the case directory.
            let file_dir = out.join(stage).join(&case_id).join(format!("{:08x}", rng.gen::<u32>()));
            std::fs::create_dir_all(&file_dir)
                .with_context(|| format!("creating {}", file_dir.display()))?;
            let n_rows = rng.gen_range(0..60);
            let path = file_dir.join(format!("{case_id}.wxs.somatic.maf"));
            std::fs::write(&path, maf_text(&mut rng, &case_id, n_rows))
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    println!("Wrote {} cases across {} stages to {}", used.len(), STAGES.len(), out.display());
    Ok(())
}
