use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::MutationRecord;

// ---------------------------------------------------------------------------
// VariantClass – the MAF Variant_Classification vocabulary
// ---------------------------------------------------------------------------

/// Recognised values of the `Variant_Classification` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantClass {
    MissenseMutation,
    NonsenseMutation,
    FrameShiftIns,
    FrameShiftDel,
    InFrameIns,
    InFrameDel,
    SpliceSite,
    NonstopMutation,
    TranslationStartSite,
    Silent,
    Intron,
    ThreePrimeUtr,
    FivePrimeUtr,
    Igr,
    ThreePrimeFlank,
    FivePrimeFlank,
    Rna,
    LincRna,
    SpliceRegion,
    TargetedRegion,
    DeNovoStartInFrame,
    DeNovoStartOutOfFrame,
}

impl VariantClass {
    pub const ALL: [VariantClass; 22] = [
        VariantClass::MissenseMutation,
        VariantClass::NonsenseMutation,
        VariantClass::FrameShiftIns,
        VariantClass::FrameShiftDel,
        VariantClass::InFrameIns,
        VariantClass::InFrameDel,
        VariantClass::SpliceSite,
        VariantClass::NonstopMutation,
        VariantClass::TranslationStartSite,
        VariantClass::Silent,
        VariantClass::Intron,
        VariantClass::ThreePrimeUtr,
        VariantClass::FivePrimeUtr,
        VariantClass::Igr,
        VariantClass::ThreePrimeFlank,
        VariantClass::FivePrimeFlank,
        VariantClass::Rna,
        VariantClass::LincRna,
        VariantClass::SpliceRegion,
        VariantClass::TargetedRegion,
        VariantClass::DeNovoStartInFrame,
        VariantClass::DeNovoStartOutOfFrame,
    ];

    /// Protein-altering classes. Edit this list to change the default
    /// allow-set.
    pub const CODING: [VariantClass; 9] = [
        VariantClass::MissenseMutation,
        VariantClass::NonsenseMutation,
        VariantClass::FrameShiftIns,
        VariantClass::FrameShiftDel,
        VariantClass::InFrameIns,
        VariantClass::InFrameDel,
        VariantClass::SpliceSite,
        VariantClass::NonstopMutation,
        VariantClass::TranslationStartSite,
    ];

    /// Exact MAF spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            VariantClass::MissenseMutation => "Missense_Mutation",
            VariantClass::NonsenseMutation => "Nonsense_Mutation",
            VariantClass::FrameShiftIns => "Frame_Shift_Ins",
            VariantClass::FrameShiftDel => "Frame_Shift_Del",
            VariantClass::InFrameIns => "In_Frame_Ins",
            VariantClass::InFrameDel => "In_Frame_Del",
            VariantClass::SpliceSite => "Splice_Site",
            VariantClass::NonstopMutation => "Nonstop_Mutation",
            VariantClass::TranslationStartSite => "Translation_Start_Site",
            VariantClass::Silent => "Silent",
            VariantClass::Intron => "Intron",
            VariantClass::ThreePrimeUtr => "3'UTR",
            VariantClass::FivePrimeUtr => "5'UTR",
            VariantClass::Igr => "IGR",
            VariantClass::ThreePrimeFlank => "3'Flank",
            VariantClass::FivePrimeFlank => "5'Flank",
            VariantClass::Rna => "RNA",
            VariantClass::LincRna => "lincRNA",
            VariantClass::SpliceRegion => "Splice_Region",
            VariantClass::TargetedRegion => "Targeted_Region",
            VariantClass::DeNovoStartInFrame => "De_novo_Start_InFrame",
            VariantClass::DeNovoStartOutOfFrame => "De_novo_Start_OutOfFrame",
        }
    }
}

impl fmt::Display for VariantClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown variant classification '{0}'")]
pub struct UnknownVariantClass(pub String);

/// Exact-string match; MAF classifications are case-sensitive.
impl FromStr for VariantClass {
    type Err = UnknownVariantClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VariantClass::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariantClass(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Filter statistics
// ---------------------------------------------------------------------------

/// Counts of what the filter kept and dropped, mergeable across cases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub kept: usize,
    /// Recognised but outside the allow-set, keyed by MAF spelling.
    pub dropped: BTreeMap<String, usize>,
    /// Strings that are not part of the classification vocabulary.
    pub unrecognized: BTreeMap<String, usize>,
}

impl FilterStats {
    pub fn merge(&mut self, other: &FilterStats) {
        self.kept += other.kept;
        for (k, v) in &other.dropped {
            *self.dropped.entry(k.clone()).or_default() += v;
        }
        for (k, v) in &other.unrecognized {
            *self.unrecognized.entry(k.clone()).or_default() += v;
        }
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum::<usize>() + self.unrecognized.values().sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// CodingFilter – the allow-set predicate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingFilter {
    allowed: BTreeSet<VariantClass>,
}

impl Default for CodingFilter {
    fn default() -> Self {
        Self::new(VariantClass::CODING)
    }
}

impl CodingFilter {
    pub fn new(allowed: impl IntoIterator<Item = VariantClass>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn accepts(&self, classification: &str) -> bool {
        classification
            .parse::<VariantClass>()
            .map(|c| self.allowed.contains(&c))
            .unwrap_or(false)
    }

    /// Keep records whose classification is in the allow-set, preserving
    /// their relative order.
    pub fn apply(&self, records: Vec<MutationRecord>) -> (Vec<MutationRecord>, FilterStats) {
        let mut stats = FilterStats::default();
        let kept: Vec<MutationRecord> = records
            .into_iter()
            .filter(|rec| match rec.classification().parse::<VariantClass>() {
                Ok(class) if self.allowed.contains(&class) => true,
                Ok(class) => {
                    *stats.dropped.entry(class.as_str().to_string()).or_default() += 1;
                    false
                }
                Err(UnknownVariantClass(raw)) => {
                    *stats.unrecognized.entry(raw).or_default() += 1;
                    false
                }
            })
            .collect();
        stats.kept = kept.len();
        (kept, stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::model::{MafHeader, Stage};

    fn records(classes: &[&str]) -> Vec<MutationRecord> {
        let header = Arc::new(MafHeader {
            columns: Arc::from(vec!["Hugo_Symbol".to_string(), "Variant_Classification".to_string()]),
            gene_idx: 0,
            class_idx: 1,
        });
        classes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                MutationRecord::new(
                    Stage::I,
                    Arc::from("A"),
                    header.clone(),
                    vec![format!("GENE{i}"), c.to_string()],
                )
            })
            .collect()
    }

    #[test]
    fn vocabulary_spellings_parse_back() {
        for class in VariantClass::ALL {
            assert_eq!(class.as_str().parse::<VariantClass>(), Ok(class));
        }
        let err = "missense_mutation".parse::<VariantClass>().unwrap_err();
        assert_eq!(err.to_string(), "unknown variant classification 'missense_mutation'");
    }

    #[test]
    fn default_allow_set_is_coding_only() {
        let filter = CodingFilter::default();
        for class in VariantClass::CODING {
            assert!(filter.accepts(class.as_str()));
        }
        for rejected in ["Silent", "Intron", "3'UTR", "5'Flank", "IGR", "Splice_Region"] {
            assert!(!filter.accepts(rejected), "{rejected} should be dropped");
        }
    }

    #[test]
    fn apply_is_stable_and_counts_drops() {
        let input = records(&[
            "Silent",
            "Missense_Mutation",
            "Intron",
            "Frame_Shift_Del",
            "Mystery_Class",
            "Nonsense_Mutation",
            "Silent",
        ]);
        let (kept, stats) = CodingFilter::default().apply(input);
        let genes: Vec<&str> = kept.iter().map(|r| r.gene()).collect();
        assert_eq!(genes, vec!["GENE1", "GENE3", "GENE5"]);
        assert_eq!(stats.kept, 3);
        assert_eq!(stats.dropped.get("Silent"), Some(&2));
        assert_eq!(stats.dropped.get("Intron"), Some(&1));
        assert_eq!(stats.unrecognized.get("Mystery_Class"), Some(&1));
        assert_eq!(stats.dropped_total(), 4);
    }

    #[test]
    fn custom_allow_set_overrides_default() {
        let filter = CodingFilter::new([VariantClass::Silent]);
        let (kept, _) = filter.apply(records(&["Silent", "Missense_Mutation"]));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].classification(), "Silent");
    }

    #[test]
    fn stats_merge_accumulates() {
        let (_, mut a) = CodingFilter::default().apply(records(&["Silent", "Missense_Mutation"]));
        let (_, b) = CodingFilter::default().apply(records(&["Silent", "Weird"]));
        a.merge(&b);
        assert_eq!(a.kept, 1);
        assert_eq!(a.dropped.get("Silent"), Some(&2));
        assert_eq!(a.unrecognized.get("Weird"), Some(&1));
    }
}
