use std::collections::BTreeMap;

use log::warn;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::model::{Case, Stage};

pub const DEFAULT_SAMPLE_SIZE: usize = 4;

/// How many cases of each stage enter the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SamplingPolicy {
    /// Uniform draw without replacement of at most `size` cases.
    Random { size: usize },
    /// Every discovered case.
    All,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::Random {
            size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Seeded case sampler. Stages are drawn in canonical order from a single
/// stream, so a given seed and case index always give the same selection.
#[derive(Debug, Clone)]
pub struct Sampler {
    policy: SamplingPolicy,
    rng: StdRng,
}

impl Sampler {
    pub fn new(policy: SamplingPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Select cases for one stage. The result keeps the input order.
    pub fn sample_stage(&mut self, stage: Stage, cases: &[Case]) -> Vec<Case> {
        let size = match self.policy {
            SamplingPolicy::All => return cases.to_vec(),
            SamplingPolicy::Random { size } => size,
        };
        if cases.len() <= size {
            if cases.len() < size {
                warn!(
                    "{stage}: only {} cases available, {size} requested; using all",
                    cases.len()
                );
            }
            return cases.to_vec();
        }
        let mut picked = index::sample(&mut self.rng, cases.len(), size).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| cases[i].clone()).collect()
    }

    pub fn sample(&mut self, stages: &BTreeMap<Stage, Vec<Case>>) -> BTreeMap<Stage, Vec<Case>> {
        stages
            .iter()
            .map(|(stage, cases)| (*stage, self.sample_stage(*stage, cases)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn cases(n: usize) -> Vec<Case> {
        (0..n)
            .map(|i| Case {
                id: format!("CASE-{i:02}"),
                maf_path: PathBuf::from(format!("/cohort/CASE-{i:02}/x.maf")),
            })
            .collect()
    }

    #[test]
    fn sample_size_is_min_of_k_and_available() {
        for available in [0, 1, 3, 4, 5, 12] {
            let mut sampler = Sampler::new(SamplingPolicy::Random { size: 4 }, 7);
            let picked = sampler.sample_stage(Stage::I, &cases(available));
            assert_eq!(picked.len(), available.min(4));
        }
    }

    #[test]
    fn draws_without_replacement_in_input_order() {
        let pool = cases(20);
        let mut sampler = Sampler::new(SamplingPolicy::Random { size: 6 }, 99);
        let picked = sampler.sample_stage(Stage::II, &pool);
        let ids: Vec<&str> = picked.iter().map(|c| c.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert!(picked.iter().all(|c| pool.contains(c)));
    }

    #[test]
    fn same_seed_same_selection() {
        let mut stages = BTreeMap::new();
        stages.insert(Stage::I, cases(10));
        stages.insert(Stage::III, cases(8));
        let a = Sampler::new(SamplingPolicy::default(), 42).sample(&stages);
        let b = Sampler::new(SamplingPolicy::default(), 42).sample(&stages);
        assert_eq!(a, b);
    }

    #[test]
    fn exhaustive_policy_keeps_everything() {
        let pool = cases(9);
        let picked = Sampler::new(SamplingPolicy::All, 1).sample_stage(Stage::IV, &pool);
        assert_eq!(picked, pool);
    }
}
