//! Stage-wise extraction of coding somatic mutations from MAF cohorts.
//!
//! A cohort root holds one directory per AJCC stage, one directory per case
//! below that, and one `.maf` file per case. [`pipeline::run_cohort`] finds
//! the cases, samples a bounded number per stage, keeps coding variant calls
//! and aggregates them per stage; [`export`] turns the result into a
//! workbook, a chart and an optional JSON summary.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;

pub use config::Config;
pub use error::{CaseIssue, CohortError, CohortResult};
pub use pipeline::{run_cohort, CohortReport};
