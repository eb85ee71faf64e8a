/// Data layer: discovery, sampling, parsing and filtering.
///
/// Architecture:
/// ```text
///  root/<Stage>/<Case>/…/*.maf
///        │
///        ▼
///   ┌──────────┐
///   │ locator  │  walk stage and case dirs → Stage → [Case]
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ sampler  │  seeded draw of ≤ K cases per stage
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse MAF → [MutationRecord]
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  keep coding variant classes
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod locator;
pub mod model;
pub mod sampler;
