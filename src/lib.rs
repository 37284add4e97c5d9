//! # Li-Stephens Library
//!
//! Haplotype-copying inference for haploid and diploid queries against a
//! reference panel: scaled forward/backward, Viterbi decoding with diploid
//! phasing, and exact path scoring.
//!
//! ## Modules
//! - `config`: Scaling, Viterbi memory mode and batch threading
//! - `data`: Reference panel, queries and haplotype index types
//! - `error`: Error types and result aliases
//! - `model`: Emission/transition models and the recursions
//! - `pipelines`: Validation, ploidy dispatch and batch evaluation
//! - `utils`: Shared utilities (thread pool, workspace buffers)
//!
//! ## Example
//! ```
//! use listephens::{viterbi, EmissionTable, HapIdx, Query, ReferencePanel, StatePath};
//!
//! // Two haplotypes: all-0 and all-1.
//! let panel = ReferencePanel::from_rows(&[vec![0, 1], vec![0, 1], vec![0, 1]]).unwrap();
//! let emissions = EmissionTable::haploid(&[[1e-8, 1.0 - 1e-8]; 3]);
//! let recomb = [0.0, 1e-4, 1e-4];
//! let query = Query::haploid(vec![0, 0, 1]);
//!
//! let best = viterbi(&panel, &query, &emissions, &recomb).unwrap();
//! assert_eq!(best.path, StatePath::Haploid(vec![HapIdx(0), HapIdx(0), HapIdx(1)]));
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pipelines;
pub mod utils;

// Re-export commonly used types
pub use config::{InferenceConfig, Scaling, ViterbiMemory};
pub use data::{Genotype, HapIdx, HapPair, Ploidy, Query, ReferencePanel, StatePath, MISSING};
pub use error::{LsError, Result};
pub use model::emission::{DiploidCategory, EmissionTable};
pub use model::forward::ForwardResult;
pub use model::matrix::ProbMatrix;
pub use pipelines::{Inference, ViterbiPath};

/// Forward pass with the default configuration
pub fn forward(
    panel: &ReferencePanel,
    query: &Query,
    emissions: &EmissionTable,
    recomb: &[f64],
) -> Result<ForwardResult> {
    Inference::default().forward(panel, query, emissions, recomb)
}

/// Backward pass reusing `scale` from a forward pass
pub fn backward(
    panel: &ReferencePanel,
    query: &Query,
    emissions: &EmissionTable,
    scale: &[f64],
    recomb: &[f64],
) -> Result<ProbMatrix> {
    Inference::default().backward(panel, query, emissions, scale, recomb)
}

/// Most probable path with the default (low-memory) configuration
pub fn viterbi(
    panel: &ReferencePanel,
    query: &Query,
    emissions: &EmissionTable,
    recomb: &[f64],
) -> Result<ViterbiPath> {
    Inference::default().viterbi(panel, query, emissions, recomb)
}

/// Exact log-probability of a fixed path
pub fn path_log_likelihood(
    panel: &ReferencePanel,
    query: &Query,
    path: &StatePath,
    emissions: &EmissionTable,
    recomb: &[f64],
) -> Result<f64> {
    Inference::default().path_log_likelihood(panel, query, path, emissions, recomb)
}
