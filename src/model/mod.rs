//! # Model Module
//!
//! The Li–Stephens copying model: a query is a mosaic of reference
//! haplotypes, and recombination switches which haplotype is copied.
//!
//! ## Core Algorithms
//! - `emission`: per-site `P(observed | hidden)` lookup
//! - `transition`: uniform-jump recombination probabilities
//! - `forward` / `backward`: scaled sum-product recursions
//! - `viterbi`: max-product recursion with full or low-memory traceback
//! - `decoder`: traceback and diploid phasing of the best path
//! - `path`: log-likelihood of an explicit state path
//!
//! ## Why the Uniform Jump Matters
//! Every recombination lands on any haplotype with probability `r/n`, so the
//! sum (or max) over predecessors collapses to one aggregate per site. Each
//! site costs O(n) haploid and O(n²) diploid instead of O(n²) and O(n⁴).

pub mod backward;
pub mod decoder;
pub mod emission;
pub mod forward;
pub mod hmm;
pub mod matrix;
pub mod path;
pub mod transition;
pub mod viterbi;

use crate::data::panel::ReferencePanel;
use crate::model::emission::EmissionTable;

/// Borrowed inputs shared by every recursion.
///
/// `recomb[t]` is the probability of recombination between sites `t - 1` and
/// `t`; `recomb[0]` is never read.
#[derive(Clone, Copy, Debug)]
pub struct HmmInputs<'a> {
    pub panel: &'a ReferencePanel,
    pub emissions: &'a EmissionTable,
    pub recomb: &'a [f64],
}

impl<'a> HmmInputs<'a> {
    pub fn new(panel: &'a ReferencePanel, emissions: &'a EmissionTable, recomb: &'a [f64]) -> Self {
        Self {
            panel,
            emissions,
            recomb,
        }
    }

    pub fn n_sites(&self) -> usize {
        self.panel.n_sites()
    }

    pub fn n_haps(&self) -> usize {
        self.panel.n_haps()
    }
}
