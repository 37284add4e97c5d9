//! # Data Module
//!
//! In-memory representations of the inference inputs.
//!
//! ## Design Philosophy
//! - **Flat storage:** the panel is one site-major `Vec<u8>`, so a site's
//!   alleles are a contiguous slice for the per-site update loops.
//! - **Zero-cost newtypes:** `HapIdx` and `HapPair` keep haplotype indices and
//!   flattened diploid states apart.
//! - **Views, not copies:** diploid genotypes are derived from the haplotype
//!   panel through `PhasedGenotypes` and never stored.

pub mod haplotype;
pub mod panel;
pub mod query;

pub use haplotype::{HapIdx, HapPair};
pub use panel::{PhasedGenotypes, ReferencePanel};
pub use query::{Genotype, Ploidy, Query, MISSING};

/// Most probable sequence of hidden states, one entry per site
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatePath {
    /// Reference haplotype copied at each site
    Haploid(Vec<HapIdx>),
    /// Phased pair of reference haplotypes copied at each site
    Diploid(Vec<HapPair>),
}

impl StatePath {
    pub fn len(&self) -> usize {
        match self {
            StatePath::Haploid(p) => p.len(),
            StatePath::Diploid(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ploidy(&self) -> Ploidy {
        match self {
            StatePath::Haploid(_) => Ploidy::Haploid,
            StatePath::Diploid(_) => Ploidy::Diploid,
        }
    }

    /// Sites (after the first) at which at least one strand changes haplotype
    pub fn switch_sites(&self) -> Vec<usize> {
        match self {
            StatePath::Haploid(p) => (1..p.len()).filter(|&t| p[t] != p[t - 1]).collect(),
            StatePath::Diploid(p) => (1..p.len()).filter(|&t| p[t] != p[t - 1]).collect(),
        }
    }
}
