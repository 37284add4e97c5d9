//! # Reference Panel
//!
//! Dense sites x haplotypes allele matrix. The diploid code paths read it
//! through [`PhasedGenotypes`], a view that pairs two haplotype columns on
//! demand instead of materialising the `m x n x n` genotype tensor.

use crate::data::haplotype::HapIdx;
use crate::data::query::Genotype;
use crate::error::{LsError, Result};

/// Reference haplotypes, stored site-major (one contiguous row per site).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferencePanel {
    n_sites: usize,
    n_haps: usize,
    alleles: Vec<u8>,
}

impl ReferencePanel {
    /// Create from a flat site-major allele vector
    pub fn new(n_sites: usize, n_haps: usize, alleles: Vec<u8>) -> Result<Self> {
        if alleles.len() != n_sites * n_haps {
            return Err(LsError::shape(format!(
                "panel of {} sites x {} haplotypes needs {} alleles, got {}",
                n_sites,
                n_haps,
                n_sites * n_haps,
                alleles.len()
            )));
        }
        Ok(Self {
            n_sites,
            n_haps,
            alleles,
        })
    }

    /// Create from one row of alleles per site
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let n_sites = rows.len();
        let n_haps = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut alleles = Vec::with_capacity(n_sites * n_haps);
        for (site, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_haps {
                return Err(LsError::shape(format!(
                    "site {} has {} haplotypes, expected {}",
                    site,
                    row.len(),
                    n_haps
                )));
            }
            alleles.extend_from_slice(row);
        }
        Self::new(n_sites, n_haps, alleles)
    }

    /// Create from one allele vector per haplotype
    pub fn from_haplotypes<H: AsRef<[u8]>>(haplotypes: &[H]) -> Result<Self> {
        let n_haps = haplotypes.len();
        let n_sites = haplotypes.first().map(|h| h.as_ref().len()).unwrap_or(0);
        if let Some((hap, h)) = haplotypes
            .iter()
            .enumerate()
            .find(|(_, h)| h.as_ref().len() != n_sites)
        {
            return Err(LsError::shape(format!(
                "haplotype {} has {} sites, expected {}",
                hap,
                h.as_ref().len(),
                n_sites
            )));
        }
        let mut alleles = Vec::with_capacity(n_sites * n_haps);
        for site in 0..n_sites {
            alleles.extend(haplotypes.iter().map(|h| h.as_ref()[site]));
        }
        Self::new(n_sites, n_haps, alleles)
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_haps(&self) -> usize {
        self.n_haps
    }

    /// Allele of `hap` at `site`
    #[inline]
    pub fn allele(&self, site: usize, hap: HapIdx) -> u8 {
        self.alleles[site * self.n_haps + hap.as_usize()]
    }

    /// All haplotype alleles at `site`
    #[inline]
    pub fn site(&self, site: usize) -> &[u8] {
        let start = site * self.n_haps;
        &self.alleles[start..start + self.n_haps]
    }

    /// Whether every allele is 0 or 1 (required for genotype pairing)
    pub fn is_biallelic(&self) -> bool {
        self.alleles.iter().all(|&a| a <= 1)
    }

    /// Diploid view pairing every two haplotypes at each site
    pub fn phased_genotypes(&self) -> PhasedGenotypes<'_> {
        PhasedGenotypes { panel: self }
    }
}

/// Read-only view of `G[t][i][j] = H[t][i] + H[t][j]`.
#[derive(Clone, Copy, Debug)]
pub struct PhasedGenotypes<'a> {
    panel: &'a ReferencePanel,
}

impl<'a> PhasedGenotypes<'a> {
    pub fn n_haps(&self) -> usize {
        self.panel.n_haps
    }

    /// Genotype formed by haplotypes `i` and `j` at `site`
    #[inline]
    pub fn genotype(&self, site: usize, i: usize, j: usize) -> Genotype {
        let row = self.panel.site(site);
        Genotype::from_alleles(row[i], row[j])
    }
}
