//! # Emission Model
//!
//! Read-only lookup of `P(observed | hidden, site)` from a precomputed
//! per-site table.
//!
//! ## Table Layout
//! Haploid rows have two columns: `[mismatch, match]`.
//!
//! Diploid rows have eight columns. A hidden genotype is compared with the
//! observed genotype and the comparison falls into one [`DiploidCategory`],
//! whose column is `4 * [equal] + 2 * [hidden het] + [observed het]`:
//!
//! ```text
//! col  category            hidden   observed
//!  0   UnequalBothHom      hom      other hom
//!  1   RefHomObsHet        hom      het
//!  2   RefHetObsHom        het      hom
//!  3   Missing             any      missing
//!  4   EqualBothHom        hom      same hom
//!  7   BothHet             het      het
//! ```
//!
//! Columns 5 and 6 are never read. Missing observations always emit with
//! probability 1, whatever the table holds.

use crate::data::panel::PhasedGenotypes;
use crate::data::query::{Genotype, Ploidy, MISSING};
use crate::error::{LsError, Result};

/// Classification of a hidden genotype against an observed genotype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiploidCategory {
    UnequalBothHom,
    RefHomObsHet,
    RefHetObsHom,
    Missing,
    EqualBothHom,
    BothHet,
}

impl DiploidCategory {
    /// Column of this category in a diploid emission row
    pub const fn column(self) -> usize {
        match self {
            DiploidCategory::UnequalBothHom => 0,
            DiploidCategory::RefHomObsHet => 1,
            DiploidCategory::RefHetObsHom => 2,
            DiploidCategory::Missing => 3,
            DiploidCategory::EqualBothHom => 4,
            DiploidCategory::BothHet => 7,
        }
    }

    /// Classify a reference-pair genotype against the observed genotype
    #[inline]
    pub fn classify(hidden: Genotype, observed: Genotype) -> Self {
        if observed.is_missing() {
            return DiploidCategory::Missing;
        }
        match (hidden == observed, hidden.is_het(), observed.is_het()) {
            (true, true, _) => DiploidCategory::BothHet,
            (true, false, _) => DiploidCategory::EqualBothHom,
            (false, true, _) => DiploidCategory::RefHetObsHom,
            (false, false, true) => DiploidCategory::RefHomObsHet,
            (false, false, false) => DiploidCategory::UnequalBothHom,
        }
    }
}

/// Per-site emission probabilities, `n_sites x ploidy.n_categories()`.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionTable {
    ploidy: Ploidy,
    n_sites: usize,
    probs: Vec<f64>,
}

impl EmissionTable {
    /// Haploid table from `[mismatch, match]` rows
    pub fn haploid(rows: &[[f64; 2]]) -> Self {
        Self {
            ploidy: Ploidy::Haploid,
            n_sites: rows.len(),
            probs: rows.iter().flatten().copied().collect(),
        }
    }

    /// Diploid table from eight-column rows
    pub fn diploid(rows: &[[f64; 8]]) -> Self {
        Self {
            ploidy: Ploidy::Diploid,
            n_sites: rows.len(),
            probs: rows.iter().flatten().copied().collect(),
        }
    }

    /// Create from a flat site-major vector
    pub fn from_flat(ploidy: Ploidy, n_sites: usize, probs: Vec<f64>) -> Result<Self> {
        let width = ploidy.n_categories();
        if probs.len() != n_sites * width {
            return Err(LsError::shape(format!(
                "emission table of {} sites needs {} values, got {}",
                n_sites,
                n_sites * width,
                probs.len()
            )));
        }
        Ok(Self {
            ploidy,
            n_sites,
            probs,
        })
    }

    pub fn ploidy(&self) -> Ploidy {
        self.ploidy
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    /// Emission row for one site
    #[inline]
    pub fn row(&self, site: usize) -> &[f64] {
        let width = self.ploidy.n_categories();
        &self.probs[site * width..(site + 1) * width]
    }

    /// Reject negative or non-finite entries
    pub fn validate(&self) -> Result<()> {
        let width = self.ploidy.n_categories();
        if let Some((i, p)) = self
            .probs
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(LsError::invalid_data(format!(
                "emission probability {} at site {} column {} is not a finite non-negative number",
                p,
                i / width,
                i % width
            )));
        }
        Ok(())
    }

    /// Haploid emission: column 1 on a match, column 0 otherwise
    #[inline]
    pub fn haploid_prob(&self, site: usize, hidden: u8, observed: u8) -> f64 {
        if observed == MISSING {
            return 1.0;
        }
        self.probs[site * 2 + (hidden == observed) as usize]
    }

    /// Diploid emission for a hidden genotype against the observed genotype
    #[inline]
    pub fn diploid_prob(&self, site: usize, hidden: Genotype, observed: Genotype) -> f64 {
        match DiploidCategory::classify(hidden, observed) {
            DiploidCategory::Missing => 1.0,
            category => self.probs[site * 8 + category.column()],
        }
    }

    /// Diploid emission for hidden dosages 0, 1 and 2 at `site`
    #[inline]
    pub fn diploid_by_dosage(&self, site: usize, observed: Genotype) -> [f64; 3] {
        [
            self.diploid_prob(site, Genotype::from_alleles(0, 0), observed),
            self.diploid_prob(site, Genotype::from_alleles(0, 1), observed),
            self.diploid_prob(site, Genotype::from_alleles(1, 1), observed),
        ]
    }

    /// Emission of every haploid state at `site` into `out`
    pub fn fill_haploid(&self, site: usize, alleles: &[u8], observed: u8, out: &mut [f64]) {
        if observed == MISSING {
            out.fill(1.0);
            return;
        }
        let row = self.row(site);
        let (mismatch, matched) = (row[0], row[1]);
        for (o, &a) in out.iter_mut().zip(alleles) {
            *o = if a == observed { matched } else { mismatch };
        }
    }

    /// Emission of every diploid state `(i, j)` at `site` into `out` (row-major)
    pub fn fill_diploid(&self, genotypes: &PhasedGenotypes<'_>, site: usize, observed: Genotype, out: &mut [f64]) {
        let n = genotypes.n_haps();
        let by_dosage = self.diploid_by_dosage(site, observed);
        for i in 0..n {
            for j in 0..n {
                let hidden = genotypes.genotype(site, i, j);
                out[i * n + j] = match hidden.dosage() {
                    d @ 0..=2 => by_dosage[d as usize],
                    _ => self.diploid_prob(site, hidden, observed),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(d: u8) -> Genotype {
        Genotype::new(d).unwrap()
    }

    #[test]
    fn test_classify_every_category() {
        use DiploidCategory::*;
        assert_eq!(DiploidCategory::classify(g(0), g(0)), EqualBothHom);
        assert_eq!(DiploidCategory::classify(g(2), g(2)), EqualBothHom);
        assert_eq!(DiploidCategory::classify(g(0), g(2)), UnequalBothHom);
        assert_eq!(DiploidCategory::classify(g(1), g(1)), BothHet);
        assert_eq!(DiploidCategory::classify(g(0), g(1)), RefHomObsHet);
        assert_eq!(DiploidCategory::classify(g(2), g(1)), RefHomObsHet);
        assert_eq!(DiploidCategory::classify(g(1), g(0)), RefHetObsHom);
        assert_eq!(DiploidCategory::classify(g(1), Genotype::MISSING), Missing);
    }

    #[test]
    fn test_columns_match_bit_encoding() {
        for hidden in 0..=2u8 {
            for observed in 0..=2u8 {
                let cat = DiploidCategory::classify(g(hidden), g(observed));
                let encoded = 4 * (hidden == observed) as usize
                    + 2 * (hidden == 1) as usize
                    + (observed == 1) as usize;
                assert_eq!(cat.column(), encoded);
            }
        }
    }

    #[test]
    fn test_haploid_lookup() {
        let table = EmissionTable::haploid(&[[0.1, 0.9], [0.2, 0.8]]);
        assert_eq!(table.haploid_prob(0, 1, 1), 0.9);
        assert_eq!(table.haploid_prob(0, 0, 1), 0.1);
        assert_eq!(table.haploid_prob(1, 0, 1), 0.2);
        assert_eq!(table.haploid_prob(1, 0, MISSING), 1.0);
    }

    #[test]
    fn test_diploid_lookup_and_missing() {
        let row = [0.0, 0.1, 0.2, 0.5, 0.4, 0.0, 0.0, 0.7];
        let table = EmissionTable::diploid(&[row]);
        assert_eq!(table.diploid_prob(0, g(1), g(1)), 0.7);
        assert_eq!(table.diploid_prob(0, g(0), g(0)), 0.4);
        assert_eq!(table.diploid_prob(0, g(1), g(2)), 0.2);
        assert_eq!(table.diploid_prob(0, g(2), Genotype::MISSING), 1.0);
    }

    #[test]
    fn test_fill_matches_pointwise_lookup() {
        use crate::data::panel::ReferencePanel;

        let panel = ReferencePanel::from_rows(&[vec![0, 1, 1]]).unwrap();
        let hap = EmissionTable::haploid(&[[0.05, 0.95]]);
        let mut out = vec![0.0; 3];
        hap.fill_haploid(0, panel.site(0), 1, &mut out);
        assert_eq!(out, vec![0.05, 0.95, 0.95]);
        hap.fill_haploid(0, panel.site(0), MISSING, &mut out);
        assert_eq!(out, vec![1.0; 3]);

        let dip = EmissionTable::diploid(&[[0.01, 0.02, 0.03, 1.0, 0.9, 0.0, 0.0, 0.8]]);
        let view = panel.phased_genotypes();
        let mut grid = vec![0.0; 9];
        dip.fill_diploid(&view, 0, g(1), &mut grid);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(grid[i * 3 + j], dip.diploid_prob(0, view.genotype(0, i, j), g(1)));
            }
        }
    }

    #[test]
    fn test_validation() {
        assert!(EmissionTable::from_flat(Ploidy::Haploid, 2, vec![0.5; 3]).is_err());
        let bad = EmissionTable::haploid(&[[f64::NAN, 1.0]]);
        assert!(matches!(bad.validate(), Err(LsError::InvalidData { .. })));
        assert!(EmissionTable::haploid(&[[0.0, 1.0]]).validate().is_ok());
    }
}
