//! # Query Sequences
//!
//! The observed sequence that is explained as a mosaic of reference
//! haplotypes: either one haplotype (haploid) or an unphased genotype per site
//! (diploid).

use serde::{Deserialize, Serialize};

use crate::error::{LsError, Result};

/// Allele code marking an unobserved site
pub const MISSING: u8 = u8::MAX;

/// Number of strands carried by a query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ploidy {
    Haploid,
    Diploid,
}

impl Ploidy {
    pub fn as_u8(self) -> u8 {
        match self {
            Ploidy::Haploid => 1,
            Ploidy::Diploid => 2,
        }
    }

    /// Columns per emission-table row
    pub fn n_categories(self) -> usize {
        match self {
            Ploidy::Haploid => 2,
            Ploidy::Diploid => 8,
        }
    }

    /// Hidden states for a panel of `n_haps` haplotypes
    pub fn n_states(self, n_haps: usize) -> usize {
        match self {
            Ploidy::Haploid => n_haps,
            Ploidy::Diploid => n_haps * n_haps,
        }
    }
}

/// Unordered pair of biallelic alleles, stored as the alternate-allele dosage.
///
/// `0` and `2` are homozygous, `1` is heterozygous. Either allele missing
/// makes the whole genotype missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Genotype(u8);

impl Genotype {
    pub const MISSING: Genotype = Genotype(MISSING);

    /// Build from an allele dosage (0, 1, 2) or [`MISSING`]
    pub fn new(dosage: u8) -> Result<Self> {
        if dosage <= 2 || dosage == MISSING {
            Ok(Self(dosage))
        } else {
            Err(LsError::invalid_data(format!(
                "genotype dosage {} is not 0, 1, 2 or missing",
                dosage
            )))
        }
    }

    /// Pair two biallelic haplotype alleles into a genotype
    #[inline]
    pub fn from_alleles(a: u8, b: u8) -> Self {
        if a == MISSING || b == MISSING {
            Self::MISSING
        } else {
            Self(a + b)
        }
    }

    pub fn dosage(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self.0 == MISSING
    }

    #[inline]
    pub fn is_het(self) -> bool {
        self.0 == 1
    }
}

/// Observed sequence at the panel's sites
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// One allele code per site
    Haploid(Vec<u8>),
    /// One unphased genotype per site
    Diploid(Vec<Genotype>),
}

impl Query {
    pub fn haploid(alleles: Vec<u8>) -> Self {
        Query::Haploid(alleles)
    }

    /// Unphased genotype query formed from two biallelic haplotypes
    pub fn diploid_from_haplotypes(hap1: &[u8], hap2: &[u8]) -> Result<Self> {
        if hap1.len() != hap2.len() {
            return Err(LsError::shape(format!(
                "query haplotypes have {} and {} sites",
                hap1.len(),
                hap2.len()
            )));
        }
        let genotypes = hap1
            .iter()
            .zip(hap2)
            .enumerate()
            .map(|(site, (&a, &b))| {
                for allele in [a, b] {
                    if allele > 1 && allele != MISSING {
                        return Err(LsError::invalid_data(format!(
                            "diploid query allele {} at site {} is not biallelic",
                            allele, site
                        )));
                    }
                }
                Ok(Genotype::from_alleles(a, b))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Query::Diploid(genotypes))
    }

    pub fn ploidy(&self) -> Ploidy {
        match self {
            Query::Haploid(_) => Ploidy::Haploid,
            Query::Diploid(_) => Ploidy::Diploid,
        }
    }

    pub fn n_sites(&self) -> usize {
        match self {
            Query::Haploid(alleles) => alleles.len(),
            Query::Diploid(genotypes) => genotypes.len(),
        }
    }
}
