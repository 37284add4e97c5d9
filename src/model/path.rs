//! # Path Scoring
//!
//! Exact base-10 log-probability of one fixed state path, replayed site by
//! site with no maximisation or marginalisation:
//!
//! ```text
//! log10 P = log10(prior * e[0]) + Σ_{t>=1} log10(P(s[t-1] -> s[t]) * e[t])
//! ```
//!
//! The prior is `1/n` haploid and `1/n²` diploid. A path through an
//! impossible observation scores `-inf`.

use crate::data::haplotype::{HapIdx, HapPair};
use crate::data::query::Genotype;
use crate::error::{LsError, Result};
use crate::model::transition::{DiploidTransition, Transition};
use crate::model::HmmInputs;

fn check_path(len: usize, n_sites: usize) -> Result<()> {
    if len != n_sites {
        return Err(LsError::shape(format!(
            "path has {} entries for {} sites",
            len, n_sites
        )));
    }
    Ok(())
}

fn check_hap(hap: HapIdx, n_haps: usize, site: usize) -> Result<()> {
    if hap.as_usize() >= n_haps {
        return Err(LsError::invalid_data(format!(
            "path haplotype {} at site {} is outside a panel of {} haplotypes",
            hap.0, site, n_haps
        )));
    }
    Ok(())
}

/// Log-probability of a haploid path
pub fn haploid_path_log_likelihood(inputs: HmmInputs<'_>, query: &[u8], path: &[HapIdx]) -> Result<f64> {
    check_path(path.len(), query.len())?;
    let n = inputs.n_haps();
    let mut ll = 0.0;
    for (t, (&hap, &observed)) in path.iter().zip(query).enumerate() {
        check_hap(hap, n, t)?;
        let step = if t == 0 {
            1.0 / n as f64
        } else {
            Transition::new(inputs.recomb[t], n).prob(path[t - 1].as_usize(), hap.as_usize())
        };
        let emit = inputs
            .emissions
            .haploid_prob(t, inputs.panel.allele(t, hap), observed);
        ll += (step * emit).log10();
    }
    Ok(ll)
}

/// Log-probability of an ordered diploid path
pub fn diploid_path_log_likelihood(inputs: HmmInputs<'_>, query: &[Genotype], path: &[HapPair]) -> Result<f64> {
    check_path(path.len(), query.len())?;
    let n = inputs.n_haps();
    let mut ll = 0.0;
    for (t, (&pair, &observed)) in path.iter().zip(query).enumerate() {
        check_hap(pair.first, n, t)?;
        check_hap(pair.second, n, t)?;
        let step = if t == 0 {
            1.0 / (n * n) as f64
        } else {
            DiploidTransition::new(inputs.recomb[t], n).by_changes(pair.strand_changes(path[t - 1]))
        };
        let hidden = Genotype::from_alleles(
            inputs.panel.allele(t, pair.first),
            inputs.panel.allele(t, pair.second),
        );
        let emit = inputs.emissions.diploid_prob(t, hidden, observed);
        ll += (step * emit).log10();
    }
    Ok(ll)
}
