//! Shared fixtures for integration tests: emission tables built from a
//! per-site mutation probability, seeded random panels, and naive
//! quadratic-time recursions used as oracles.

#![allow(dead_code)]

use listephens::data::panel::ReferencePanel;
use listephens::model::emission::{DiploidCategory, EmissionTable};
use listephens::model::transition::{DiploidTransition, Transition};
use listephens::{Genotype, HapIdx, Query};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =============================================================================
// Emission Builders
// =============================================================================

/// Haploid table: mismatch `mu`, match `1 - mu`
pub fn haploid_emissions(mu: f64, n_sites: usize) -> EmissionTable {
    EmissionTable::haploid(&vec![[mu, 1.0 - mu]; n_sites])
}

/// Diploid table from a per-strand mutation probability
pub fn diploid_emissions(mu: f64, n_sites: usize) -> EmissionTable {
    let mut row = [0.0; 8];
    row[DiploidCategory::EqualBothHom.column()] = (1.0 - mu) * (1.0 - mu);
    row[DiploidCategory::UnequalBothHom.column()] = mu * mu;
    row[DiploidCategory::BothHet.column()] = (1.0 - mu) * (1.0 - mu) + mu * mu;
    row[DiploidCategory::RefHomObsHet.column()] = 2.0 * mu * (1.0 - mu);
    row[DiploidCategory::RefHetObsHom.column()] = mu * (1.0 - mu);
    row[DiploidCategory::Missing.column()] = 1.0;
    EmissionTable::diploid(&vec![row; n_sites])
}

// =============================================================================
// Random Inputs
// =============================================================================

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Biallelic panel with `n_haps` random haplotypes
pub fn random_panel(rng: &mut StdRng, n_sites: usize, n_haps: usize) -> ReferencePanel {
    let alleles: Vec<u8> = (0..n_sites * n_haps).map(|_| rng.gen_range(0..2u8)).collect();
    ReferencePanel::new(n_sites, n_haps, alleles).unwrap()
}

/// Recombination probabilities in `[0, max)`; entry 0 is 0
pub fn random_recomb(rng: &mut StdRng, n_sites: usize, max: f64) -> Vec<f64> {
    (0..n_sites)
        .map(|t| if t == 0 { 0.0 } else { rng.gen_range(0.0..max) })
        .collect()
}

/// Mosaic of panel haplotypes with occasional switches and allele flips
pub fn random_haplotype(rng: &mut StdRng, panel: &ReferencePanel) -> Vec<u8> {
    let mut hap = rng.gen_range(0..panel.n_haps());
    (0..panel.n_sites())
        .map(|t| {
            if rng.gen_bool(0.2) {
                hap = rng.gen_range(0..panel.n_haps());
            }
            let allele = panel.allele(t, HapIdx::from(hap));
            if rng.gen_bool(0.1) {
                1 - allele
            } else {
                allele
            }
        })
        .collect()
}

pub fn random_haploid_query(rng: &mut StdRng, panel: &ReferencePanel) -> Query {
    Query::haploid(random_haplotype(rng, panel))
}

pub fn random_diploid_query(rng: &mut StdRng, panel: &ReferencePanel) -> Query {
    let a = random_haplotype(rng, panel);
    let b = random_haplotype(rng, panel);
    Query::diploid_from_haplotypes(&a, &b).unwrap()
}

pub fn haploid_alleles(query: &Query) -> &[u8] {
    match query {
        Query::Haploid(alleles) => alleles,
        Query::Diploid(_) => panic!("expected a haploid query"),
    }
}

pub fn diploid_genotypes(query: &Query) -> &[Genotype] {
    match query {
        Query::Diploid(genotypes) => genotypes,
        Query::Haploid(_) => panic!("expected a diploid query"),
    }
}

// =============================================================================
// Naive Oracles
// =============================================================================

fn hidden_genotype(panel: &ReferencePanel, t: usize, i: usize, j: usize) -> Genotype {
    Genotype::from_alleles(panel.allele(t, HapIdx::from(i)), panel.allele(t, HapIdx::from(j)))
}

/// Unscaled forward with an explicit sum over every predecessor
pub fn naive_forward_haploid(panel: &ReferencePanel, query: &[u8], emissions: &EmissionTable, recomb: &[f64]) -> f64 {
    let n = panel.n_haps();
    let mut row: Vec<f64> = (0..n)
        .map(|i| emissions.haploid_prob(0, panel.allele(0, HapIdx::from(i)), query[0]) / n as f64)
        .collect();
    for t in 1..query.len() {
        let tr = Transition::new(recomb[t], n);
        row = (0..n)
            .map(|j| {
                let incoming: f64 = (0..n).map(|i| row[i] * tr.prob(i, j)).sum();
                incoming * emissions.haploid_prob(t, panel.allele(t, HapIdx::from(j)), query[t])
            })
            .collect();
    }
    row.iter().sum::<f64>().log10()
}

/// Unscaled diploid forward over ordered pairs, summing over all `n^2` predecessors
pub fn naive_forward_diploid(
    panel: &ReferencePanel,
    query: &[Genotype],
    emissions: &EmissionTable,
    recomb: &[f64],
) -> f64 {
    let n = panel.n_haps();
    let mut row: Vec<f64> = (0..n * n)
        .map(|s| emissions.diploid_prob(0, hidden_genotype(panel, 0, s / n, s % n), query[0]) / (n * n) as f64)
        .collect();
    for t in 1..query.len() {
        let tr = Transition::new(recomb[t], n);
        row = (0..n * n)
            .map(|s| {
                let (j1, j2) = (s / n, s % n);
                let incoming: f64 = (0..n * n)
                    .map(|p| row[p] * tr.prob(p / n, j1) * tr.prob(p % n, j2))
                    .sum();
                incoming * emissions.diploid_prob(t, hidden_genotype(panel, t, j1, j2), query[t])
            })
            .collect();
    }
    row.iter().sum::<f64>().log10()
}

/// Unscaled max-product over every predecessor
pub fn naive_viterbi_haploid(panel: &ReferencePanel, query: &[u8], emissions: &EmissionTable, recomb: &[f64]) -> f64 {
    let n = panel.n_haps();
    let mut row: Vec<f64> = (0..n)
        .map(|i| emissions.haploid_prob(0, panel.allele(0, HapIdx::from(i)), query[0]) / n as f64)
        .collect();
    for t in 1..query.len() {
        let tr = Transition::new(recomb[t], n);
        row = (0..n)
            .map(|j| {
                let best = (0..n).map(|i| row[i] * tr.prob(i, j)).fold(0.0, f64::max);
                best * emissions.haploid_prob(t, panel.allele(t, HapIdx::from(j)), query[t])
            })
            .collect();
    }
    row.iter().copied().fold(0.0, f64::max).log10()
}

/// Unscaled diploid max-product over every ordered predecessor pair
pub fn naive_viterbi_diploid(
    panel: &ReferencePanel,
    query: &[Genotype],
    emissions: &EmissionTable,
    recomb: &[f64],
) -> f64 {
    let n = panel.n_haps();
    let mut row: Vec<f64> = (0..n * n)
        .map(|s| emissions.diploid_prob(0, hidden_genotype(panel, 0, s / n, s % n), query[0]) / (n * n) as f64)
        .collect();
    for t in 1..query.len() {
        let tr = DiploidTransition::new(recomb[t], n);
        row = (0..n * n)
            .map(|s| {
                let (j1, j2) = (s / n, s % n);
                let best = (0..n * n)
                    .map(|p| {
                        let changes = (p / n != j1) as usize + (p % n != j2) as usize;
                        row[p] * tr.by_changes(changes)
                    })
                    .fold(0.0, f64::max);
                best * emissions.diploid_prob(t, hidden_genotype(panel, t, j1, j2), query[t])
            })
            .collect();
    }
    row.iter().copied().fold(0.0, f64::max).log10()
}

/// Every sequence of `n_sites` values drawn from `0..n_states`
pub fn all_paths(n_states: usize, n_sites: usize) -> Vec<Vec<usize>> {
    let mut paths = vec![Vec::new()];
    for _ in 0..n_sites {
        paths = paths
            .into_iter()
            .flat_map(|p| {
                (0..n_states).map(move |s| {
                    let mut next = p.clone();
                    next.push(s);
                    next
                })
            })
            .collect();
    }
    paths
}

pub fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol * b.abs().max(1.0), "{} != {} (tol {})", a, b, tol);
}
