//! # Li-Stephens Transitions
//!
//! Recombination is a jump to a uniformly chosen panel haplotype, independent
//! of the source. With `r` the site's recombination probability and `n` the
//! panel size, a single strand moves `i -> j` with probability
//!
//! ```text
//! P(i -> j) = (1 - r) * [i == j] + r / n
//! ```
//!
//! so the sum over predecessors collapses to `(1 - r) * x[j] + (r / n) * Σx`,
//! which is what keeps each site linear in the number of states.
//!
//! Diploid transitions are the product of two independent strands. Expanding
//! the product gives four additive terms: neither strand recombines, only the
//! first, only the second, both. The single-strand terms need the row and
//! column sums of the previous `n x n` grid, kept in [`GridAggregates`].

/// Haploid transition scalars for one site.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    /// Probability of a recombination event before this site
    pub recomb: f64,
    /// Probability of jumping onto one particular haplotype, `r / n`
    pub jump: f64,
}

impl Transition {
    pub fn new(recomb: f64, n_haps: usize) -> Self {
        Self {
            recomb,
            jump: recomb / n_haps as f64,
        }
    }

    /// Weight on the same-state term of the marginalised update
    #[inline]
    pub fn no_recomb(&self) -> f64 {
        1.0 - self.recomb
    }

    /// Total probability of ending on the source haplotype
    #[inline]
    pub fn stay(&self) -> f64 {
        1.0 - self.recomb + self.jump
    }

    #[inline]
    pub fn prob(&self, from: usize, to: usize) -> f64 {
        if from == to {
            self.stay()
        } else {
            self.jump
        }
    }
}

/// Diploid transition scalars for one site: two independent haploid strands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiploidTransition {
    strand: Transition,
}

impl DiploidTransition {
    pub fn new(recomb: f64, n_haps: usize) -> Self {
        Self {
            strand: Transition::new(recomb, n_haps),
        }
    }

    pub fn strand(&self) -> Transition {
        self.strand
    }

    /// Additive term: neither strand recombines, `(1 - r)^2`
    #[inline]
    pub fn no_recomb(&self) -> f64 {
        let keep = self.strand.no_recomb();
        keep * keep
    }

    /// Additive term per strand: exactly this strand recombines, `(1 - r) r / n`
    #[inline]
    pub fn one_strand(&self) -> f64 {
        self.strand.no_recomb() * self.strand.jump
    }

    /// Additive term: both strands recombine, `(r / n)^2`
    #[inline]
    pub fn both_strands(&self) -> f64 {
        self.strand.jump * self.strand.jump
    }

    /// Probability of a specific move in which neither strand changes haplotype
    #[inline]
    pub fn no_switch(&self) -> f64 {
        let stay = self.strand.stay();
        stay * stay
    }

    /// Probability of a specific move in which exactly one strand changes haplotype
    #[inline]
    pub fn single_switch(&self) -> f64 {
        self.strand.stay() * self.strand.jump
    }

    /// Probability of a specific move in which both strands change haplotype
    #[inline]
    pub fn double_switch(&self) -> f64 {
        self.strand.jump * self.strand.jump
    }

    /// Probability of a move that changes `n_changed` strands (0, 1 or 2)
    pub fn by_changes(&self, n_changed: usize) -> f64 {
        match n_changed {
            0 => self.no_switch(),
            1 => self.single_switch(),
            _ => self.double_switch(),
        }
    }
}

/// Row sums, column sums and total of a row-major `n x n` grid.
///
/// Filled while a site's values are written, then rescaled together with
/// them, so the next site's transitions read it without another pass.
#[derive(Clone, Debug, Default)]
pub struct GridAggregates {
    pub rows: Vec<f64>,
    pub cols: Vec<f64>,
    pub total: f64,
}

impl GridAggregates {
    pub fn new(n_haps: usize) -> Self {
        Self {
            rows: vec![0.0; n_haps],
            cols: vec![0.0; n_haps],
            total: 0.0,
        }
    }

    /// Zero every sum, resizing to `n_haps`
    pub fn reset(&mut self, n_haps: usize) {
        self.rows.clear();
        self.rows.resize(n_haps, 0.0);
        self.cols.clear();
        self.cols.resize(n_haps, 0.0);
        self.total = 0.0;
    }

    #[inline]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.rows[i] += value;
        self.cols[j] += value;
        self.total += value;
    }

    /// Aggregate a whole grid from scratch
    pub fn from_grid(grid: &[f64], n_haps: usize) -> Self {
        let mut agg = Self::new(n_haps);
        for (state, &v) in grid.iter().enumerate() {
            agg.add(state / n_haps, state % n_haps, v);
        }
        agg
    }

    /// Divide every sum by `divisor`
    pub fn rescale(&mut self, divisor: f64) {
        self.rows.iter_mut().for_each(|v| *v /= divisor);
        self.cols.iter_mut().for_each(|v| *v /= divisor);
        self.total /= divisor;
    }

    /// Marginalised diploid update for state `(i, j)`
    #[inline]
    pub fn transition(&self, tr: &DiploidTransition, i: usize, j: usize, same: f64) -> f64 {
        tr.no_recomb() * same + tr.one_strand() * (self.rows[i] + self.cols[j]) + tr.both_strands() * self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_haploid_mass() {
        for &r in &[0.0, 1e-4, 0.3, 1.0] {
            let n = 7;
            let tr = Transition::new(r, n);
            let total: f64 = (0..n).map(|to| tr.prob(2, to)).sum();
            assert!((total - 1.0).abs() < EPS, "r={} total={}", r, total);
        }
    }

    #[test]
    fn test_diploid_mass_over_pairs() {
        for &r in &[0.0, 0.01, 0.5, 1.0] {
            let n = 5;
            let tr = DiploidTransition::new(r, n);
            let mut total = 0.0;
            for i in 0..n {
                for j in 0..n {
                    let changes = (i != 1) as usize + (j != 3) as usize;
                    total += tr.by_changes(changes);
                }
            }
            assert!((total - 1.0).abs() < EPS, "r={} total={}", r, total);
        }
    }

    #[test]
    fn test_diploid_additive_categories_sum_to_one() {
        let n = 4;
        let r = 0.2;
        let tr = DiploidTransition::new(r, n);
        // none + first only + second only + both, each jump summed over n targets
        let total = tr.no_recomb()
            + 2.0 * tr.one_strand() * n as f64
            + tr.both_strands() * (n * n) as f64;
        assert!((total - 1.0).abs() < EPS);
        assert!((tr.single_switch() - (tr.one_strand() + tr.both_strands())).abs() < EPS);
    }

    #[test]
    fn test_aggregate_transition_matches_pairwise_sum() {
        let n = 3;
        let grid: Vec<f64> = (0..n * n).map(|s| 0.1 + s as f64 * 0.05).collect();
        let agg = GridAggregates::from_grid(&grid, n);
        let tr = DiploidTransition::new(0.3, n);
        let strand = tr.strand();
        for i in 0..n {
            for j in 0..n {
                let mut naive = 0.0;
                for a in 0..n {
                    for b in 0..n {
                        naive += grid[a * n + b] * strand.prob(a, i) * strand.prob(b, j);
                    }
                }
                let fast = agg.transition(&tr, i, j, grid[i * n + j]);
                assert!((naive - fast).abs() < EPS);
            }
        }
    }
}
