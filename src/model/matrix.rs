//! # Site-by-State Matrices
//!
//! Flat row-major storage for forward, backward and Viterbi values. Haploid
//! rows hold `n` states; diploid rows hold `n * n` states laid out as
//! `first * n + second` (see [`crate::data::HapPair`]).

/// Dense `n_sites x n_states` matrix of probabilities
#[derive(Clone, Debug, PartialEq)]
pub struct ProbMatrix {
    n_sites: usize,
    n_states: usize,
    values: Vec<f64>,
}

impl ProbMatrix {
    pub fn zeros(n_sites: usize, n_states: usize) -> Self {
        Self::filled(n_sites, n_states, 0.0)
    }

    pub fn filled(n_sites: usize, n_states: usize, value: f64) -> Self {
        Self {
            n_sites,
            n_states,
            values: vec![value; n_sites * n_states],
        }
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    #[inline]
    pub fn get(&self, site: usize, state: usize) -> f64 {
        self.values[site * self.n_states + state]
    }

    #[inline]
    pub fn row(&self, site: usize) -> &[f64] {
        &self.values[site * self.n_states..(site + 1) * self.n_states]
    }

    #[inline]
    pub fn row_mut(&mut self, site: usize) -> &mut [f64] {
        &mut self.values[site * self.n_states..(site + 1) * self.n_states]
    }

    /// Borrow row `from` immutably and row `to` mutably (`from != to`)
    pub fn row_pair_mut(&mut self, from: usize, to: usize) -> (&[f64], &mut [f64]) {
        assert_ne!(from, to, "row_pair_mut needs two distinct rows");
        let k = self.n_states;
        if from < to {
            let (head, tail) = self.values.split_at_mut(to * k);
            (&head[from * k..(from + 1) * k], &mut tail[..k])
        } else {
            let (head, tail) = self.values.split_at_mut(from * k);
            (&tail[..k], &mut head[to * k..(to + 1) * k])
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks_exact(self.n_states.max(1))
    }
}

/// Index of the largest value; ties resolve to the lowest index.
///
/// Returns `(0, NEG_INFINITY)` for an empty slice.
#[inline]
pub fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    (best, best_val)
}
