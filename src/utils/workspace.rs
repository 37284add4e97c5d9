//! # Workspace Pattern for HMM Buffers
//!
//! Scratch buffers for one inference call. The recursions own their outputs
//! (fresh per call) but borrow every temporary from a `Workspace`, so the
//! per-site loops never allocate.
//!
//! ## Design Philosophy
//! The model types (`EmissionTable`, `Transition`) stay immutable and
//! shareable across threads; every mutable buffer lives here instead.

use crate::model::transition::GridAggregates;

/// Workspace for forward, backward and Viterbi recursions
#[derive(Debug, Default)]
pub struct Workspace {
    /// Emission probabilities of every state at the current site
    pub emit: Vec<f64>,

    /// Emission-weighted next-site values (backward)
    pub tmp: Vec<f64>,

    /// Row/column sums of the previous diploid grid
    pub aggregates: GridAggregates,

    /// Row/column sums accumulated while the current diploid grid is written
    pub next_aggregates: GridAggregates,

    /// Per-row maxima of the previous diploid Viterbi grid
    pub row_max: Vec<f64>,

    /// Column index of each row maximum
    pub row_arg: Vec<u32>,

    /// Per-column maxima of the previous diploid Viterbi grid
    pub col_max: Vec<f64>,

    /// Row index of each column maximum
    pub col_arg: Vec<u32>,
}

impl Workspace {
    /// Create a workspace sized for `n_haps` haplotypes and `n_states` states
    pub fn new(n_haps: usize, n_states: usize) -> Self {
        let mut ws = Self::default();
        ws.resize(n_haps, n_states);
        ws
    }

    /// Resize buffers for new dimensions
    pub fn resize(&mut self, n_haps: usize, n_states: usize) {
        self.emit.resize(n_states, 0.0);
        self.tmp.resize(n_states, 0.0);
        self.aggregates.reset(n_haps);
        self.next_aggregates.reset(n_haps);
        self.row_max.resize(n_haps, 0.0);
        self.row_arg.resize(n_haps, 0);
        self.col_max.resize(n_haps, 0.0);
        self.col_arg.resize(n_haps, 0);
    }

    /// Make the aggregates accumulated for the current site the previous
    /// site's aggregates, and clear the accumulator
    pub fn advance_aggregates(&mut self) {
        std::mem::swap(&mut self.aggregates, &mut self.next_aggregates);
        let n_haps = self.aggregates.rows.len();
        self.next_aggregates.reset(n_haps);
    }

    /// Fill the row/column maxima of a row-major `n x n` grid.
    ///
    /// Ties resolve to the lowest index.
    pub fn fill_grid_maxima(&mut self, grid: &[f64], n_haps: usize) {
        self.row_max.fill(f64::NEG_INFINITY);
        self.col_max.fill(f64::NEG_INFINITY);
        self.row_arg.fill(0);
        self.col_arg.fill(0);
        for i in 0..n_haps {
            let row = &grid[i * n_haps..(i + 1) * n_haps];
            for (j, &v) in row.iter().enumerate() {
                if v > self.row_max[i] {
                    self.row_max[i] = v;
                    self.row_arg[i] = j as u32;
                }
                if v > self.col_max[j] {
                    self.col_max[j] = v;
                    self.col_arg[j] = i as u32;
                }
            }
        }
    }
}
