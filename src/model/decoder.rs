//! # Path Decoding
//!
//! Walks a [`Traceback`] from the best final state back to site 0.
//!
//! Diploid states are ordered pairs and are reported as the traceback left
//! them: state `s` becomes `(s / n, s % n)`. When both orientations of a pair
//! tie at the final site, the lower state index wins, so the pair with the
//! lower first haplotype is reported.

use crate::data::haplotype::{HapIdx, HapPair};
use crate::model::matrix::argmax;
use crate::model::viterbi::{Traceback, ViterbiResult};

/// Best state index per site
pub fn decode_states(last_row: &[f64], traceback: &Traceback, n_sites: usize) -> Vec<usize> {
    if n_sites == 0 {
        return Vec::new();
    }
    let (terminal, _) = argmax(last_row);
    traceback.trace(terminal, n_sites)
}

/// Best haploid path
pub fn decode_haploid(result: &ViterbiResult) -> Vec<HapIdx> {
    decode_states(&result.last_row, &result.traceback, result.scale.len())
        .into_iter()
        .map(HapIdx::from)
        .collect()
}

/// Best diploid path as ordered haplotype pairs
pub fn decode_diploid(result: &ViterbiResult, n_haps: usize) -> Vec<HapPair> {
    decode_states(&result.last_row, &result.traceback, result.scale.len())
        .into_iter()
        .map(|state| HapPair::from_state(state, n_haps))
        .collect()
}
