//! # Haplotype Index Types
//!
//! Index newtypes for reference haplotypes and for the ordered pairs of
//! haplotypes that make up the diploid state space.

use serde::{Deserialize, Serialize};

/// Zero-cost newtype for reference haplotype indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HapIdx(pub u32);

impl HapIdx {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for HapIdx {
    fn from(idx: u32) -> Self {
        Self(idx)
    }
}

impl From<usize> for HapIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

impl From<HapIdx> for usize {
    fn from(idx: HapIdx) -> usize {
        idx.0 as usize
    }
}

/// Ordered pair of reference haplotypes copied by the two strands of a
/// diploid query.
///
/// Diploid states are laid out row-major: state `first * n + second`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HapPair {
    pub first: HapIdx,
    pub second: HapIdx,
}

impl HapPair {
    pub fn new(first: impl Into<HapIdx>, second: impl Into<HapIdx>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Decode a flattened diploid state index
    #[inline]
    pub fn from_state(state: usize, n_haps: usize) -> Self {
        Self::new(state / n_haps, state % n_haps)
    }

    /// Flattened diploid state index
    #[inline]
    pub fn state(self, n_haps: usize) -> usize {
        self.first.as_usize() * n_haps + self.second.as_usize()
    }

    /// Number of strands whose haplotype differs from `other` (0, 1 or 2)
    pub fn strand_changes(self, other: HapPair) -> usize {
        (self.first != other.first) as usize + (self.second != other.second) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        let n = 5;
        for state in 0..n * n {
            assert_eq!(HapPair::from_state(state, n).state(n), state);
        }
        assert_eq!(HapPair::from_state(7, 5), HapPair::new(1u32, 2u32));
    }

    #[test]
    fn test_strand_changes() {
        let p = HapPair::new(3u32, 1u32);
        assert_eq!(p.strand_changes(p), 0);
        assert_eq!(p.strand_changes(HapPair::new(3u32, 2u32)), 1);
        assert_eq!(p.strand_changes(HapPair::new(1u32, 3u32)), 2);
    }
}
