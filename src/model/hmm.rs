//! # Haploid Update Kernels
//!
//! The per-site arithmetic of the haploid Li-Stephens recursions, written
//! over flat slices so the same kernel serves the forward and backward
//! passes. Both loops process four states per step with `wide::f64x4` and
//! finish the tail with scalar code.
//!
//! ## Reference
//! Li N, Stephens M. Genetics 2003 Dec;165(4):2213-33

use wide::f64x4;

const LANES: usize = 4;

/// Static haploid update functions
pub struct HmmUpdater;

impl HmmUpdater {
    /// Forward update in place.
    ///
    /// `row` holds the previous site's values on entry and the current
    /// site's unscaled values on return:
    ///
    /// ```text
    /// row[k] = emit[k] * (keep * row[k] + shift)
    /// ```
    ///
    /// with `keep = 1 - r` and `shift = (r / n) * Σ previous`.
    ///
    /// # Returns
    /// Sum of the updated values
    #[inline]
    pub fn fwd_update(row: &mut [f64], keep: f64, shift: f64, emit: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), emit.len());
        let keep_vec = f64x4::splat(keep);
        let shift_vec = f64x4::splat(shift);
        let mut sum_vec = f64x4::splat(0.0);

        let mut row_chunks = row.chunks_exact_mut(LANES);
        let mut emit_chunks = emit.chunks_exact(LANES);
        for (r, e) in (&mut row_chunks).zip(&mut emit_chunks) {
            let values = f64x4::from([r[0], r[1], r[2], r[3]]);
            let emit_vec = f64x4::from([e[0], e[1], e[2], e[3]]);
            let res = emit_vec * (keep_vec * values + shift_vec);
            r.copy_from_slice(&res.to_array());
            sum_vec += res;
        }

        let mut sum = sum_vec.reduce_add();
        for (r, &e) in row_chunks.into_remainder().iter_mut().zip(emit_chunks.remainder()) {
            *r = e * (keep * *r + shift);
            sum += *r;
        }
        sum
    }

    /// Backward update in place.
    ///
    /// `row` holds the next site's backward values on entry. They are first
    /// weighted by the next site's emissions, then pushed through the
    /// transition and divided by `divisor` (the next site's forward scale
    /// factor):
    ///
    /// ```text
    /// tmp[k] = emit[k] * row[k]
    /// row[k] = (keep * tmp[k] + jump * Σ tmp) / divisor
    /// ```
    #[inline]
    pub fn bwd_update(row: &mut [f64], keep: f64, jump: f64, emit: &[f64], divisor: f64) {
        debug_assert_eq!(row.len(), emit.len());
        // First: multiply by emission and compute sum
        let mut sum_vec = f64x4::splat(0.0);
        let mut row_chunks = row.chunks_exact_mut(LANES);
        let mut emit_chunks = emit.chunks_exact(LANES);
        for (r, e) in (&mut row_chunks).zip(&mut emit_chunks) {
            let values = f64x4::from([r[0], r[1], r[2], r[3]]);
            let emit_vec = f64x4::from([e[0], e[1], e[2], e[3]]);
            let res = values * emit_vec;
            r.copy_from_slice(&res.to_array());
            sum_vec += res;
        }
        let mut sum = sum_vec.reduce_add();
        for (r, &e) in row_chunks.into_remainder().iter_mut().zip(emit_chunks.remainder()) {
            *r *= e;
            sum += *r;
        }

        // Then: apply transition and the forward scale factor
        let scale = keep / divisor;
        let shift = jump * sum / divisor;
        let scale_vec = f64x4::splat(scale);
        let shift_vec = f64x4::splat(shift);
        let mut row_chunks = row.chunks_exact_mut(LANES);
        for r in &mut row_chunks {
            let values = f64x4::from([r[0], r[1], r[2], r[3]]);
            let res = scale_vec * values + shift_vec;
            r.copy_from_slice(&res.to_array());
        }
        for r in row_chunks.into_remainder() {
            *r = scale * *r + shift;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_fwd(row: &[f64], keep: f64, shift: f64, emit: &[f64]) -> Vec<f64> {
        row.iter().zip(emit).map(|(&v, &e)| e * (keep * v + shift)).collect()
    }

    #[test]
    fn test_fwd_update_matches_scalar() {
        // 7 states: one SIMD chunk plus a 3-element tail
        let prev = vec![0.1, 0.2, 0.05, 0.15, 0.3, 0.1, 0.1];
        let emit = vec![0.99, 0.01, 0.99, 0.99, 0.01, 0.99, 0.5];
        let expected = scalar_fwd(&prev, 0.9, 0.1 / 7.0, &emit);

        let mut row = prev.clone();
        let sum = HmmUpdater::fwd_update(&mut row, 0.9, 0.1 / 7.0, &emit);

        for (a, b) in row.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-15);
        }
        assert!((sum - expected.iter().sum::<f64>()).abs() < 1e-14);
    }

    #[test]
    fn test_bwd_update_uniform() {
        let n = 4;
        let mut bwd = vec![1.0; n];
        let emit = vec![1.0; n];
        HmmUpdater::bwd_update(&mut bwd, 0.99, 0.01 / n as f64, &emit, 1.0);
        // With uniform input and perfect emissions every state sees total mass 1
        for v in &bwd {
            assert!((v - (0.99 + 0.01)).abs() < 1e-14);
        }
    }

    #[test]
    fn test_bwd_update_divides_by_scale() {
        let mut a = vec![0.5, 1.5, 1.0, 2.0, 0.25];
        let mut b = a.clone();
        let emit = vec![0.9, 0.1, 0.9, 0.9, 0.1];
        HmmUpdater::bwd_update(&mut a, 0.8, 0.04, &emit, 1.0);
        HmmUpdater::bwd_update(&mut b, 0.8, 0.04, &emit, 4.0);
        for (x, y) in a.iter().zip(&b) {
            assert!((x / 4.0 - y).abs() < 1e-15);
        }
    }
}
