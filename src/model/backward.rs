//! # Backward Recursion
//!
//! Runs from the last site to the first, reusing the forward pass's scale
//! factors verbatim. The final row is 1 for every state; each step weights
//! the next site's values by that site's emissions, applies the same
//! marginalised transition as the forward pass (recombination is
//! time-symmetric) and divides by the next site's forward scale factor.
//!
//! With matching scale factors, `Σ_state F[t] * B[t]` equals 1 at every site
//! for normalised forward values, and the query likelihood for unscaled ones.

use crate::data::query::Genotype;
use crate::error::{LsError, Result};
use crate::model::hmm::HmmUpdater;
use crate::model::matrix::ProbMatrix;
use crate::model::transition::{DiploidTransition, Transition};
use crate::model::HmmInputs;
use crate::utils::workspace::Workspace;

fn check_scale(scale: &[f64], n_sites: usize) -> Result<()> {
    if scale.len() != n_sites {
        return Err(LsError::shape(format!(
            "{} scale factors for {} sites",
            scale.len(),
            n_sites
        )));
    }
    if let Some(site) = scale.iter().position(|&c| !(c > 0.0) || !c.is_finite()) {
        return Err(LsError::ZeroLikelihood { site });
    }
    Ok(())
}

/// Haploid backward pass, `n_sites x n` scaled values
pub fn backward_haploid(inputs: HmmInputs<'_>, query: &[u8], scale: &[f64]) -> Result<ProbMatrix> {
    let _span = tracing::info_span!("backward_haploid", n_sites = query.len()).entered();
    let n_sites = query.len();
    let n = inputs.panel.n_haps();
    check_scale(scale, n_sites)?;

    let mut bwd = ProbMatrix::zeros(n_sites, n);
    if n_sites == 0 {
        return Ok(bwd);
    }
    bwd.row_mut(n_sites - 1).fill(1.0);

    let mut ws = Workspace::new(n, n);
    for t in (0..n_sites - 1).rev() {
        let next = t + 1;
        let tr = Transition::new(inputs.recomb[next], n);
        inputs
            .emissions
            .fill_haploid(next, inputs.panel.site(next), query[next], &mut ws.emit);
        let (next_row, row) = bwd.row_pair_mut(next, t);
        row.copy_from_slice(next_row);
        HmmUpdater::bwd_update(row, tr.no_recomb(), tr.jump, &ws.emit, scale[next]);
    }
    Ok(bwd)
}

/// Diploid backward pass, `n_sites x n^2` scaled values
pub fn backward_diploid(inputs: HmmInputs<'_>, query: &[Genotype], scale: &[f64]) -> Result<ProbMatrix> {
    let _span = tracing::info_span!("backward_diploid", n_sites = query.len()).entered();
    let n_sites = query.len();
    let n = inputs.panel.n_haps();
    check_scale(scale, n_sites)?;

    let mut bwd = ProbMatrix::zeros(n_sites, n * n);
    if n_sites == 0 {
        return Ok(bwd);
    }
    bwd.row_mut(n_sites - 1).fill(1.0);

    let genotypes = inputs.panel.phased_genotypes();
    let mut ws = Workspace::new(n, n * n);
    for t in (0..n_sites - 1).rev() {
        let next = t + 1;
        let tr = DiploidTransition::new(inputs.recomb[next], n);
        inputs
            .emissions
            .fill_diploid(&genotypes, next, query[next], &mut ws.emit);

        let (next_row, row) = bwd.row_pair_mut(next, t);
        ws.aggregates.reset(n);
        for (state, (tmp, (&b, &e))) in ws.tmp.iter_mut().zip(next_row.iter().zip(&ws.emit)).enumerate() {
            *tmp = b * e;
            ws.aggregates.add(state / n, state % n, *tmp);
        }
        let divisor = scale[next];
        for (state, out) in row.iter_mut().enumerate() {
            *out = ws.aggregates.transition(&tr, state / n, state % n, ws.tmp[state]) / divisor;
        }
    }
    Ok(bwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scaling;
    use crate::data::panel::ReferencePanel;
    use crate::model::emission::EmissionTable;
    use crate::model::forward::{forward_diploid, forward_haploid};

    fn assert_consistent(fwd: &ProbMatrix, bwd: &ProbMatrix, expected: f64) {
        for t in 0..fwd.n_sites() {
            let total: f64 = fwd.row(t).iter().zip(bwd.row(t)).map(|(f, b)| f * b).sum();
            assert!(
                (total - expected).abs() < 1e-9 * expected.max(1.0),
                "site {}: {} != {}",
                t,
                total,
                expected
            );
        }
    }

    #[test]
    fn test_haploid_forward_backward_consistency() {
        let panel = ReferencePanel::from_rows(&[
            vec![0, 1, 1, 0, 1, 0],
            vec![1, 1, 0, 0, 1, 0],
            vec![0, 0, 1, 1, 1, 1],
            vec![1, 0, 1, 0, 0, 1],
            vec![1, 1, 1, 0, 0, 0],
        ])
        .unwrap();
        let emissions = EmissionTable::haploid(&vec![[0.02, 0.98]; 5]);
        let recomb = [0.0, 0.1, 0.2, 0.05, 0.4];
        let inputs = HmmInputs::new(&panel, &emissions, &recomb);
        let query = [1, 0, 1, 1, 0];

        let fwd = forward_haploid(inputs, &query, Scaling::Normalised).unwrap();
        let bwd = backward_haploid(inputs, &query, &fwd.scale).unwrap();
        assert_consistent(&fwd.matrix, &bwd, 1.0);

        let raw = forward_haploid(inputs, &query, Scaling::Unscaled).unwrap();
        let raw_bwd = backward_haploid(inputs, &query, &raw.scale).unwrap();
        assert_consistent(&raw.matrix, &raw_bwd, 10f64.powf(raw.log_likelihood));
    }

    #[test]
    fn test_diploid_forward_backward_consistency() {
        let panel = ReferencePanel::from_rows(&[
            vec![0, 1, 1, 0],
            vec![1, 1, 0, 0],
            vec![0, 0, 1, 1],
            vec![1, 0, 1, 0],
        ])
        .unwrap();
        let row = [1e-4, 0.02, 0.0099, 1.0, 0.98, 0.0, 0.0, 0.9802];
        let emissions = EmissionTable::diploid(&vec![row; 4]);
        let recomb = [0.0, 0.1, 0.3, 0.02];
        let inputs = HmmInputs::new(&panel, &emissions, &recomb);
        let query = crate::data::query::Query::diploid_from_haplotypes(&[0, 1, 1, 0], &[1, 1, 0, 0]).unwrap();
        let genotypes = match query {
            crate::data::query::Query::Diploid(g) => g,
            _ => unreachable!(),
        };

        let fwd = forward_diploid(inputs, &genotypes, Scaling::Normalised).unwrap();
        let bwd = backward_diploid(inputs, &genotypes, &fwd.scale).unwrap();
        assert_eq!(bwd.n_states(), 16);
        assert_consistent(&fwd.matrix, &bwd, 1.0);
    }

    #[test]
    fn test_scale_factor_checks() {
        let panel = ReferencePanel::from_rows(&[vec![0, 1], vec![0, 1]]).unwrap();
        let emissions = EmissionTable::haploid(&vec![[0.1, 0.9]; 2]);
        let recomb = [0.0, 0.1];
        let inputs = HmmInputs::new(&panel, &emissions, &recomb);

        assert!(matches!(
            backward_haploid(inputs, &[0, 1], &[1.0]),
            Err(LsError::ShapeMismatch { .. })
        ));
        assert_eq!(
            backward_haploid(inputs, &[0, 1], &[1.0, 0.0]).unwrap_err(),
            LsError::ZeroLikelihood { site: 1 }
        );
    }
}
