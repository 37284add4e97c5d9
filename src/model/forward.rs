//! # Forward Recursion
//!
//! Scaled forward pass of the Li-Stephens HMM for haploid and diploid
//! queries.
//!
//! ## Scaling
//! With [`Scaling::Normalised`] each site's values are divided by their sum
//! `c[t]`, so every stored row sums to 1 and
//!
//! ```text
//! log10 P(query) = Σ_t log10 c[t]
//! ```
//!
//! With [`Scaling::Unscaled`] every `c[t]` is 1 and the likelihood is the sum
//! of the final row. The backward pass consumes `c` unchanged in both modes.
//!
//! ## Cost
//! Haploid sites cost `O(n)`. Diploid sites touch `n^2` states but each state
//! costs `O(1)`: the sum over the `n^2` predecessors is replaced by the
//! previous grid's row sums, column sums and total (see
//! [`crate::model::transition`]), which are accumulated while the grid is
//! written.

use crate::config::Scaling;
use crate::data::panel::PhasedGenotypes;
use crate::data::query::Genotype;
use crate::error::{LsError, Result};
use crate::model::hmm::HmmUpdater;
use crate::model::matrix::ProbMatrix;
use crate::model::transition::{DiploidTransition, Transition};
use crate::model::HmmInputs;
use crate::utils::workspace::Workspace;

/// Full forward pass output
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardResult {
    /// Scaled forward values, `n_sites x n_states`
    pub matrix: ProbMatrix,
    /// Per-site scale factors (all 1 when unscaled)
    pub scale: Vec<f64>,
    /// Base-10 log-likelihood of the query
    pub log_likelihood: f64,
}

impl ForwardResult {
    /// Posterior state probabilities, `F[t] * B[t]` normalised per site
    pub fn posteriors(&self, backward: &ProbMatrix) -> Result<ProbMatrix> {
        if backward.n_sites() != self.matrix.n_sites() || backward.n_states() != self.matrix.n_states() {
            return Err(LsError::shape(format!(
                "backward matrix is {}x{}, forward is {}x{}",
                backward.n_sites(),
                backward.n_states(),
                self.matrix.n_sites(),
                self.matrix.n_states()
            )));
        }
        let mut post = ProbMatrix::zeros(self.matrix.n_sites(), self.matrix.n_states());
        for t in 0..self.matrix.n_sites() {
            let out = post.row_mut(t);
            let mut total = 0.0;
            for ((o, &f), &b) in out.iter_mut().zip(self.matrix.row(t)).zip(backward.row(t)) {
                *o = f * b;
                total += *o;
            }
            if !(total > 0.0) {
                return Err(LsError::ZeroLikelihood { site: t });
            }
            out.iter_mut().for_each(|v| *v /= total);
        }
        Ok(post)
    }
}

/// Forward pass output when only the final row is kept
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardSummary {
    pub last_row: Vec<f64>,
    pub scale: Vec<f64>,
    pub log_likelihood: f64,
}

/// One ploidy's site update, driven by [`run_forward`].
trait ForwardStep {
    fn n_haps(&self) -> usize;
    fn n_states(&self) -> usize;
    fn n_sites(&self) -> usize;

    /// Write the first site's unscaled values; return their sum
    fn init(&self, row: &mut [f64], ws: &mut Workspace) -> f64;

    /// Replace `row` (previous site, total mass `prev_total`) with site `t`'s
    /// unscaled values; return their sum
    fn advance(&self, t: usize, row: &mut [f64], prev_total: f64, ws: &mut Workspace) -> f64;

    /// Called once the site has been divided by `divisor`
    fn finish_site(&self, _divisor: f64, _ws: &mut Workspace) {}
}

struct HaploidStep<'a> {
    inputs: HmmInputs<'a>,
    query: &'a [u8],
}

impl ForwardStep for HaploidStep<'_> {
    fn n_haps(&self) -> usize {
        self.inputs.panel.n_haps()
    }

    fn n_states(&self) -> usize {
        self.inputs.panel.n_haps()
    }

    fn n_sites(&self) -> usize {
        self.query.len()
    }

    fn init(&self, row: &mut [f64], ws: &mut Workspace) -> f64 {
        let n = self.n_haps();
        self.inputs
            .emissions
            .fill_haploid(0, self.inputs.panel.site(0), self.query[0], &mut ws.emit);
        let prior = 1.0 / n as f64;
        let mut sum = 0.0;
        for (v, &e) in row.iter_mut().zip(&ws.emit) {
            *v = prior * e;
            sum += *v;
        }
        sum
    }

    fn advance(&self, t: usize, row: &mut [f64], prev_total: f64, ws: &mut Workspace) -> f64 {
        let tr = Transition::new(self.inputs.recomb[t], self.n_haps());
        self.inputs
            .emissions
            .fill_haploid(t, self.inputs.panel.site(t), self.query[t], &mut ws.emit);
        HmmUpdater::fwd_update(row, tr.no_recomb(), tr.jump * prev_total, &ws.emit)
    }
}

struct DiploidStep<'a> {
    inputs: HmmInputs<'a>,
    genotypes: PhasedGenotypes<'a>,
    query: &'a [Genotype],
}

impl ForwardStep for DiploidStep<'_> {
    fn n_haps(&self) -> usize {
        self.inputs.panel.n_haps()
    }

    fn n_states(&self) -> usize {
        self.n_haps() * self.n_haps()
    }

    fn n_sites(&self) -> usize {
        self.query.len()
    }

    fn init(&self, row: &mut [f64], ws: &mut Workspace) -> f64 {
        let n = self.n_haps();
        self.inputs
            .emissions
            .fill_diploid(&self.genotypes, 0, self.query[0], &mut ws.emit);
        let prior = 1.0 / (n * n) as f64;
        for (state, (v, &e)) in row.iter_mut().zip(&ws.emit).enumerate() {
            *v = prior * e;
            ws.next_aggregates.add(state / n, state % n, *v);
        }
        ws.next_aggregates.total
    }

    fn advance(&self, t: usize, row: &mut [f64], _prev_total: f64, ws: &mut Workspace) -> f64 {
        let n = self.n_haps();
        let tr = DiploidTransition::new(self.inputs.recomb[t], n);
        self.inputs
            .emissions
            .fill_diploid(&self.genotypes, t, self.query[t], &mut ws.emit);
        let Workspace {
            emit,
            aggregates,
            next_aggregates,
            ..
        } = ws;
        for i in 0..n {
            for j in 0..n {
                let state = i * n + j;
                let v = emit[state] * aggregates.transition(&tr, i, j, row[state]);
                row[state] = v;
                next_aggregates.add(i, j, v);
            }
        }
        next_aggregates.total
    }

    fn finish_site(&self, divisor: f64, ws: &mut Workspace) {
        ws.next_aggregates.rescale(divisor);
        ws.advance_aggregates();
    }
}

/// Drive a forward recursion, handing each finished (scaled) row to `on_row`.
fn run_forward<S: ForwardStep>(
    step: &S,
    scaling: Scaling,
    mut on_row: impl FnMut(usize, &[f64]),
) -> Result<ForwardSummary> {
    let n_sites = step.n_sites();
    let mut ws = Workspace::new(step.n_haps(), step.n_states());
    let mut row = vec![0.0; step.n_states()];
    let mut scale = vec![1.0; n_sites];
    let normalised = scaling == Scaling::Normalised;

    let mut sum = 0.0;
    let mut prev_total = 1.0;
    for t in 0..n_sites {
        sum = if t == 0 {
            step.init(&mut row, &mut ws)
        } else {
            step.advance(t, &mut row, prev_total, &mut ws)
        };
        if !(sum > 0.0) || !sum.is_finite() {
            tracing::debug!(site = t, sum, "forward pass reached a zero-probability site");
            return Err(LsError::ZeroLikelihood { site: t });
        }
        if normalised {
            scale[t] = sum;
            row.iter_mut().for_each(|v| *v /= sum);
            step.finish_site(sum, &mut ws);
            prev_total = 1.0;
        } else {
            step.finish_site(1.0, &mut ws);
            prev_total = sum;
        }
        on_row(t, &row);
    }

    let log_likelihood = if normalised {
        scale.iter().map(|c| c.log10()).sum()
    } else {
        sum.log10()
    };

    Ok(ForwardSummary {
        last_row: row,
        scale,
        log_likelihood,
    })
}

fn collect_matrix<S: ForwardStep>(step: &S, scaling: Scaling) -> Result<ForwardResult> {
    let mut matrix = ProbMatrix::zeros(step.n_sites(), step.n_states());
    let summary = run_forward(step, scaling, |t, row| matrix.row_mut(t).copy_from_slice(row))?;
    Ok(ForwardResult {
        matrix,
        scale: summary.scale,
        log_likelihood: summary.log_likelihood,
    })
}

/// Haploid forward pass keeping the full matrix
pub fn forward_haploid(inputs: HmmInputs<'_>, query: &[u8], scaling: Scaling) -> Result<ForwardResult> {
    let _span = tracing::info_span!("forward_haploid", n_sites = query.len()).entered();
    collect_matrix(&HaploidStep { inputs, query }, scaling)
}

/// Haploid forward pass keeping only the final row
pub fn forward_haploid_summary(inputs: HmmInputs<'_>, query: &[u8], scaling: Scaling) -> Result<ForwardSummary> {
    let _span = tracing::info_span!("forward_haploid_summary", n_sites = query.len()).entered();
    run_forward(&HaploidStep { inputs, query }, scaling, |_, _| {})
}

/// Diploid forward pass keeping the full `n_sites x n^2` matrix
pub fn forward_diploid(inputs: HmmInputs<'_>, query: &[Genotype], scaling: Scaling) -> Result<ForwardResult> {
    let _span = tracing::info_span!("forward_diploid", n_sites = query.len()).entered();
    let step = DiploidStep {
        inputs,
        genotypes: inputs.panel.phased_genotypes(),
        query,
    };
    collect_matrix(&step, scaling)
}

/// Diploid forward pass keeping only the final row
pub fn forward_diploid_summary(
    inputs: HmmInputs<'_>,
    query: &[Genotype],
    scaling: Scaling,
) -> Result<ForwardSummary> {
    let _span = tracing::info_span!("forward_diploid_summary", n_sites = query.len()).entered();
    let step = DiploidStep {
        inputs,
        genotypes: inputs.panel.phased_genotypes(),
        query,
    };
    run_forward(&step, scaling, |_, _| {})
}
