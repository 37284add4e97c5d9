//! # Viterbi Recursion
//!
//! Max-product analogue of the forward pass. Before site `t` is computed the
//! previous row is divided by its maximum `c[t]`, so the best predecessor
//! always has value 1 and
//!
//! ```text
//! log10 P(best path) = Σ_{t>=1} log10 c[t] + log10 max V[m-1]
//! ```
//!
//! ## Arrival Rules
//! Because every recombination lands uniformly, the best way to reach a state
//! is either to stay, or to jump from the single best predecessor:
//!
//! - **Haploid:** stay with `V[i] * stay`, unless the jump `1 * r/n` is
//!   strictly larger.
//! - **Diploid:** staying costs `no_switch`. A single switch keeps one strand
//!   and comes from the best state in that strand's row (first strand kept) or
//!   column (second strand kept); the first strand wins ties. A double switch
//!   comes from the global best state. The single switch is considered only
//!   when strictly better than the double switch, and either replaces staying
//!   only when strictly larger.
//!
//! Every argmax resolves ties to the lowest index.
//!
//! ## Memory
//! [`ViterbiMemory::Full`] keeps every value row and an explicit predecessor
//! per state. [`ViterbiMemory::LowMemory`] keeps one value row plus an
//! `O(n)` summary per site:
//!
//! - **Haploid:** the best predecessor and one bit per state marking whether
//!   it arrived by recombination.
//! - **Diploid:** the best predecessor, the row/column maxima and their
//!   argmaxima, the scale factor, and what is needed to recompute a single
//!   state's emission (per-dosage emissions plus a bit-packed panel). During
//!   traceback the value of the path state at the previous site is replayed
//!   from site 0 with exactly the sweep's arithmetic, once per path segment.
//!
//! Both modes make identical decisions.

use bitvec::prelude::*;

use crate::config::ViterbiMemory;
use crate::data::panel::PhasedGenotypes;
use crate::data::query::Genotype;
use crate::error::{LsError, Result};
use crate::model::matrix::{argmax, ProbMatrix};
use crate::model::transition::{DiploidTransition, Transition};
use crate::model::HmmInputs;
use crate::utils::workspace::Workspace;

/// How the best path reaches a state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arrival {
    Stay,
    /// One strand switched; carries the predecessor state
    Single(usize),
    /// Both strands switched; carries the predecessor state
    Double(usize),
}

/// Per-site summary kept by low-memory haploid Viterbi
#[derive(Clone, Debug, PartialEq)]
pub struct HaploidSummary {
    n_haps: usize,
    /// Best state of the previous site, per site
    jump_source: Vec<u32>,
    /// Bit `t * n + i` set when state `i` at site `t` arrived by recombination
    recombined: BitVec<u64, Lsb0>,
}

/// Per-site summary kept by low-memory diploid Viterbi.
///
/// Everything here is `O(n_sites * n_haps)`; no per-state decision is
/// stored. The panel must be biallelic.
#[derive(Clone, Debug, PartialEq)]
pub struct DiploidSummary {
    n_haps: usize,
    /// Best state of the previous site, per site
    best_state: Vec<u32>,
    /// Row maxima / argmaxima of the previous site, `n_sites x n`
    row_max: Vec<f64>,
    row_arg: Vec<u32>,
    /// Column maxima / argmaxima of the previous site, `n_sites x n`
    col_max: Vec<f64>,
    col_arg: Vec<u32>,
    /// Maximum of the previous row, per site
    scale: Vec<f64>,
    recomb: Vec<f64>,
    /// Emission of hidden dosage 0, 1 and 2, per site
    emit_by_dosage: Vec<[f64; 3]>,
    /// Bit `t * n + i` set when haplotype `i` carries allele 1 at site `t`
    alt: BitVec<u64, Lsb0>,
}

impl DiploidSummary {
    fn new(inputs: HmmInputs<'_>, query: &[Genotype]) -> Self {
        let n_sites = query.len();
        let n = inputs.panel.n_haps();
        let mut alt = bitvec![u64, Lsb0; 0; n_sites * n];
        for t in 0..n_sites {
            for (i, &a) in inputs.panel.site(t).iter().enumerate() {
                alt.set(t * n + i, a == 1);
            }
        }
        Self {
            n_haps: n,
            best_state: vec![0; n_sites],
            row_max: vec![0.0; n_sites * n],
            row_arg: vec![0; n_sites * n],
            col_max: vec![0.0; n_sites * n],
            col_arg: vec![0; n_sites * n],
            scale: vec![1.0; n_sites],
            recomb: inputs.recomb[..n_sites].to_vec(),
            emit_by_dosage: query
                .iter()
                .enumerate()
                .map(|(t, &g)| inputs.emissions.diploid_by_dosage(t, g))
                .collect(),
            alt,
        }
    }

    /// Number of stored values, counting the packed panel by its words
    pub fn stored_values(&self) -> usize {
        self.best_state.len()
            + self.row_max.len()
            + self.row_arg.len()
            + self.col_max.len()
            + self.col_arg.len()
            + self.scale.len()
            + self.recomb.len()
            + 3 * self.emit_by_dosage.len()
            + self.alt.as_raw_slice().len()
    }

    fn n_sites(&self) -> usize {
        self.scale.len()
    }

    fn maxima(&self, site: usize) -> GridMaxima<'_> {
        let range = site * self.n_haps..(site + 1) * self.n_haps;
        GridMaxima {
            row_max: &self.row_max[range.clone()],
            row_arg: &self.row_arg[range.clone()],
            col_max: &self.col_max[range.clone()],
            col_arg: &self.col_arg[range],
        }
    }

    #[inline]
    fn emission(&self, site: usize, state: usize) -> f64 {
        let base = site * self.n_haps;
        let dosage = self.alt[base + state / self.n_haps] as usize + self.alt[base + state % self.n_haps] as usize;
        self.emit_by_dosage[site][dosage]
    }

    /// Arrival into `state` at `site` from its own value at `site - 1`
    fn arrival(&self, site: usize, state: usize, previous: f64) -> Arrival {
        let n = self.n_haps;
        let tr = DiploidTransition::new(self.recomb[site], n);
        // The best predecessor is exactly 1 after rescaling.
        let (_, arrival) = diploid_arrival(
            previous / self.scale[site],
            &tr,
            &self.maxima(site),
            self.best_state[site] as usize,
            1.0,
            state,
            n,
        );
        arrival
    }

    /// Values of `state` at sites `0..upto`, as the sweep computed them
    fn replay(&self, state: usize, upto: usize) -> Vec<f64> {
        let mut column = Vec::with_capacity(upto);
        if upto == 0 {
            return column;
        }
        let n = self.n_haps;
        let prior = 1.0 / (n * n) as f64;
        let mut value = prior * self.emission(0, state);
        column.push(value);
        for t in 1..upto {
            let tr = DiploidTransition::new(self.recomb[t], n);
            let (v, _) = diploid_arrival(
                value / self.scale[t],
                &tr,
                &self.maxima(t),
                self.best_state[t] as usize,
                1.0,
                state,
                n,
            );
            value = v * self.emission(t, state);
            column.push(value);
        }
        column
    }

    fn predecessor(&self, site: usize, state: usize) -> usize {
        let column = self.replay(state, site);
        arrival_source(self.arrival(site, state, column[site - 1]), state)
    }

    /// Walk back from `terminal`, replaying one column per path segment
    fn trace(&self, terminal: usize) -> Vec<usize> {
        let n_sites = self.n_sites();
        let mut path = vec![0; n_sites];
        if n_sites == 0 {
            return path;
        }
        let mut state = terminal;
        path[n_sites - 1] = state;
        let mut column = self.replay(state, n_sites - 1);
        for t in (1..n_sites).rev() {
            let pred = arrival_source(self.arrival(t, state, column[t - 1]), state);
            if pred != state {
                state = pred;
                column = self.replay(state, t - 1);
            }
            path[t - 1] = state;
        }
        path
    }
}

/// Information needed to walk the best path backward
#[derive(Clone, Debug, PartialEq)]
pub enum Traceback {
    /// Explicit predecessor for every `(site, state)`; row 0 is unused
    Pointers { n_states: usize, pointers: Vec<u32> },
    Haploid(HaploidSummary),
    Diploid(DiploidSummary),
}

impl Traceback {
    /// State at `site - 1` from which the best path reached `state` at `site`.
    ///
    /// For a diploid summary this replays `state` from site 0; use
    /// [`Traceback::trace`] to walk a whole path.
    pub fn predecessor(&self, site: usize, state: usize) -> usize {
        match self {
            Traceback::Pointers { n_states, pointers } => pointers[site * n_states + state] as usize,
            Traceback::Haploid(s) => {
                if s.recombined[site * s.n_haps + state] {
                    s.jump_source[site] as usize
                } else {
                    state
                }
            }
            Traceback::Diploid(s) => s.predecessor(site, state),
        }
    }

    /// Best state per site, ending in `terminal` at the last of `n_sites`
    pub fn trace(&self, terminal: usize, n_sites: usize) -> Vec<usize> {
        if let Traceback::Diploid(s) = self {
            return s.trace(terminal);
        }
        let mut path = vec![0; n_sites];
        if n_sites == 0 {
            return path;
        }
        let mut state = terminal;
        path[n_sites - 1] = state;
        for t in (1..n_sites).rev() {
            state = self.predecessor(t, state);
            path[t - 1] = state;
        }
        path
    }
}

/// Row and column maxima of the previous diploid grid
struct GridMaxima<'a> {
    row_max: &'a [f64],
    row_arg: &'a [u32],
    col_max: &'a [f64],
    col_arg: &'a [u32],
}

impl<'a> GridMaxima<'a> {
    fn from_workspace(ws: &'a Workspace) -> Self {
        Self {
            row_max: &ws.row_max,
            row_arg: &ws.row_arg,
            col_max: &ws.col_max,
            col_arg: &ws.col_arg,
        }
    }

    /// Best single-switch predecessor of `(j1, j2)` and its value
    #[inline]
    fn single_switch_source(&self, j1: usize, j2: usize, n: usize) -> (f64, usize) {
        if self.row_max[j1] >= self.col_max[j2] {
            (self.row_max[j1], j1 * n + self.row_arg[j1] as usize)
        } else {
            (self.col_max[j2], self.col_arg[j2] as usize * n + j2)
        }
    }
}

/// Best value and arrival into `state`, given its own rescaled previous
/// value and the previous grid's maxima (`top` is the global maximum, at
/// `best`)
#[inline]
fn diploid_arrival(
    previous: f64,
    tr: &DiploidTransition,
    maxima: &GridMaxima<'_>,
    best: usize,
    top: f64,
    state: usize,
    n: usize,
) -> (f64, Arrival) {
    let (single_best, single_pred) = maxima.single_switch_source(state / n, state % n, n);
    let single = tr.single_switch() * single_best;
    let double = tr.double_switch() * top;

    let mut value = previous * tr.no_switch();
    let mut arrival = Arrival::Stay;
    if single > double {
        if value < single {
            value = single;
            arrival = Arrival::Single(single_pred);
        }
    } else if value < double {
        value = double;
        arrival = Arrival::Double(best);
    }
    (value, arrival)
}

#[inline]
fn arrival_source(arrival: Arrival, state: usize) -> usize {
    match arrival {
        Arrival::Stay => state,
        Arrival::Single(p) | Arrival::Double(p) => p,
    }
}

/// Viterbi forward sweep output
#[derive(Clone, Debug, PartialEq)]
pub struct ViterbiResult {
    /// Value rows per site, each relative to the previous site's maximum
    /// (full memory only)
    pub values: Option<ProbMatrix>,
    /// Values at the final site
    pub last_row: Vec<f64>,
    pub traceback: Traceback,
    /// Maximum of the previous row, per site; `scale[0] = 1`
    pub scale: Vec<f64>,
    /// Base-10 log-probability of the best path
    pub log_likelihood: f64,
}

/// Receives each decision of the sweep
trait Recorder {
    fn begin_site(&mut self, _t: usize, _best: usize, _max: f64, _ws: &Workspace) {}
    fn record(&mut self, t: usize, state: usize, arrival: Arrival);
    fn end_site(&mut self, _t: usize, _row: &[f64]) {}
    fn into_parts(self) -> (Option<ProbMatrix>, Traceback);
}

struct PointerRecorder {
    n_states: usize,
    pointers: Vec<u32>,
    values: ProbMatrix,
}

impl PointerRecorder {
    fn new(n_sites: usize, n_states: usize) -> Self {
        Self {
            n_states,
            pointers: vec![0; n_sites * n_states],
            values: ProbMatrix::zeros(n_sites, n_states),
        }
    }
}

impl Recorder for PointerRecorder {
    fn record(&mut self, t: usize, state: usize, arrival: Arrival) {
        self.pointers[t * self.n_states + state] = arrival_source(arrival, state) as u32;
    }

    fn end_site(&mut self, t: usize, row: &[f64]) {
        self.values.row_mut(t).copy_from_slice(row);
    }

    fn into_parts(self) -> (Option<ProbMatrix>, Traceback) {
        (
            Some(self.values),
            Traceback::Pointers {
                n_states: self.n_states,
                pointers: self.pointers,
            },
        )
    }
}

impl Recorder for HaploidSummary {
    fn begin_site(&mut self, t: usize, best: usize, _max: f64, _ws: &Workspace) {
        self.jump_source[t] = best as u32;
    }

    fn record(&mut self, t: usize, state: usize, arrival: Arrival) {
        if arrival != Arrival::Stay {
            self.recombined.set(t * self.n_haps + state, true);
        }
    }

    fn into_parts(self) -> (Option<ProbMatrix>, Traceback) {
        (None, Traceback::Haploid(self))
    }
}

impl Recorder for DiploidSummary {
    fn begin_site(&mut self, t: usize, best: usize, max: f64, ws: &Workspace) {
        let n = self.n_haps;
        let range = t * n..(t + 1) * n;
        self.best_state[t] = best as u32;
        self.scale[t] = max;
        self.row_max[range.clone()].copy_from_slice(&ws.row_max);
        self.row_arg[range.clone()].copy_from_slice(&ws.row_arg);
        self.col_max[range.clone()].copy_from_slice(&ws.col_max);
        self.col_arg[range].copy_from_slice(&ws.col_arg);
    }

    fn record(&mut self, _t: usize, _state: usize, _arrival: Arrival) {}

    fn into_parts(self) -> (Option<ProbMatrix>, Traceback) {
        (None, Traceback::Diploid(self))
    }
}

/// Divide `row` by its maximum; returns `(argmax, max)`
fn rescale_by_max(row: &mut [f64], site: usize) -> Result<(usize, f64)> {
    let (best, max) = argmax(row);
    if !(max > 0.0) || !max.is_finite() {
        tracing::debug!(site, "viterbi pass reached a zero-probability site");
        return Err(LsError::ZeroLikelihood { site });
    }
    row.iter_mut().for_each(|v| *v /= max);
    Ok((best, max))
}

fn finish<R: Recorder>(recorder: R, row: Vec<f64>, scale: Vec<f64>) -> Result<ViterbiResult> {
    let n_sites = scale.len();
    let (_, last_max) = argmax(&row);
    if !(last_max > 0.0) || !last_max.is_finite() {
        return Err(LsError::ZeroLikelihood {
            site: n_sites.saturating_sub(1),
        });
    }
    let log_likelihood = scale.iter().skip(1).map(|c| c.log10()).sum::<f64>() + last_max.log10();
    let (values, traceback) = recorder.into_parts();
    Ok(ViterbiResult {
        values,
        last_row: row,
        traceback,
        scale,
        log_likelihood,
    })
}

fn sweep_haploid<R: Recorder>(inputs: HmmInputs<'_>, query: &[u8], mut recorder: R) -> Result<ViterbiResult> {
    let n_sites = query.len();
    let n = inputs.panel.n_haps();
    let mut ws = Workspace::new(n, n);
    let mut row = vec![0.0; n];
    let mut scale = vec![1.0; n_sites];

    inputs
        .emissions
        .fill_haploid(0, inputs.panel.site(0), query[0], &mut ws.emit);
    let prior = 1.0 / n as f64;
    for (v, &e) in row.iter_mut().zip(&ws.emit) {
        *v = prior * e;
    }
    recorder.end_site(0, &row);

    for t in 1..n_sites {
        let (best, max) = rescale_by_max(&mut row, t - 1)?;
        scale[t] = max;
        recorder.begin_site(t, best, max, &ws);

        let tr = Transition::new(inputs.recomb[t], n);
        let jump = tr.jump * row[best];
        let stay = tr.stay();
        inputs
            .emissions
            .fill_haploid(t, inputs.panel.site(t), query[t], &mut ws.emit);
        for (i, (v, &e)) in row.iter_mut().zip(&ws.emit).enumerate() {
            let mut value = *v * stay;
            let mut arrival = Arrival::Stay;
            if value < jump {
                value = jump;
                arrival = Arrival::Single(best);
            }
            *v = value * e;
            recorder.record(t, i, arrival);
        }
        recorder.end_site(t, &row);
    }

    finish(recorder, row, scale)
}

fn sweep_diploid<R: Recorder>(
    inputs: HmmInputs<'_>,
    genotypes: &PhasedGenotypes<'_>,
    query: &[Genotype],
    mut recorder: R,
) -> Result<ViterbiResult> {
    let n_sites = query.len();
    let n = inputs.panel.n_haps();
    let mut ws = Workspace::new(n, n * n);
    let mut row = vec![0.0; n * n];
    let mut scale = vec![1.0; n_sites];

    inputs.emissions.fill_diploid(genotypes, 0, query[0], &mut ws.emit);
    let prior = 1.0 / (n * n) as f64;
    for (v, &e) in row.iter_mut().zip(&ws.emit) {
        *v = prior * e;
    }
    recorder.end_site(0, &row);

    for t in 1..n_sites {
        let (best, max) = rescale_by_max(&mut row, t - 1)?;
        scale[t] = max;
        ws.fill_grid_maxima(&row, n);
        recorder.begin_site(t, best, max, &ws);

        let tr = DiploidTransition::new(inputs.recomb[t], n);
        let top = row[best];
        inputs.emissions.fill_diploid(genotypes, t, query[t], &mut ws.emit);
        let maxima = GridMaxima::from_workspace(&ws);
        for state in 0..n * n {
            let (value, arrival) = diploid_arrival(row[state], &tr, &maxima, best, top, state, n);
            row[state] = value * ws.emit[state];
            recorder.record(t, state, arrival);
        }
        recorder.end_site(t, &row);
    }

    finish(recorder, row, scale)
}

/// Haploid Viterbi sweep
pub fn viterbi_haploid(inputs: HmmInputs<'_>, query: &[u8], memory: ViterbiMemory) -> Result<ViterbiResult> {
    let n_sites = query.len();
    let n = inputs.panel.n_haps();
    match memory {
        ViterbiMemory::Full => {
            let _span = tracing::info_span!("viterbi_haploid_full", n_sites).entered();
            sweep_haploid(inputs, query, PointerRecorder::new(n_sites, n))
        }
        ViterbiMemory::LowMemory => {
            let _span = tracing::info_span!("viterbi_haploid_low_mem", n_sites).entered();
            let summary = HaploidSummary {
                n_haps: n,
                jump_source: vec![0; n_sites],
                recombined: bitvec![u64, Lsb0; 0; n_sites * n],
            };
            sweep_haploid(inputs, query, summary)
        }
    }
}

/// Diploid Viterbi sweep over ordered haplotype pairs
pub fn viterbi_diploid(inputs: HmmInputs<'_>, query: &[Genotype], memory: ViterbiMemory) -> Result<ViterbiResult> {
    let n_sites = query.len();
    let n = inputs.panel.n_haps();
    let genotypes = inputs.panel.phased_genotypes();
    match memory {
        ViterbiMemory::Full => {
            let _span = tracing::info_span!("viterbi_diploid_full", n_sites).entered();
            sweep_diploid(inputs, &genotypes, query, PointerRecorder::new(n_sites, n * n))
        }
        ViterbiMemory::LowMemory => {
            let _span = tracing::info_span!("viterbi_diploid_low_mem", n_sites).entered();
            sweep_diploid(inputs, &genotypes, query, DiploidSummary::new(inputs, query))
        }
    }
}
