//! # Inference Pipeline
//!
//! Orchestrates one inference call:
//! 1. Validate panel, query, emission table and recombination vector
//! 2. Dispatch on the query's ploidy
//! 3. Run the recursion chosen by the configuration
//! 4. Decode (Viterbi) or hand back the scaled matrices
//!
//! Batch methods run the same steps for many queries against one panel on a
//! rayon pool. Queries share only read-only inputs.

use rayon::prelude::*;
use tracing::instrument;

use crate::config::InferenceConfig;
use crate::data::panel::ReferencePanel;
use crate::data::query::Query;
use crate::data::StatePath;
use crate::error::{LsError, Result};
use crate::model::backward::{backward_diploid, backward_haploid};
use crate::model::decoder::{decode_diploid, decode_haploid};
use crate::model::emission::EmissionTable;
use crate::model::forward::{
    forward_diploid, forward_diploid_summary, forward_haploid, forward_haploid_summary, ForwardResult,
};
use crate::model::matrix::ProbMatrix;
use crate::model::path::{diploid_path_log_likelihood, haploid_path_log_likelihood};
use crate::model::viterbi::{viterbi_diploid, viterbi_haploid, ViterbiResult};
use crate::model::HmmInputs;
use crate::pipelines::validation::validate_inputs;
use crate::utils::threading::build_thread_pool;

/// Decoded best path and its base-10 log-probability
#[derive(Clone, Debug, PartialEq)]
pub struct ViterbiPath {
    pub path: StatePath,
    pub log_likelihood: f64,
}

/// Li-Stephens inference against one configuration
#[derive(Clone, Debug, Default)]
pub struct Inference {
    config: InferenceConfig,
}

fn record_shape(panel: &ReferencePanel) {
    tracing::Span::current().record("n_sites", panel.n_sites());
    tracing::Span::current().record("n_haps", panel.n_haps());
}

impl Inference {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Scaled forward matrix, scale factors and log-likelihood
    #[instrument(skip_all, fields(n_sites, n_haps))]
    pub fn forward(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<ForwardResult> {
        validate_inputs(panel, query, emissions, recomb)?;
        record_shape(panel);
        let inputs = HmmInputs::new(panel, emissions, recomb);
        match query {
            Query::Haploid(alleles) => forward_haploid(inputs, alleles, self.config.scaling),
            Query::Diploid(genotypes) => forward_diploid(inputs, genotypes, self.config.scaling),
        }
    }

    /// Query log-likelihood without keeping the forward matrix
    #[instrument(skip_all, fields(n_sites, n_haps))]
    pub fn log_likelihood(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<f64> {
        validate_inputs(panel, query, emissions, recomb)?;
        record_shape(panel);
        let inputs = HmmInputs::new(panel, emissions, recomb);
        let summary = match query {
            Query::Haploid(alleles) => forward_haploid_summary(inputs, alleles, self.config.scaling)?,
            Query::Diploid(genotypes) => forward_diploid_summary(inputs, genotypes, self.config.scaling)?,
        };
        Ok(summary.log_likelihood)
    }

    /// Scaled backward matrix using the forward pass's scale factors
    #[instrument(skip_all, fields(n_sites, n_haps))]
    pub fn backward(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        emissions: &EmissionTable,
        scale: &[f64],
        recomb: &[f64],
    ) -> Result<ProbMatrix> {
        validate_inputs(panel, query, emissions, recomb)?;
        record_shape(panel);
        let inputs = HmmInputs::new(panel, emissions, recomb);
        match query {
            Query::Haploid(alleles) => backward_haploid(inputs, alleles, scale),
            Query::Diploid(genotypes) => backward_diploid(inputs, genotypes, scale),
        }
    }

    /// Raw Viterbi sweep: values (full memory), traceback and scale factors
    #[instrument(skip_all, fields(n_sites, n_haps))]
    pub fn viterbi_matrices(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<ViterbiResult> {
        validate_inputs(panel, query, emissions, recomb)?;
        record_shape(panel);
        self.sweep(panel, query, emissions, recomb)
    }

    /// Most probable path (phased, for diploid queries) and its log-probability
    #[instrument(skip_all, fields(n_sites, n_haps))]
    pub fn viterbi(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<ViterbiPath> {
        validate_inputs(panel, query, emissions, recomb)?;
        record_shape(panel);
        let result = self.sweep(panel, query, emissions, recomb)?;
        let path = match query {
            Query::Haploid(_) => StatePath::Haploid(decode_haploid(&result)),
            Query::Diploid(_) => StatePath::Diploid(decode_diploid(&result, panel.n_haps())),
        };
        Ok(ViterbiPath {
            path,
            log_likelihood: result.log_likelihood,
        })
    }

    fn sweep(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<ViterbiResult> {
        let inputs = HmmInputs::new(panel, emissions, recomb);
        let memory = self.config.viterbi_memory;
        match query {
            Query::Haploid(alleles) => viterbi_haploid(inputs, alleles, memory),
            Query::Diploid(genotypes) => viterbi_diploid(inputs, genotypes, memory),
        }
    }

    /// Exact log-probability of a fixed path
    #[instrument(skip_all, fields(n_sites, n_haps))]
    pub fn path_log_likelihood(
        &self,
        panel: &ReferencePanel,
        query: &Query,
        path: &StatePath,
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<f64> {
        validate_inputs(panel, query, emissions, recomb)?;
        record_shape(panel);
        let inputs = HmmInputs::new(panel, emissions, recomb);
        match (query, path) {
            (Query::Haploid(alleles), StatePath::Haploid(haps)) => {
                haploid_path_log_likelihood(inputs, alleles, haps)
            }
            (Query::Diploid(genotypes), StatePath::Diploid(pairs)) => {
                diploid_path_log_likelihood(inputs, genotypes, pairs)
            }
            _ => Err(LsError::invalid_data(format!(
                "{}-ploid path for a {}-ploid query",
                path.ploidy().as_u8(),
                query.ploidy().as_u8()
            ))),
        }
    }

    /// Forward pass for every query, in parallel
    #[instrument(skip_all, fields(n_sites, n_haps, n_queries = queries.len()))]
    pub fn forward_many(
        &self,
        panel: &ReferencePanel,
        queries: &[Query],
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<Vec<ForwardResult>> {
        record_shape(panel);
        let pool = build_thread_pool(self.config.threads)?;
        tracing::debug!(
            n_queries = queries.len(),
            n_threads = pool.current_num_threads(),
            "dispatching forward batch"
        );
        pool.install(|| {
            queries
                .par_iter()
                .map(|query| self.forward(panel, query, emissions, recomb))
                .collect()
        })
    }

    /// Viterbi path for every query, in parallel
    #[instrument(skip_all, fields(n_sites, n_haps, n_queries = queries.len()))]
    pub fn viterbi_many(
        &self,
        panel: &ReferencePanel,
        queries: &[Query],
        emissions: &EmissionTable,
        recomb: &[f64],
    ) -> Result<Vec<ViterbiPath>> {
        record_shape(panel);
        let pool = build_thread_pool(self.config.threads)?;
        tracing::debug!(
            n_queries = queries.len(),
            n_threads = pool.current_num_threads(),
            "dispatching viterbi batch"
        );
        pool.install(|| {
            queries
                .par_iter()
                .map(|query| self.viterbi(panel, query, emissions, recomb))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViterbiMemory;
    use crate::data::HapIdx;

    fn setup() -> (ReferencePanel, EmissionTable, Vec<f64>) {
        let panel = ReferencePanel::from_rows(&[vec![0, 1, 0], vec![1, 1, 0], vec![0, 1, 1]]).unwrap();
        let emissions = EmissionTable::haploid(&[[0.01, 0.99]; 3]);
        (panel, emissions, vec![0.0, 0.05, 0.05])
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = InferenceConfig {
            threads: Some(0),
            ..Default::default()
        };
        assert!(matches!(Inference::new(config), Err(LsError::Config { .. })));
    }

    #[test]
    fn test_haploid_round() {
        let (panel, emissions, recomb) = setup();
        let inference = Inference::default();
        let query = Query::haploid(vec![0, 1, 0]);

        let fwd = inference.forward(&panel, &query, &emissions, &recomb).unwrap();
        let ll = inference.log_likelihood(&panel, &query, &emissions, &recomb).unwrap();
        assert!((fwd.log_likelihood - ll).abs() < 1e-12);

        let vit = inference.viterbi(&panel, &query, &emissions, &recomb).unwrap();
        assert_eq!(vit.path, StatePath::Haploid(vec![HapIdx(0); 3]));
        assert!(vit.log_likelihood <= fwd.log_likelihood);

        let scored = inference
            .path_log_likelihood(&panel, &query, &vit.path, &emissions, &recomb)
            .unwrap();
        assert!((scored - vit.log_likelihood).abs() < 1e-9);
    }

    #[test]
    fn test_path_ploidy_mismatch() {
        let (panel, emissions, recomb) = setup();
        let query = Query::haploid(vec![0, 1, 0]);
        let path = StatePath::Diploid(Vec::new());
        assert!(matches!(
            Inference::default().path_log_likelihood(&panel, &query, &path, &emissions, &recomb),
            Err(LsError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_batch_matches_serial() {
        let (panel, emissions, recomb) = setup();
        let inference = Inference::new(InferenceConfig {
            viterbi_memory: ViterbiMemory::Full,
            threads: Some(2),
            ..Default::default()
        })
        .unwrap();
        let queries = vec![
            Query::haploid(vec![0, 1, 0]),
            Query::haploid(vec![1, 1, 1]),
            Query::haploid(vec![0, 0, 1]),
        ];
        let batch = inference.viterbi_many(&panel, &queries, &emissions, &recomb).unwrap();
        for (query, got) in queries.iter().zip(&batch) {
            assert_eq!(got, &inference.viterbi(&panel, query, &emissions, &recomb).unwrap());
        }
        let fwd = inference.forward_many(&panel, &queries, &emissions, &recomb).unwrap();
        assert_eq!(fwd.len(), 3);
    }
}
