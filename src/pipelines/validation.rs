//! # Input Validation
//!
//! Every shape and domain check runs here, before any recursion starts, so
//! a rejected call never does partial work.

use crate::data::panel::ReferencePanel;
use crate::data::query::{Ploidy, Query};
use crate::error::{LsError, Result};
use crate::model::emission::EmissionTable;

/// Check that panel, query, emission table and recombination vector describe
/// the same sites and the same ploidy.
pub fn validate_inputs(
    panel: &ReferencePanel,
    query: &Query,
    emissions: &EmissionTable,
    recomb: &[f64],
) -> Result<()> {
    let n_sites = panel.n_sites();
    if n_sites == 0 || panel.n_haps() == 0 {
        return Err(LsError::shape(format!(
            "reference panel is empty ({} sites x {} haplotypes)",
            n_sites,
            panel.n_haps()
        )));
    }
    if query.n_sites() != n_sites {
        return Err(LsError::shape(format!(
            "query has {} sites, panel has {}",
            query.n_sites(),
            n_sites
        )));
    }
    if emissions.n_sites() != n_sites {
        return Err(LsError::shape(format!(
            "emission table has {} sites, panel has {}",
            emissions.n_sites(),
            n_sites
        )));
    }
    if recomb.len() != n_sites {
        return Err(LsError::shape(format!(
            "recombination vector has {} entries, panel has {} sites",
            recomb.len(),
            n_sites
        )));
    }
    if emissions.ploidy() != query.ploidy() {
        return Err(LsError::PloidyMismatch {
            emissions: emissions.ploidy().as_u8(),
            query: query.ploidy().as_u8(),
        });
    }
    if let Some((site, r)) = recomb
        .iter()
        .enumerate()
        .find(|(_, r)| !(0.0..1.0).contains(*r))
    {
        return Err(LsError::invalid_data(format!(
            "recombination probability {} at site {} is outside [0, 1)",
            r, site
        )));
    }
    emissions.validate()?;
    if query.ploidy() == Ploidy::Diploid && !panel.is_biallelic() {
        return Err(LsError::invalid_data(
            "diploid inference needs a biallelic reference panel (alleles 0/1)",
        ));
    }
    Ok(())
}
