//! # Inference Configuration
//!
//! ## Role
//! Knobs that change how the recursions run without changing the model:
//! whether the forward pass rescales each site, which Viterbi traceback
//! representation is kept, and how many workers batch evaluation uses.
//!
//! The configuration is plain data (`serde`) so callers can load it from
//! whatever format they already use.
//!
//! ## Example
//! ```
//! use listephens::config::{InferenceConfig, Scaling, ViterbiMemory};
//!
//! let config = InferenceConfig {
//!     scaling: Scaling::Normalised,
//!     viterbi_memory: ViterbiMemory::Full,
//!     threads: Some(4),
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{LsError, Result};

/// Per-site rescaling applied by the forward pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Divide each site by its sum; scale factors carry the likelihood.
    #[default]
    Normalised,
    /// Leave values unscaled; every scale factor is 1. Underflows on long queries.
    Unscaled,
}

/// Traceback representation retained by the Viterbi pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViterbiMemory {
    /// Keep the rescaled value matrix and an explicit predecessor per state.
    Full,
    /// Keep one value row plus a per-site summary; predecessors are rebuilt
    /// during traceback.
    #[default]
    LowMemory,
}

/// Configuration for [`crate::pipelines::Inference`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Forward-pass rescaling (default: normalised)
    pub scaling: Scaling,

    /// Viterbi traceback storage (default: low memory)
    pub viterbi_memory: ViterbiMemory,

    /// Worker threads for batch evaluation (default: rayon's choice)
    pub threads: Option<usize>,
}

impl InferenceConfig {
    /// Check the configuration for values that cannot be honoured.
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(LsError::config("threads must be at least 1"));
        }
        Ok(())
    }

    /// Whether forward values are divided by a per-site factor
    pub fn is_normalised(&self) -> bool {
        self.scaling == Scaling::Normalised
    }
}
