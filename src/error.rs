//! # Centralized Error Handling
//!
//! Unified error types for the entire crate using `thiserror`.
//!
//! Two families of failure exist. Shape and consistency errors are raised
//! before any recursion starts. Numerical degeneracy (a site whose every state
//! has probability zero) is raised as `ZeroLikelihood` the moment a recursion
//! sees a zero scale factor, so no NaN or infinity ever escapes.

use thiserror::Error;

/// Main error type for Li-Stephens inference
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LsError {
    /// Site counts or panel widths disagree between inputs
    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// Emission table built for one ploidy, query of another
    #[error("Ploidy mismatch: emission table is {emissions}-ploid but query is {query}-ploid")]
    PloidyMismatch { emissions: u8, query: u8 },

    /// Values outside their domain (allele codes, probabilities, path indices)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Every state at `site` has probability zero
    #[error("Zero likelihood at site {site}: observation is impossible under the model")]
    ZeroLikelihood { site: usize },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The rayon pool used for batch evaluation could not be built
    #[error("Thread pool error: {message}")]
    ThreadPool { message: String },
}

/// Type alias for Results using LsError
pub type Result<T> = std::result::Result<T, LsError>;

impl LsError {
    /// Create a shape mismatch error
    pub fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error reports an impossible observation rather than bad input
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::ZeroLikelihood { .. })
    }
}

impl From<rayon::ThreadPoolBuildError> for LsError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool {
            message: err.to_string(),
        }
    }
}
