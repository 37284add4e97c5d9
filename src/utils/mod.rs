//! # Utilities Module
//!
//! ## Sub-modules
//! - `threading`: Rayon thread pool configuration
//! - `workspace`: Pre-allocated buffers for allocation-free per-site loops

pub mod threading;
pub mod workspace;
