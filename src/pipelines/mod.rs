//! # Pipeline Module
//!
//! High-level orchestration of inference calls: validation, ploidy dispatch
//! and batch evaluation.

pub mod inference;
pub mod validation;

pub use inference::{Inference, ViterbiPath};
