//! SVM solver implementations
//!
//! This module implements the Sequential Minimal Optimization (SMO) algorithm
//! with the two-threshold modification from "Improvements to Platt's SMO
//! Algorithm for SVM Classifier Design" by Keerthi et al.

pub mod index_set;
pub mod smo;

pub use self::index_set::*;
pub use self::smo::*;
