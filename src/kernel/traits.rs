//! Kernel trait definition

use crate::core::SparseVector;

/// Kernel function trait
///
/// A kernel function K(x, y) must be symmetric: `compute(x, y)` and
/// `compute(y, x)` have to agree bit for bit, since the kernel cache only
/// stores one of the two orders.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64;
}
