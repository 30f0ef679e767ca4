//! Linear kernel implementation

use crate::core::SparseVector;
use crate::kernel::Kernel;
use serde::{Deserialize, Serialize};

/// Linear kernel: K(x, y) = x^T * y
///
/// Rows carry the class attribute next to the features, so the dot product
/// skips `class_index` when it is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearKernel {
    pub class_index: Option<usize>,
}

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new(class_index: Option<usize>) -> Self {
        Self { class_index }
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        dot_product_sparse(x, y, self.class_index)
    }
}

/// Compute dot product between two sparse vectors, ignoring index `skip`
///
/// Since both vectors have sorted indices, we can compute this efficiently
/// using a merge-like algorithm in O(nnz(x) + nnz(y)) time. Terms are
/// accumulated in ascending index order, which makes the result independent
/// of argument order.
pub fn dot_product_sparse(x: &SparseVector, y: &SparseVector, skip: Option<usize>) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.indices.len() && j < y.indices.len() {
        let x_idx = x.indices[i];
        let y_idx = y.indices[j];

        if x_idx == y_idx {
            if Some(x_idx) != skip {
                result += x.values[i] * y.values[j];
            }
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}
