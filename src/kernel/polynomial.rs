//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (<x, y> / s + r)^d
//!
//! Where:
//! - s: number of non-class attributes when rescaling, otherwise 1
//! - r: 1 when lower-order terms are used, otherwise 0
//! - d: the exponent
//!
//! An exponent of 1.0 is the linear machine, which admits neither rescaling
//! nor lower-order terms.

use crate::core::{Result, SVMError, SparseVector};
use crate::kernel::linear::dot_product_sparse;
use crate::kernel::traits::Kernel;
use serde::{Deserialize, Serialize};

/// Polynomial kernel over sparse rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialKernel {
    pub exponent: f64,
    pub lower_order: bool,
    pub rescale: bool,
    /// Attribute count of the header, class attribute included
    pub num_attributes: usize,
    pub class_index: Option<usize>,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel
    ///
    /// # Examples
    /// ```
    /// use rsmo::kernel::PolynomialKernel;
    ///
    /// // (x·y / 4 + 1)², class attribute at index 4
    /// let kernel = PolynomialKernel::new(2.0, true, true, 5, Some(4)).unwrap();
    /// assert_eq!(kernel.exponent, 2.0);
    ///
    /// // rescaling a linear machine is rejected
    /// assert!(PolynomialKernel::new(1.0, false, true, 5, Some(4)).is_err());
    /// ```
    pub fn new(
        exponent: f64,
        lower_order: bool,
        rescale: bool,
        num_attributes: usize,
        class_index: Option<usize>,
    ) -> Result<Self> {
        if exponent == 1.0 && (lower_order || rescale) {
            return Err(SVMError::InvalidParameter(
                "lower-order terms and rescaling need an exponent other than 1.0".to_string(),
            ));
        }

        Ok(Self {
            exponent,
            lower_order,
            rescale,
            num_attributes,
            class_index,
        })
    }

    fn rescale_divisor(&self) -> f64 {
        self.num_attributes.saturating_sub(1).max(1) as f64
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        let mut result = dot_product_sparse(x, y, self.class_index);

        if self.rescale {
            result /= self.rescale_divisor();
        }
        if self.lower_order {
            result += 1.0;
        }
        if self.exponent != 1.0 {
            result = result.powf(self.exponent);
        }

        result
    }
}
