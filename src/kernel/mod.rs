//! Kernel functions for SMO

pub mod linear;
pub mod polynomial;
pub mod traits;

pub use self::linear::*;
pub use self::polynomial::*;
pub use self::traits::*;

use crate::core::{Header, Result, SMOConfig, SparseVector};
use serde::{Deserialize, Serialize};

/// The closed set of kernels a machine can be trained with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelFunction {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
}

impl KernelFunction {
    /// Select the kernel described by `config` for data shaped like `header`
    pub fn from_config(config: &SMOConfig, header: &Header) -> Result<Self> {
        if config.is_linear() {
            // still rejects rescale / lower-order on a linear machine
            PolynomialKernel::new(
                config.exponent,
                config.lower_order,
                config.rescale,
                header.num_attributes(),
                header.class_index(),
            )?;
            Ok(Self::Linear(LinearKernel::new(header.class_index())))
        } else {
            Ok(Self::Polynomial(PolynomialKernel::new(
                config.exponent,
                config.lower_order,
                config.rescale,
                header.num_attributes(),
                header.class_index(),
            )?))
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Linear(_))
    }

    pub fn class_index(&self) -> Option<usize> {
        match self {
            Self::Linear(k) => k.class_index,
            Self::Polynomial(k) => k.class_index,
        }
    }
}

impl Kernel for KernelFunction {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        match self {
            Self::Linear(k) => k.compute(x, y),
            Self::Polynomial(k) => k.compute(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Attribute;

    fn header() -> Header {
        Header::new(
            vec![
                Attribute::numeric("a"),
                Attribute::numeric("b"),
                Attribute::nominal("class", vec!["x".into(), "y".into()]),
            ],
            Some(2),
        )
    }

    #[test]
    fn test_kernel_selection() {
        let linear = KernelFunction::from_config(&SMOConfig::default(), &header()).unwrap();
        assert!(linear.is_linear());
        assert_eq!(linear.class_index(), Some(2));

        let config = SMOConfig {
            exponent: 2.0,
            lower_order: true,
            ..SMOConfig::default()
        };
        let poly = KernelFunction::from_config(&config, &header()).unwrap();
        assert!(!poly.is_linear());
    }

    #[test]
    fn test_kernel_selection_rejects_linear_options() {
        let config = SMOConfig {
            rescale: true,
            ..SMOConfig::default()
        };
        assert!(KernelFunction::from_config(&config, &header()).is_err());
    }
}
