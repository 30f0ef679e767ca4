//! Core type definitions for the SMO workbench

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Build a sparse vector from a dense slice, dropping exact zeros
    pub fn from_dense(dense: &[f64]) -> Self {
        let (indices, values) = dense
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, &v)| (i, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Iterate over stored `(index, value)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// One row of a dataset.
///
/// `values` spans every attribute of the header, so the class attribute may
/// be stored alongside the features; consumers skip the class index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub values: SparseVector,
    pub weight: f64,
    /// Index into the nominal class values, `NaN` when missing
    pub class_value: f64,
}

impl Instance {
    /// Create an instance with unit weight
    pub fn new(values: SparseVector, class_value: f64) -> Self {
        Self {
            values,
            weight: 1.0,
            class_value,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn class_is_missing(&self) -> bool {
        self.class_value.is_nan()
    }
}

/// Attribute typing as delivered by the dataset layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    Numeric,
    Nominal(Vec<String>),
    String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn nominal(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal(values),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }
}

/// Attribute schema of a dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    attributes: Vec<Attribute>,
    class_index: Option<usize>,
}

impl Header {
    pub fn new(attributes: Vec<Attribute>, class_index: Option<usize>) -> Self {
        Self {
            attributes,
            class_index,
        }
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn class_index(&self) -> Option<usize> {
        self.class_index
    }

    pub fn class_attribute(&self) -> Option<&Attribute> {
        self.class_index.and_then(|i| self.attributes.get(i))
    }

    /// Number of class values; 1 for a numeric class, 0 when no class is set
    pub fn num_classes(&self) -> usize {
        match self.class_attribute().map(|a| &a.kind) {
            Some(AttributeKind::Nominal(values)) => values.len(),
            Some(_) => 1,
            None => 0,
        }
    }

    /// Display name of a class value, falling back to its index
    pub fn class_name(&self, class: usize) -> String {
        match self.class_attribute().map(|a| &a.kind) {
            Some(AttributeKind::Nominal(values)) if class < values.len() => values[class].clone(),
            _ => class.to_string(),
        }
    }

    /// Display name of an attribute, falling back to its index
    pub fn attribute_name(&self, index: usize) -> String {
        self.attributes
            .get(index)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| format!("attr{index}"))
    }
}

/// Multiclass prediction produced by pairwise voting
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Winning class index
    pub class: usize,
    /// Votes collected by each class
    pub votes: Vec<usize>,
}

impl Prediction {
    pub fn new(class: usize, votes: Vec<usize>) -> Self {
        Self { class, votes }
    }

    /// Share of the pairwise votes won by the predicted class
    pub fn confidence(&self) -> f64 {
        let total: usize = self.votes.iter().sum();
        if total == 0 {
            0.0
        } else {
            self.votes[self.class] as f64 / total as f64
        }
    }
}

/// Training options for the SMO classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SMOConfig {
    /// Complexity constant, upper bound for alpha
    pub c: f64,
    /// Polynomial kernel exponent; 1.0 is the linear machine
    pub exponent: f64,
    /// Normalize numeric attributes to [0, 1] before training
    pub normalize: bool,
    /// Divide the dot product by the number of non-class attributes
    pub rescale: bool,
    /// Add 1 to the dot product before the power
    pub lower_order: bool,
    /// Kernel cache buckets; 0 caches the full kernel matrix
    pub cache_size: usize,
    /// KKT violation tolerance
    pub tol: f64,
    /// Round-off epsilon
    pub eps: f64,
    /// Abort a pair once this many kernel evaluations were spent
    pub max_kernel_evaluations: Option<u64>,
    /// Train class pairs on the rayon thread pool
    pub parallel: bool,
}

impl Default for SMOConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            exponent: 1.0,
            normalize: true,
            rescale: false,
            lower_order: false,
            cache_size: 1_000_003,
            tol: 1.0e-3,
            eps: 1.0e-12,
            max_kernel_evaluations: None,
            parallel: false,
        }
    }
}

impl SMOConfig {
    /// Whether the machine collapses into a weight vector after training
    pub fn is_linear(&self) -> bool {
        self.exponent == 1.0
    }

    /// Reject inconsistent option combinations before any data is touched
    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "complexity constant C must be positive, got {}",
                self.c
            )));
        }
        if !(self.exponent.is_finite() && self.exponent > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "exponent must be positive, got {}",
                self.exponent
            )));
        }
        if self.is_linear() && self.rescale {
            return Err(SVMError::InvalidParameter(
                "can't use rescaling with a linear machine (exponent 1.0)".to_string(),
            ));
        }
        if self.is_linear() && self.lower_order {
            return Err(SVMError::InvalidParameter(
                "can't use lower-order terms with a linear machine (exponent 1.0)".to_string(),
            ));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "tolerance must be positive, got {}",
                self.tol
            )));
        }
        if !(self.eps.is_finite() && self.eps >= 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "epsilon must be non-negative, got {}",
                self.eps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_creation() {
        let sv = SparseVector::new(vec![2, 0, 4], vec![2.0, 1.0, 3.0]);

        assert_eq!(sv.indices, vec![0, 2, 4]);
        assert_eq!(sv.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sparse_vector_get() {
        let sv = SparseVector::new(vec![1, 3, 5], vec![1.0, 2.0, 3.0]);

        assert_eq!(sv.get(0), 0.0);
        assert_eq!(sv.get(1), 1.0);
        assert_eq!(sv.get(3), 2.0);
        assert_eq!(sv.get(6), 0.0);
    }

    #[test]
    fn test_sparse_vector_from_dense_drops_zeros() {
        let sv = SparseVector::from_dense(&[0.0, 1.5, 0.0, -2.0]);
        assert_eq!(sv.indices, vec![1, 3]);
        assert_eq!(sv.values, vec![1.5, -2.0]);
        assert!(SparseVector::from_dense(&[0.0, 0.0]).is_empty());
    }

    #[test]
    #[should_panic(expected = "Indices and values must have same length")]
    fn test_sparse_vector_length_mismatch() {
        SparseVector::new(vec![0, 1], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_header_class_queries() {
        let header = Header::new(
            vec![
                Attribute::numeric("x"),
                Attribute::nominal("class", vec!["a".into(), "b".into(), "c".into()]),
            ],
            Some(1),
        );
        assert_eq!(header.num_attributes(), 2);
        assert_eq!(header.num_classes(), 3);
        assert_eq!(header.class_name(2), "c");
        assert_eq!(header.attribute_name(0), "x");

        let unset = Header::new(vec![Attribute::numeric("x")], None);
        assert_eq!(unset.num_classes(), 0);
        assert!(unset.class_attribute().is_none());
    }

    #[test]
    fn test_instance_missing_class() {
        let inst = Instance::new(SparseVector::empty(), f64::NAN);
        assert!(inst.class_is_missing());
        assert_eq!(inst.weight, 1.0);
        assert_eq!(inst.with_weight(2.0).weight, 2.0);
    }

    #[test]
    fn test_prediction_confidence() {
        let pred = Prediction::new(1, vec![1, 2, 0]);
        assert_eq!(pred.confidence(), 2.0 / 3.0);
        assert_eq!(Prediction::new(0, vec![0]).confidence(), 0.0);
    }

    #[test]
    fn test_config_default() {
        let config = SMOConfig::default();
        assert_eq!(config.c, 1.0);
        assert_eq!(config.exponent, 1.0);
        assert_eq!(config.cache_size, 1_000_003);
        assert_eq!(config.tol, 1.0e-3);
        assert_eq!(config.eps, 1.0e-12);
        assert!(config.normalize);
        assert!(config.is_linear());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_linear_rescale_and_lower_order() {
        let config = SMOConfig {
            rescale: true,
            ..SMOConfig::default()
        };
        assert!(matches!(config.validate(), Err(SVMError::InvalidParameter(_))));

        let config = SMOConfig {
            lower_order: true,
            ..SMOConfig::default()
        };
        assert!(matches!(config.validate(), Err(SVMError::InvalidParameter(_))));

        let config = SMOConfig {
            exponent: 2.0,
            rescale: true,
            lower_order: true,
            ..SMOConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        for config in [
            SMOConfig { c: 0.0, ..SMOConfig::default() },
            SMOConfig { tol: -1.0, ..SMOConfig::default() },
            SMOConfig { eps: -1.0, ..SMOConfig::default() },
            SMOConfig { exponent: f64::NAN, ..SMOConfig::default() },
        ] {
            assert!(config.validate().is_err());
        }
    }
}
