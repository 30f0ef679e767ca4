//! Input filters and validation applied before training

use crate::core::{Dataset, Instance, Result, SVMError, SparseVector};

/// Attribute scaling
pub mod scaling {
    use super::*;
    use crate::core::Header;
    use serde::{Deserialize, Serialize};

    /// Observed range of one attribute
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct AttributeRange {
        pub min: f64,
        pub max: f64,
    }

    /// Min-max scaling of numeric attributes to [0, 1]
    ///
    /// Ranges are fitted on training data, absent sparse entries counting
    /// as zeros. Constant attributes map to 0; values outside the fitted
    /// range extrapolate linearly. The class attribute is left untouched.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Normalize {
        num_attributes: usize,
        /// `None` for attributes that are not scaled
        ranges: Vec<Option<AttributeRange>>,
    }

    impl Normalize {
        /// Fit attribute ranges on a training dataset
        pub fn fit<D: Dataset + ?Sized>(dataset: &D) -> Self {
            let header = dataset.header();
            let num_attributes = header.num_attributes();

            let mut ranges: Vec<Option<AttributeRange>> = Self::scaled_attributes(header)
                .map(|scaled| {
                    scaled.then_some(AttributeRange {
                        min: f64::INFINITY,
                        max: f64::NEG_INFINITY,
                    })
                })
                .collect();
            let mut explicit = vec![0usize; num_attributes];

            for i in 0..dataset.len() {
                for (index, value) in dataset.instance(i).values.iter() {
                    if let Some(Some(range)) = ranges.get_mut(index) {
                        range.min = range.min.min(value);
                        range.max = range.max.max(value);
                        explicit[index] += 1;
                    }
                }
            }

            // Attributes missing from some sparse rows also take the value 0
            for (index, range) in ranges.iter_mut().enumerate() {
                if let Some(range) = range {
                    if explicit[index] < dataset.len() {
                        range.min = range.min.min(0.0);
                        range.max = range.max.max(0.0);
                    }
                    if !range.min.is_finite() {
                        *range = AttributeRange { min: 0.0, max: 0.0 };
                    }
                }
            }

            Self {
                num_attributes,
                ranges,
            }
        }

        fn scaled_attributes(header: &Header) -> impl Iterator<Item = bool> + '_ {
            header
                .attributes()
                .iter()
                .enumerate()
                .map(move |(i, attr)| Some(i) != header.class_index() && attr.is_numeric())
        }

        /// Fitted range of an attribute, if it is scaled
        pub fn range(&self, index: usize) -> Option<AttributeRange> {
            self.ranges.get(index).copied().flatten()
        }

        fn scale(range: AttributeRange, value: f64) -> f64 {
            let width = range.max - range.min;
            if width == 0.0 {
                0.0
            } else {
                (value - range.min) / width
            }
        }

        /// Scale one instance; weight and class value are kept
        pub fn transform(&self, instance: &Instance) -> Instance {
            let mut dense = vec![0.0; self.num_attributes];
            for (index, value) in instance.values.iter() {
                if index < self.num_attributes {
                    dense[index] = value;
                }
            }
            for (index, slot) in dense.iter_mut().enumerate() {
                if let Some(range) = self.range(index) {
                    *slot = Self::scale(range, *slot);
                }
            }

            Instance {
                values: SparseVector::from_dense(&dense),
                weight: instance.weight,
                class_value: instance.class_value,
            }
        }

        /// Scale every instance of a dataset
        pub fn transform_all<D: Dataset + ?Sized>(&self, dataset: &D) -> Vec<Instance> {
            (0..dataset.len())
                .map(|i| self.transform(dataset.instance(i)))
                .collect()
        }
    }
}

/// Validation of training inputs
pub mod validation {
    use super::*;
    use crate::core::AttributeKind;

    /// Check the input contract of the trainer
    ///
    /// The class must be set and nominal, no string attributes may occur,
    /// instance weights must be finite and non-negative and every stored
    /// value must be finite and address an attribute of the header.
    pub fn validate_training_data<D: Dataset + ?Sized>(dataset: &D) -> Result<()> {
        let header = dataset.header();
        let class_index = header.class_index().ok_or(SVMError::ClassNotSet)?;
        let class_attribute = header
            .class_attribute()
            .ok_or_else(|| SVMError::InvalidDataset(format!("class index {class_index} out of range")))?;
        if !class_attribute.is_nominal() {
            return Err(SVMError::NumericClass(class_attribute.name.clone()));
        }
        if header
            .attributes()
            .iter()
            .any(|attr| matches!(attr.kind, AttributeKind::String))
        {
            return Err(SVMError::StringAttributes);
        }
        if let Some((index, attr)) = header
            .attributes()
            .iter()
            .enumerate()
            .find(|(i, attr)| *i != class_index && attr.is_nominal())
        {
            return Err(SVMError::InvalidDataset(format!(
                "nominal attribute '{}' (index {index}) must be binarized before training",
                attr.name
            )));
        }

        let num_classes = header.num_classes();
        for i in 0..dataset.len() {
            let instance = dataset.instance(i);
            validate_instance(instance, header.num_attributes())?;
            if let Some((index, value)) = instance
                .values
                .iter()
                .find(|&(index, value)| index != class_index && !value.is_finite())
            {
                return Err(SVMError::InvalidDataset(format!(
                    "instance {i} has non-finite value {value} for attribute '{}'",
                    header.attribute_name(index)
                )));
            }
            if !(instance.weight.is_finite() && instance.weight >= 0.0) {
                return Err(SVMError::InvalidDataset(format!(
                    "instance {i} has invalid weight {}",
                    instance.weight
                )));
            }
            let class = instance.class_value;
            if !class.is_nan() && !(class >= 0.0 && class.fract() == 0.0 && (class as usize) < num_classes) {
                return Err(SVMError::InvalidDataset(format!(
                    "instance {i} has class value {class}, expected one of 0..{num_classes}"
                )));
            }
        }
        Ok(())
    }

    /// Check that an instance fits a header with `num_attributes` attributes
    pub fn validate_instance(instance: &Instance, num_attributes: usize) -> Result<()> {
        match instance.values.indices.last() {
            Some(&max) if max >= num_attributes => Err(SVMError::DimensionMismatch {
                expected: num_attributes,
                actual: max + 1,
            }),
            _ => Ok(()),
        }
    }

    /// Number of instances per class, skipping missing classes
    pub fn class_counts<D: Dataset + ?Sized>(dataset: &D) -> Vec<usize> {
        let mut counts = vec![0; dataset.header().num_classes()];
        for i in 0..dataset.len() {
            let class = dataset.instance(i).class_value;
            if !class.is_nan() {
                if let Some(count) = counts.get_mut(class as usize) {
                    *count += 1;
                }
            }
        }
        counts
    }
}
