//! In-memory dataset

use crate::core::{Attribute, Dataset, Header, Instance, Result, SVMError, SparseVector};
use log::warn;
use serde::{Deserialize, Serialize};

/// Owned rows plus their attribute schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instances {
    header: Header,
    instances: Vec<Instance>,
}

impl Instances {
    pub fn new(header: Header, instances: Vec<Instance>) -> Self {
        Self { header, instances }
    }

    pub fn push(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn into_instances(self) -> Vec<Instance> {
        self.instances
    }

    /// Drop rows whose class is missing; returns how many were removed
    pub fn delete_with_missing_class(&mut self) -> usize {
        let before = self.instances.len();
        self.instances.retain(|inst| !inst.class_is_missing());
        before - self.instances.len()
    }
}

impl Dataset for Instances {
    fn header(&self) -> &Header {
        &self.header
    }

    fn len(&self) -> usize {
        self.instances.len()
    }

    fn instance(&self, i: usize) -> &Instance {
        &self.instances[i]
    }
}

/// A parsed row before class values are resolved
pub(crate) struct RawRow {
    /// Zero-based feature index and value pairs
    pub features: Vec<(usize, f64)>,
    pub label: String,
}

/// Build a dataset with numeric features and a nominal class appended last
pub(crate) fn assemble(
    rows: Vec<RawRow>,
    feature_names: Vec<String>,
    class_values: Vec<String>,
) -> Result<Instances> {
    let mut attributes: Vec<Attribute> = feature_names.into_iter().map(Attribute::numeric).collect();
    let class_index = attributes.len();
    attributes.push(Attribute::nominal("class", class_values));
    let header = Header::new(attributes, Some(class_index));
    assemble_with_header(rows, &header)
}

/// Build a dataset shaped like `header`, e.g. test data for a trained model
///
/// Labels unknown to the header become missing class values.
pub(crate) fn assemble_with_header(rows: Vec<RawRow>, header: &Header) -> Result<Instances> {
    let class_index = match header.class_index() {
        Some(index) if index + 1 == header.num_attributes() => index,
        Some(index) => {
            return Err(SVMError::InvalidDataset(format!(
                "class attribute must be the last attribute, found at {index}"
            )))
        }
        None => return Err(SVMError::ClassNotSet),
    };
    let class_values: &[String] = match header.class_attribute().map(|a| &a.kind) {
        Some(crate::core::AttributeKind::Nominal(values)) => values,
        _ => &[],
    };

    let mut instances = Vec::with_capacity(rows.len());
    for (row, raw) in rows.into_iter().enumerate() {
        let class_value = match class_values.iter().position(|v| *v == raw.label) {
            Some(position) => position as f64,
            None => {
                warn!("Row {}: unknown class '{}', treated as missing", row + 1, raw.label);
                f64::NAN
            }
        };

        let (mut indices, mut values): (Vec<usize>, Vec<f64>) = raw.features.into_iter().unzip();
        if let Some(&max) = indices.iter().max() {
            if max >= class_index {
                return Err(SVMError::DimensionMismatch {
                    expected: class_index,
                    actual: max + 1,
                });
            }
        }
        if !class_value.is_nan() {
            indices.push(class_index);
            values.push(class_value);
        }
        instances.push(Instance::new(SparseVector::new(indices, values), class_value));
    }

    Ok(Instances::new(header.clone(), instances))
}
