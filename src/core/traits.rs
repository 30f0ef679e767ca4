//! Core traits for the SMO workbench

use crate::core::{Header, Instance, Prediction};

/// Read-only view of a dataset as delivered by the upstream data layer
pub trait Dataset: Send + Sync {
    /// Attribute schema, including the class index
    fn header(&self) -> &Header;

    /// Number of instances in the dataset
    fn len(&self) -> usize;

    /// Get a single instance by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn instance(&self, i: usize) -> &Instance;

    /// Class values of all instances, in row order
    fn class_values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.instance(i).class_value)
            .collect()
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trained nominal classifier
pub trait Classifier: Send + Sync {
    /// Predict a single instance
    fn predict(&self, instance: &Instance) -> Prediction;

    /// Predicted class index for a single instance
    fn classify(&self, instance: &Instance) -> usize {
        self.predict(instance).class
    }

    /// Number of classes the classifier votes over
    fn num_classes(&self) -> usize;
}
