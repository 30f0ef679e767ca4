//! High-level API for training and using SMO classifiers
//!
//! This module provides a user-friendly interface for common tasks,
//! including training, prediction, and model evaluation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rsmo::api::SMO;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Train a quadratic machine on data
//! let model = SMO::new()
//!     .with_c(1.0)
//!     .with_exponent(2.0)
//!     .with_lower_order(true)
//!     .train_from_file("data.libsvm")?;
//!
//! // Evaluate on held-out data
//! let metrics = model.evaluate_from_file("test.libsvm")?;
//! println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{Classifier, Dataset, Header, Instance, Prediction, Result, SMOConfig, SVMError};
use crate::data::{CSVReader, Instances, LibSVMReader};
use crate::kernel::KernelFunction;
use crate::optimizer::MulticlassSMO;
use crate::utils::scaling::Normalize;
use crate::utils::validation::{class_counts, validate_training_data};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// SMO trainer with builder pattern
#[derive(Debug, Clone, Default)]
pub struct SMO {
    config: SMOConfig,
}

impl SMO {
    /// Create a trainer with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trainer from a complete configuration, rejecting invalid ones
    pub fn with_config(config: SMOConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Set the complexity constant C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set the polynomial exponent; 1.0 trains a linear machine
    pub fn with_exponent(mut self, exponent: f64) -> Self {
        self.config.exponent = exponent;
        self
    }

    pub fn with_lower_order(mut self, lower_order: bool) -> Self {
        self.config.lower_order = lower_order;
        self
    }

    pub fn with_rescale(mut self, rescale: bool) -> Self {
        self.config.rescale = rescale;
        self
    }

    /// Toggle [0, 1] normalization of the inputs
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.config.normalize = normalize;
        self
    }

    /// Set the number of kernel cache buckets; 0 caches the full matrix
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    /// Set the KKT tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config.tol = tol;
        self
    }

    /// Set the round-off epsilon
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.config.eps = eps;
        self
    }

    /// Fail a pair once it has spent this many kernel evaluations
    pub fn with_max_kernel_evaluations(mut self, limit: u64) -> Self {
        self.config.max_kernel_evaluations = Some(limit);
        self
    }

    /// Train class pairs in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn config(&self) -> &SMOConfig {
        &self.config
    }

    /// Train on a dataset
    ///
    /// Options are validated before the data is touched. Instances with a
    /// missing class are dropped.
    pub fn train<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<TrainedModel> {
        self.config.validate()?;
        validate_training_data(dataset)?;

        let header = dataset.header().clone();
        let mut data = Instances::new(
            header.clone(),
            (0..dataset.len()).map(|i| dataset.instance(i).clone()).collect(),
        );
        let removed = data.delete_with_missing_class();
        if removed > 0 {
            warn!("Ignoring {removed} instances with missing class");
        }
        if data.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        debug!("Class distribution: {:?}", class_counts(&data));

        let normalizer = self.config.normalize.then(|| Normalize::fit(&data));
        let instances = match &normalizer {
            Some(filter) => filter.transform_all(&data),
            None => data.into_instances(),
        };

        let kernel = KernelFunction::from_config(&self.config, &header)?;
        let model = MulticlassSMO::build(&instances, &header, &kernel, &self.config)?;
        info!(
            "Trained {} machines, {} support vectors in total",
            model.machines().count(),
            model.machines().map(|m| m.num_support_vectors()).sum::<usize>()
        );

        Ok(TrainedModel {
            config: self.config.clone(),
            normalizer,
            model,
        })
    }

    /// Train from LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<TrainedModel> {
        let dataset = LibSVMReader::from_file(path)?;
        self.train(&dataset)
    }

    /// Train from CSV file (automatically detects headers)
    pub fn train_from_csv<P: AsRef<Path>>(&self, path: P) -> Result<TrainedModel> {
        let dataset = CSVReader::from_file(path)?;
        self.train(&dataset)
    }
}

/// Trained classifier together with its input preprocessing
#[derive(Serialize, Deserialize)]
pub struct TrainedModel {
    config: SMOConfig,
    normalizer: Option<Normalize>,
    model: MulticlassSMO,
}

impl TrainedModel {
    fn preprocess<'a>(&self, instance: &'a Instance) -> Cow<'a, Instance> {
        match &self.normalizer {
            Some(filter) => Cow::Owned(filter.transform(instance)),
            None => Cow::Borrowed(instance),
        }
    }

    /// Predict from dataset
    pub fn predict_dataset<D: Dataset + ?Sized>(&self, dataset: &D) -> Vec<Prediction> {
        (0..dataset.len())
            .map(|i| self.predict(dataset.instance(i)))
            .collect()
    }

    /// Raw outputs of every pairwise machine, in `(a, b)` order
    pub fn decision_values(&self, instance: &Instance) -> Vec<((usize, usize), f64)> {
        self.model
            .decision_values(&self.preprocess(instance).values)
    }

    /// Read a LibSVM file laid out like the training data
    pub fn load_libsvm<P: AsRef<Path>>(&self, path: P) -> Result<Instances> {
        LibSVMReader::from_file_with_header(path, self.header())
    }

    /// Read a CSV file laid out like the training data
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<Instances> {
        CSVReader::from_file_with_header(path, self.header())
    }

    /// Compare predictions with the labels of a dataset
    ///
    /// Rows with a missing class are skipped.
    pub fn evaluate<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<EvaluationMetrics> {
        let expected = self.header().num_attributes();
        let actual = dataset.header().num_attributes();
        if expected != actual {
            return Err(SVMError::DimensionMismatch { expected, actual });
        }

        let num_classes = self.model.num_classes();
        let mut metrics = EvaluationMetrics::new(
            (0..num_classes).map(|c| self.header().class_name(c)).collect(),
        );
        for i in 0..dataset.len() {
            let instance = dataset.instance(i);
            if instance.class_is_missing() {
                continue;
            }
            let actual = instance.class_value as usize;
            if actual >= num_classes {
                return Err(SVMError::InvalidDataset(format!(
                    "instance {i} has class value {actual}, model knows {num_classes} classes"
                )));
            }
            metrics.record(actual, self.classify(instance));
        }
        Ok(metrics)
    }

    /// Evaluate on a LibSVM file
    pub fn evaluate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<EvaluationMetrics> {
        let dataset = self.load_libsvm(path)?;
        self.evaluate(&dataset)
    }

    /// Evaluate on a CSV file
    pub fn evaluate_from_csv<P: AsRef<Path>>(&self, path: P) -> Result<EvaluationMetrics> {
        let dataset = self.load_csv(path)?;
        self.evaluate(&dataset)
    }

    pub fn header(&self) -> &Header {
        self.model.header()
    }

    /// Options the model was trained with
    pub fn config(&self) -> &SMOConfig {
        &self.config
    }

    /// Get model information
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            num_classes: self.model.num_classes(),
            num_machines: self.model.machines().count(),
            n_support_vectors: self
                .model
                .machines()
                .map(|m| m.num_support_vectors())
                .sum(),
            linear: self.config.is_linear(),
            normalized: self.normalizer.is_some(),
        }
    }

    /// Get the underlying pairwise ensemble
    pub fn inner(&self) -> &MulticlassSMO {
        &self.model
    }
}

impl Classifier for TrainedModel {
    fn predict(&self, instance: &Instance) -> Prediction {
        self.model.predict(&self.preprocess(instance))
    }

    fn num_classes(&self) -> usize {
        self.model.num_classes()
    }
}

impl fmt::Display for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.config.is_linear() {
            writeln!(f, "Kernel used:\n  Linear Kernel: K(x,y) = <x,y>\n")?;
        } else {
            let mut inner = "<x,y>".to_string();
            if self.config.rescale {
                // kernel divides by the number of non-class attributes
                let divisor = self.header().num_attributes().saturating_sub(1).max(1);
                inner = format!("<x,y> / {divisor}");
            }
            if self.config.lower_order {
                inner = format!("({inner} + 1)");
            } else if self.config.rescale {
                inner = format!("({inner})");
            }
            writeln!(
                f,
                "Kernel used:\n  Poly Kernel: K(x,y) = {inner}^{}\n",
                self.config.exponent
            )?;
        }
        write!(f, "{}", self.model)
    }
}

/// Summary of a trained model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub num_classes: usize,
    /// Pairwise machines that take part in voting
    pub num_machines: usize,
    pub n_support_vectors: usize,
    pub linear: bool,
    pub normalized: bool,
}

/// Confusion-matrix based evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetrics {
    class_names: Vec<String>,
    /// `confusion[actual][predicted]`
    confusion: Vec<Vec<usize>>,
}

impl EvaluationMetrics {
    fn new(class_names: Vec<String>) -> Self {
        let k = class_names.len();
        Self {
            class_names,
            confusion: vec![vec![0; k]; k],
        }
    }

    fn record(&mut self, actual: usize, predicted: usize) {
        self.confusion[actual][predicted] += 1;
    }

    pub fn confusion_matrix(&self) -> &[Vec<usize>] {
        &self.confusion
    }

    pub fn total(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.confusion.len()).map(|c| self.confusion[c][c]).sum()
    }

    /// Fraction of correctly classified rows
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    /// Calculate precision of one class: TP / (TP + FP)
    pub fn precision(&self, class: usize) -> f64 {
        let predicted: usize = self.confusion.iter().map(|row| row[class]).sum();
        if predicted == 0 {
            0.0
        } else {
            self.confusion[class][class] as f64 / predicted as f64
        }
    }

    /// Calculate recall of one class: TP / (TP + FN)
    pub fn recall(&self, class: usize) -> f64 {
        let actual: usize = self.confusion[class].iter().sum();
        if actual == 0 {
            0.0
        } else {
            self.confusion[class][class] as f64 / actual as f64
        }
    }

    /// Calculate F1 score: 2 * (precision * recall) / (precision + recall)
    pub fn f1_score(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Correctly classified: {} / {} ({:.2}%)",
            self.correct(),
            self.total(),
            self.accuracy() * 100.0
        )?;
        writeln!(f)?;
        writeln!(f, "{:>12} {:>10} {:>10} {:>10}", "class", "precision", "recall", "f1")?;
        for (class, name) in self.class_names.iter().enumerate() {
            writeln!(
                f,
                "{:>12} {:>10.4} {:>10.4} {:>10.4}",
                name,
                self.precision(class),
                self.recall(class),
                self.f1_score(class)
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows: actual, columns: predicted)")?;
        for (name, row) in self.class_names.iter().zip(&self.confusion) {
            let cells: Vec<String> = row.iter().map(|n| format!("{n:>6}")).collect();
            writeln!(f, "{} | {name}", cells.join(""))?;
        }
        Ok(())
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train a linear machine on LibSVM data with default parameters
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        SMO::new().train_from_file(path)
    }

    /// Train a linear machine on CSV data with default parameters
    pub fn train_csv<P: AsRef<Path>>(path: P) -> Result<TrainedModel> {
        SMO::new().train_from_csv(path)
    }

    /// Quick evaluation: train on training file, test on test file
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
    ) -> Result<f64> {
        let model = train_libsvm(train_path)?;
        Ok(model.evaluate_from_file(test_path)?.accuracy())
    }
}
