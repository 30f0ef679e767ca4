//! Model serialization and persistence
//!
//! Trained models are stored as pretty-printed JSON together with metadata
//! describing how they were produced. Linear machines store only their
//! weight vectors; non-linear machines keep their support vectors.

use crate::api::TrainedModel;
use crate::core::{Classifier, Result, SMOConfig, SVMError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk form of a trained model
#[derive(Serialize, Deserialize)]
pub struct SerializableModel {
    /// Model metadata
    pub metadata: ModelMetadata,
    /// The trained classifier, including its input normalization
    pub model: TrainedModel,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    pub num_classes: usize,
    /// Pairwise machines taking part in voting
    pub num_machines: usize,
    /// Support vectors summed over all machines
    pub n_support_vectors: usize,
    /// Training parameters used
    pub training_params: SMOConfig,
}

impl SerializableModel {
    /// Wrap a trained model, stamping it with the current time
    pub fn from_trained_model(model: TrainedModel) -> Self {
        let info = model.info();
        let metadata = ModelMetadata {
            library_version: crate::VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            num_classes: model.num_classes(),
            num_machines: info.num_machines,
            n_support_vectors: info.n_support_vectors,
            training_params: model.config().clone(),
        };
        Self { metadata, model }
    }

    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        let model: Self = serde_json::from_reader(reader)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;

        if model.metadata.library_version != crate::VERSION {
            log::warn!(
                "Model was written by version {}, running {}",
                model.metadata.library_version,
                crate::VERSION
            );
        }
        Ok(model)
    }

    /// Unwrap the trained model
    pub fn into_trained_model(self) -> TrainedModel {
        self.model
    }

    /// Print model summary
    pub fn print_summary(&self) {
        let params = &self.metadata.training_params;
        println!("=== SMO Model Summary ===");
        println!(
            "Kernel: {}",
            if params.is_linear() {
                "linear".to_string()
            } else {
                format!("polynomial (exponent {})", params.exponent)
            }
        );
        println!("Classes: {}", self.metadata.num_classes);
        for class in 0..self.metadata.num_classes {
            println!("  {}: {}", class, self.model.header().class_name(class));
        }
        println!("Pairwise Machines: {}", self.metadata.num_machines);
        println!("Support Vectors: {}", self.metadata.n_support_vectors);
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
        println!("Training Parameters:");
        println!("  C: {}", params.c);
        println!("  Exponent: {}", params.exponent);
        println!("  Lower Order Terms: {}", params.lower_order);
        println!("  Rescale: {}", params.rescale);
        println!("  Normalize: {}", params.normalize);
        println!("  Cache Size: {}", params.cache_size);
        println!("  Tolerance: {}", params.tol);
        println!("  Epsilon: {}", params.eps);
    }
}
