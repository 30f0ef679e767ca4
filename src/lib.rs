//! Support vector classification trained with Sequential Minimal Optimization
//!
//! Based on "Improvements to Platt's SMO Algorithm for SVM Classifier Design"
//! by Keerthi, Shevade, Bhattacharyya and Murthy. Multiclass problems are
//! decomposed into one machine per pair of classes.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod optimizer;
pub mod persistence;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, ModelInfo, TrainedModel, SMO};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::{CSVReader, Instances, LibSVMReader};
pub use crate::kernel::{Kernel, KernelFunction, LinearKernel, PolynomialKernel};
pub use crate::optimizer::MulticlassSMO;
pub use crate::persistence::SerializableModel;
pub use crate::solver::{BinarySMO, IndexSet, SolverState};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
