//! Dataset loading and in-memory storage

pub mod csv;
pub mod instances;
pub mod libsvm;

pub use self::csv::CSVReader;
pub use self::instances::Instances;
pub use self::libsvm::LibSVMReader;
